//! 事件日志服务 - 业务能力层
//!
//! 只描述"发生了什么"，由注入的 sink 决定如何持久化。

use serde::Serialize;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

use crate::models::{PaywallPlacement, PublishStage, TerminalState};

/// 发布过程中的结构化事件
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum PublishEvent {
    JobStarted {
        job_id: String,
        index: usize,
        session_generation: u64,
    },
    JobSkipped {
        job_id: String,
        reason: String,
    },
    StageEntered {
        job_id: String,
        stage: PublishStage,
    },
    OptionalStepSkipped {
        job_id: String,
        stage: PublishStage,
        control: String,
    },
    PaywallPlaced {
        job_id: String,
        placement: PaywallPlacement,
    },
    /// 付费分隔线按序号兜底或未能放置
    PaywallLowConfidence {
        job_id: String,
        placement: PaywallPlacement,
        search_text: Option<String>,
    },
    SubmissionUncertain {
        job_id: String,
        url: String,
    },
    JobFinished {
        job_id: String,
        success: bool,
        terminal: TerminalState,
        url: Option<String>,
        message: String,
    },
    SessionRestarted {
        generation: u64,
        reason: String,
    },
    BatchAborted {
        reason: String,
    },
}

/// 事件输出目标
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &PublishEvent);
}

/// 输出到 tracing 日志
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: &PublishEvent) {
        match event {
            PublishEvent::PaywallLowConfidence { .. } | PublishEvent::SubmissionUncertain { .. } => {
                warn!(target: "publish_events", ?event, "事件");
            }
            PublishEvent::SessionRestarted { .. } | PublishEvent::BatchAborted { .. } => {
                info!(target: "publish_events", ?event, "事件");
            }
            _ => debug!(target: "publish_events", ?event, "事件"),
        }
    }
}

/// 以 JSON Lines 形式追加写入文件
///
/// 写入失败只记录警告，不影响发布流程。
pub struct JsonlEventSink {
    file_path: PathBuf,
    lock: Mutex<()>,
}

impl JsonlEventSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: path.into(),
            lock: Mutex::new(()),
        }
    }

    fn append(&self, event: &PublishEvent) -> std::io::Result<()> {
        let line = serde_json::json!({
            "at": chrono::Local::now().to_rfc3339(),
            "data": event,
        });

        let _guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file_path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }
}

impl EventSink for JsonlEventSink {
    fn emit(&self, event: &PublishEvent) {
        if let Err(e) = self.append(event) {
            warn!("写入事件日志失败 ({}): {}", self.file_path.display(), e);
        }
    }
}

/// 保存在内存中，便于测试断言
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<PublishEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<PublishEvent> {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: &PublishEvent) {
        self.events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(event.clone());
    }
}

/// 同时输出到多个 sink
#[derive(Default, Clone)]
pub struct FanoutEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl FanoutEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.sinks.push(sink);
        self
    }
}

impl EventSink for FanoutEventSink {
    fn emit(&self, event: &PublishEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
