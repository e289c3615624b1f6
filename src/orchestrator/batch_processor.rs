//! 应用入口 - 编排层
//!
//! ## 职责
//!
//! 1. **应用初始化**：读取配置，构建会话工厂、事件日志和发布流程
//! 2. **批量加载**：扫描文档目录，按序号排序并截取范围
//! 3. **委托执行**：交给 `BatchRunner` 顺序发布
//! 4. **全局统计**：汇总并输出结果
//!
//! 浏览器资源由 `BatchRunner` 通过会话工厂按需创建，这里不直接持有。

use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::{info, warn};

use crate::browser::{BrowserMode, ChromeSessionFactory};
use crate::config::Config;
use crate::models::{load_jobs, LoadOptions, PublishJob};
use crate::orchestrator::batch_runner::{BatchOptions, BatchReport, BatchRunner};
use crate::services::{
    EventSink, FanoutEventSink, JsonlEventSink, PollPolicy, ProgressStore, TracingEventSink,
};
use crate::utils::logging::{log_documents_loaded, log_startup, print_final_stats};
use crate::utils::truncate_text;
use crate::workflow::{FlowOptions, PublishFlow};

/// 应用主结构
pub struct App {
    config: Config,
    sink: Arc<dyn EventSink>,
}

impl App {
    /// 初始化应用
    pub async fn initialize(config: Config) -> Result<Self> {
        log_startup(&config);

        tokio::fs::create_dir_all(&config.screenshot_dir)
            .await
            .with_context(|| format!("无法创建截图目录 {}", config.screenshot_dir.display()))?;

        let mut sink = FanoutEventSink::new().with(Arc::new(TracingEventSink));
        if let Some(path) = &config.event_log_file {
            info!("🗒️ 事件日志: {}", path.display());
            sink = sink.with(Arc::new(JsonlEventSink::new(path)));
        }

        Ok(Self {
            config,
            sink: Arc::new(sink),
        })
    }

    /// 运行应用主逻辑
    pub async fn run(&self) -> Result<()> {
        let jobs = self.load_jobs().await?;

        if jobs.is_empty() {
            warn!("⚠️ 没有找到待处理的 Markdown 文件，程序结束");
            return Ok(());
        }
        log_documents_loaded(jobs.len(), self.config.resume, &self.config.progress_file);

        let progress = ProgressStore::load(&self.config.progress_file)
            .context("读取进度文件失败")?;
        let mut runner = BatchRunner::new(
            Arc::new(self.session_factory()),
            PublishFlow::new(self.flow_options(), self.sink.clone()),
            progress,
            self.sink.clone(),
            self.batch_options(),
        );

        let report = runner.run(&jobs).await.context("批量发布中止")?;
        self.print_report(&report);

        Ok(())
    }

    async fn load_jobs(&self) -> Result<Vec<PublishJob>> {
        info!("\n📁 正在扫描待处理的文章...");
        let options = LoadOptions {
            mode: self.config.publish_mode,
            overrides: self.config.overrides.clone(),
            default_price: self.config.default_price,
            start: self.config.range_start,
            end: self.config.range_end,
        };
        load_jobs(&self.config.documents_folder, &options)
            .await
            .with_context(|| format!("无法加载文档目录 {}", self.config.documents_folder.display()))
    }

    fn session_factory(&self) -> ChromeSessionFactory {
        let mode = match self.config.browser_debug_port {
            Some(port) => BrowserMode::Connect { port },
            None => BrowserMode::Launch {
                headless: self.config.headless,
                executable: self.config.chrome_executable.clone(),
            },
        };
        ChromeSessionFactory {
            mode,
            session_state_file: self.config.session_state_file.clone(),
            home_url: self.config.home_url.clone(),
            login_url_marker: self.config.login_url_marker.clone(),
            navigation_timeout: self.config.navigation_timeout(),
        }
    }

    fn flow_options(&self) -> FlowOptions {
        FlowOptions {
            editor_url: self.config.editor_url.clone(),
            login_url_marker: self.config.login_url_marker.clone(),
            step_timeout: self.config.step_timeout(),
            navigation_timeout: self.config.navigation_timeout(),
            confirm_timeout: self.config.confirm_timeout(),
            step_retries: self.config.step_retries,
            poll: PollPolicy {
                initial: self.config.poll_interval(),
                ..PollPolicy::default()
            },
            dry_run: self.config.dry_run,
            screenshot_dir: self.config.screenshot_dir.clone(),
            ..FlowOptions::default()
        }
    }

    fn batch_options(&self) -> BatchOptions {
        BatchOptions {
            resume: self.config.resume,
            pacing: self.config.pacing(),
            failure_threshold: self.config.failure_threshold,
            limit: self.config.limit,
        }
    }

    fn print_report(&self, report: &BatchReport) {
        for result in report.results.iter().filter(|r| !r.success) {
            warn!(
                "❌ {}: {}",
                result.job_id,
                truncate_text(&result.message, 80)
            );
        }
        for result in report.results.iter().filter(|r| r.submission_uncertain) {
            warn!("❓ 需人工确认: {} ({:?})", result.job_id, result.final_url);
        }

        print_final_stats(
            report.total,
            report.succeeded,
            report.failed,
            report.skipped,
            report.restarts,
            &self.config.progress_file,
        );
    }
}
