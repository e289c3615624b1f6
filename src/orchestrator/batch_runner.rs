//! 批量发布执行器 - 编排层
//!
//! ## 职责
//!
//! 1. **顺序执行**：严格按文档顺序逐篇发布，同一时间只有一个浏览器会话
//! 2. **断点续传**：`resume` 时跳过进度文件中已完成的文章
//! 3. **熔断重启**：连续失败达到阈值或会话断开时，在下一篇之前重建会话
//! 4. **进度持久化**：每篇结束后立即写入进度文件
//!
//! 只做调度和统计，单篇文章的细节委托给 `PublishFlow`。

use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{error, info, warn};

use crate::error::{PublishError, Result};
use crate::infrastructure::{PageDriver, SessionFactory};
use crate::models::{PublishJob, PublishResult};
use crate::services::{EventSink, ProgressStore, PublishEvent};
use crate::workflow::{JobCtx, PublishFlow};

/// 批次参数
#[derive(Debug, Clone)]
pub struct BatchOptions {
    /// 跳过进度文件中已完成的文章
    pub resume: bool,
    /// 相邻两篇之间的最小间隔
    pub pacing: Duration,
    /// 连续失败多少次后重启会话
    pub failure_threshold: u32,
    /// 最多实际执行多少篇（跳过的不计）
    pub limit: Option<usize>,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            resume: false,
            pacing: Duration::from_secs(5),
            failure_threshold: 5,
            limit: None,
        }
    }
}

/// 批次统计
#[derive(Debug, Default)]
pub struct BatchReport {
    pub total: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub restarts: usize,
    pub results: Vec<PublishResult>,
}

impl BatchReport {
    pub fn executed(&self) -> usize {
        self.succeeded + self.failed
    }
}

/// 批量发布执行器
///
/// 唯一持有浏览器会话的模块。会话在第一篇执行前按需打开，
/// 需要重启时在下一篇执行前关闭并重建。
pub struct BatchRunner {
    factory: Arc<dyn SessionFactory>,
    flow: PublishFlow,
    progress: ProgressStore,
    sink: Arc<dyn EventSink>,
    options: BatchOptions,
    session: Option<Box<dyn PageDriver>>,
    generation: u64,
    consecutive_failures: u32,
    pending_restart: Option<String>,
}

impl BatchRunner {
    pub fn new(
        factory: Arc<dyn SessionFactory>,
        flow: PublishFlow,
        progress: ProgressStore,
        sink: Arc<dyn EventSink>,
        options: BatchOptions,
    ) -> Self {
        Self {
            factory,
            flow,
            progress,
            sink,
            options,
            session: None,
            generation: 0,
            consecutive_failures: 0,
            pending_restart: None,
        }
    }

    /// 当前会话代数（0 表示尚未打开会话）
    pub fn session_generation(&self) -> u64 {
        self.generation
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.consecutive_failures
    }

    pub fn progress(&self) -> &ProgressStore {
        &self.progress
    }

    /// 按顺序执行全部任务
    ///
    /// 登录失效时记录并持久化后中止批次，返回错误；其他失败只影响单篇。
    pub async fn run(&mut self, jobs: &[PublishJob]) -> Result<BatchReport> {
        let mut report = BatchReport {
            total: jobs.len(),
            ..Default::default()
        };

        let outcome = self.run_jobs(jobs, &mut report).await;
        self.shutdown().await;

        if let Err(err) = &outcome {
            error!("❌ 批次中止: {}", err);
            self.sink.emit(&PublishEvent::BatchAborted {
                reason: err.to_string(),
            });
        }
        outcome.map(|()| report)
    }

    async fn run_jobs(&mut self, jobs: &[PublishJob], report: &mut BatchReport) -> Result<()> {
        let total = jobs.len();

        for (i, job) in jobs.iter().enumerate() {
            if self.options.resume && self.progress.is_completed(&job.id) {
                info!("[文章 {}/{}] ⏭️ 已完成，跳过: {}", i + 1, total, job.id);
                self.sink.emit(&PublishEvent::JobSkipped {
                    job_id: job.id.clone(),
                    reason: "已在进度文件中标记完成".to_string(),
                });
                report.skipped += 1;
                continue;
            }

            if let Some(limit) = self.options.limit {
                if report.executed() >= limit {
                    info!("已达到执行上限 {}，剩余文章留待下次", limit);
                    break;
                }
            }

            if report.executed() > 0 && !self.options.pacing.is_zero() {
                sleep(self.options.pacing).await;
            }

            let opened = self.ensure_session().await;
            let ctx = JobCtx::new(&job.id, i + 1, total, self.generation);
            let result = match opened {
                Ok(restarted) => {
                    if restarted {
                        report.restarts += 1;
                    }
                    self.sink.emit(&PublishEvent::JobStarted {
                        job_id: job.id.clone(),
                        index: i + 1,
                        session_generation: self.generation,
                    });

                    let driver = self.session.as_deref().ok_or_else(|| PublishError::SessionBroken {
                        reason: "会话未建立".to_string(),
                    })?;
                    self.flow.run(driver, job, &ctx).await
                }
                Err(err) => self.session_unavailable(&ctx, err),
            };

            let fatal = self.record(&result, &ctx)?;
            if result.success {
                report.succeeded += 1;
            } else {
                report.failed += 1;
            }
            let message = result.message.clone();
            report.results.push(result);

            if fatal {
                return Err(PublishError::auth_expired(message));
            }
        }
        Ok(())
    }

    /// 更新进度和熔断计数，返回是否需要中止批次
    fn record(&mut self, result: &PublishResult, ctx: &JobCtx) -> Result<bool> {
        if result.success {
            self.progress.mark_completed(&result.job_id)?;
            self.consecutive_failures = 0;
            return Ok(false);
        }

        self.progress.mark_failed(&result.job_id)?;
        if result.is_batch_fatal() {
            return Ok(true);
        }

        self.consecutive_failures += 1;
        if result.is_session_broken() {
            warn!("{} 🔌 会话已断开，下一篇之前重启浏览器", ctx);
            self.pending_restart = Some(result.message.clone());
        } else if self.consecutive_failures >= self.options.failure_threshold {
            let tripped = PublishError::CircuitBreakerTripped {
                failures: self.consecutive_failures,
            };
            warn!("{} 🔁 {}，下一篇之前重启浏览器", ctx, tripped);
            self.pending_restart = Some(tripped.to_string());
        }
        Ok(false)
    }

    /// 会话无法建立时，把当前文章记为失败
    ///
    /// 登录失效保持原样（随后中止批次），其余错误一律视为会话断开，下一篇前再次重启。
    fn session_unavailable(&self, ctx: &JobCtx, err: PublishError) -> PublishResult {
        let mut result = PublishResult::new(&ctx.job_id, ctx.session_generation);
        if err.is_batch_fatal() {
            result.fail(&err);
        } else {
            result.fail(&PublishError::SessionBroken {
                reason: format!("浏览器会话无法建立: {}", err),
            });
        }
        error!("{} ❌ {}", ctx, result.message);
        self.sink.emit(&PublishEvent::JobFinished {
            job_id: result.job_id.clone(),
            success: false,
            terminal: result.terminal,
            url: None,
            message: result.message.clone(),
        });
        result
    }

    /// 确保会话可用，返回本次是否发生了重启
    async fn ensure_session(&mut self) -> Result<bool> {
        let restart_reason = self.pending_restart.take();
        if restart_reason.is_some() {
            self.shutdown().await;
        }

        if self.session.is_some() {
            return Ok(false);
        }

        let session = self.factory.open().await?;
        self.session = Some(session);
        self.generation += 1;

        match restart_reason {
            Some(reason) => {
                self.consecutive_failures = 0;
                info!("🔄 会话已重启 (第 {} 代): {}", self.generation, reason);
                self.sink.emit(&PublishEvent::SessionRestarted {
                    generation: self.generation,
                    reason,
                });
                Ok(true)
            }
            None => {
                info!("🌐 会话已建立 (第 {} 代)", self.generation);
                Ok(false)
            }
        }
    }

    async fn shutdown(&mut self) {
        if let Some(mut session) = self.session.take() {
            if let Err(e) = session.close().await {
                warn!("关闭浏览器会话失败: {}", e);
            }
        }
    }
}
