//! 文章发布流程 - 流程层
//!
//! 核心职责：定义"一篇文章"从打开编辑器到确认发布的完整状态机
//!
//! 流程顺序：
//! 1. 打开编辑器 → 标题 → 正文 → 图片（可选）
//! 2. 草稿模式：保存草稿后结束
//! 3. 发布模式：进入设置 → 标签 / 价格 / 付费分隔线 / 合集（均可选）→ 提交 → 确认
//!
//! 必需控件缺失会让本篇失败；可选控件缺失只记录并跳过。

use pulldown_cmark::{Options, Parser};
use std::future::Future;
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;
use tracing::{debug, error, info, warn};

use crate::error::{PublishError, Result};
use crate::infrastructure::{ElementRef, PageDriver};
use crate::models::{
    PaywallPlacement, PublishJob, PublishMode, PublishResult, PublishStage, TerminalState,
};
use crate::services::{
    poll_until, EventSink, ImageResolver, LocatorResolver, PollPolicy, PublishEvent, Target,
};
use crate::workflow::controls::EditorControls;
use crate::workflow::publish_ctx::JobCtx;

/// 发布流程参数
#[derive(Debug, Clone)]
pub struct FlowOptions {
    pub editor_url: String,
    /// URL 中出现该片段即视为被重定向到登录页
    pub login_url_marker: String,
    /// 单个控件的等待上限
    pub step_timeout: Duration,
    pub navigation_timeout: Duration,
    /// 提交后等待确认的上限
    pub confirm_timeout: Duration,
    /// 非提交类操作遇到临时错误时的重试次数
    pub step_retries: u32,
    pub retry_backoff: Duration,
    pub poll: PollPolicy,
    /// 试运行：执行所有步骤但不点击提交
    pub dry_run: bool,
    pub screenshot_dir: PathBuf,
}

impl Default for FlowOptions {
    fn default() -> Self {
        Self {
            editor_url: "https://editor.note.com/new".to_string(),
            login_url_marker: "/login".to_string(),
            step_timeout: Duration::from_secs(15),
            navigation_timeout: Duration::from_secs(30),
            confirm_timeout: Duration::from_secs(20),
            step_retries: 2,
            retry_backoff: Duration::from_millis(500),
            poll: PollPolicy::default(),
            dry_run: false,
            screenshot_dir: PathBuf::from("screenshots"),
        }
    }
}

/// 流程的终点
#[derive(Debug)]
enum Outcome {
    Published { url: String, uncertain: bool },
    DraftSaved { url: String, uncertain: bool },
    DryRun { url: String },
}

/// 提交后观察到的确认信号
#[derive(Debug)]
enum Acknowledgement {
    UrlChanged(String),
    Notice(String),
}

/// 文章发布流程
///
/// - 编排单篇文章的全部 UI 步骤
/// - 不持有浏览器资源，只借用 `PageDriver`
/// - 每一步都先通过 `LocatorResolver` 定位控件
pub struct PublishFlow {
    resolver: LocatorResolver,
    controls: EditorControls,
    images: ImageResolver,
    options: FlowOptions,
    sink: Arc<dyn EventSink>,
}

impl PublishFlow {
    /// 创建新的发布流程
    pub fn new(options: FlowOptions, sink: Arc<dyn EventSink>) -> Self {
        Self {
            resolver: LocatorResolver::new(options.poll),
            controls: EditorControls::default(),
            images: ImageResolver::new(),
            options,
            sink,
        }
    }

    pub fn with_controls(mut self, controls: EditorControls) -> Self {
        self.controls = controls;
        self
    }

    pub fn options(&self) -> &FlowOptions {
        &self.options
    }

    /// 执行单篇文章的发布
    ///
    /// 总是返回结构化结果；失败时附带截图路径和失败分类。
    pub async fn run(&self, driver: &dyn PageDriver, job: &PublishJob, ctx: &JobCtx) -> PublishResult {
        let mut result = PublishResult::new(&job.id, ctx.session_generation);
        self.log_job_start(ctx, job);

        match self.drive(driver, job, ctx, &mut result).await {
            Ok(outcome) => self.conclude(driver, ctx, &mut result, outcome).await,
            Err(err) => {
                error!("{} ❌ 发布失败: {}", ctx, err);
                result.fail(&err);
                result.final_url = driver.current_url().await.ok();
                result.screenshot_path = self.capture(driver, ctx, "failed").await;
            }
        }

        self.sink.emit(&PublishEvent::JobFinished {
            job_id: job.id.clone(),
            success: result.success,
            terminal: result.terminal,
            url: result.final_url.clone(),
            message: result.message.clone(),
        });
        result
    }

    async fn drive(
        &self,
        driver: &dyn PageDriver,
        job: &PublishJob,
        ctx: &JobCtx,
        result: &mut PublishResult,
    ) -> Result<Outcome> {
        self.enter(ctx, PublishStage::Init);
        self.open_editor(driver, ctx).await?;

        self.enter(ctx, PublishStage::TitleSet);
        self.retrying(ctx, "填写标题", || async move {
            let field = self.require(driver, &self.controls.title, PublishStage::TitleSet).await?;
            driver.fill(&field, &job.document.title).await
        })
        .await?;

        self.enter(ctx, PublishStage::BodyInjected);
        let markdown = self.images.strip_local_images(&job.document.body);
        let html = markdown_to_html(&markdown);
        let (markdown, html) = (markdown.as_str(), html.as_str());
        self.retrying(ctx, "写入正文", || async move {
            let editor = self.require(driver, &self.controls.body, PublishStage::BodyInjected).await?;
            driver.click(&editor).await?;
            driver.paste_html(&editor, html, markdown).await
        })
        .await?;
        info!("{} ✓ 正文已写入 ({} 字符)", ctx, markdown.chars().count());

        if !job.images.is_empty() {
            self.enter(ctx, PublishStage::ImagesAttached);
            self.attach_images(driver, job, ctx, result).await?;
        }

        if job.mode == PublishMode::Draft {
            if self.options.dry_run {
                info!("{} 🧪 试运行模式，跳过保存草稿", ctx);
                return Ok(Outcome::DryRun {
                    url: driver.current_url().await?,
                });
            }
            return self.save_draft(driver, ctx).await;
        }

        self.enter(ctx, PublishStage::AdvancedToSettings);
        self.advance_to_settings(driver, ctx).await?;

        if !job.document.tags.is_empty() {
            self.enter(ctx, PublishStage::TagsApplied);
            self.apply_tags(driver, job, ctx, result).await?;
        }

        if let Some(price) = job.effective_price() {
            self.enter(ctx, PublishStage::MonetizationApplied);
            self.apply_price(driver, price, ctx, result).await?;

            if result.applied_price.is_some() {
                self.enter(ctx, PublishStage::PaywallLineLocated);
                result.paywall = self.place_paywall(driver, job, ctx, result).await?;
            }
        }

        self.enter(ctx, PublishStage::CollectionApplied);
        self.apply_distribution(driver, job, ctx, result).await?;

        if self.options.dry_run {
            info!("{} 🧪 试运行模式，跳过提交", ctx);
            return Ok(Outcome::DryRun {
                url: driver.current_url().await?,
            });
        }

        self.enter(ctx, PublishStage::SubmitClicked);
        let settings_url = driver.current_url().await?;
        let submit = self
            .require(driver, &self.controls.submit, PublishStage::SubmitClicked)
            .await?;
        // 提交不重试，避免重复发布
        driver.click(&submit).await?;
        info!("{} 📤 已点击提交", ctx);

        self.enter(ctx, PublishStage::ConfirmationHandled);
        let (url, uncertain) = self
            .acknowledge(
                driver,
                ctx,
                &settings_url,
                &self.controls.success_notice,
                Some(&self.controls.confirm_dialog),
            )
            .await?;
        Ok(Outcome::Published { url, uncertain })
    }

    // ========== 各阶段 ==========

    async fn open_editor(&self, driver: &dyn PageDriver, ctx: &JobCtx) -> Result<()> {
        let url = self.options.editor_url.as_str();
        let timeout = self.options.navigation_timeout;

        self.retrying(ctx, "打开编辑器", || async move {
            tokio::time::timeout(timeout, driver.goto(url))
                .await
                .map_err(|_| PublishError::NavigationTimeout {
                    target: url.to_string(),
                    timeout_ms: timeout.as_millis() as u64,
                })?
        })
        .await?;

        let current = driver.current_url().await?;
        if current.contains(&self.options.login_url_marker) {
            return Err(PublishError::auth_expired(format!(
                "打开编辑器时被重定向到登录页: {}",
                current
            )));
        }
        debug!("{} 编辑器已打开: {}", ctx, current);
        Ok(())
    }

    async fn attach_images(
        &self,
        driver: &dyn PageDriver,
        job: &PublishJob,
        ctx: &JobCtx,
        result: &mut PublishResult,
    ) -> Result<()> {
        let stage = PublishStage::ImagesAttached;

        if let Some(cover) = &job.images.cover {
            let opened = self
                .optional_action(driver, &self.controls.cover_button, stage, ctx, result, |button| async move {
                    driver.click(&button).await
                })
                .await?;
            if opened && self.upload(driver, &cover.resolved_path, ctx, result).await? {
                info!("{} 🖼️ 封面图已上传: {}", ctx, cover.source_path);
            }
        }

        for image in &job.images.inline {
            let opened = self
                .optional_action(driver, &self.controls.inline_image_button, stage, ctx, result, |button| async move {
                    driver.click(&button).await
                })
                .await?;
            if !opened {
                break;
            }
            if self.upload(driver, &image.resolved_path, ctx, result).await? {
                info!("{} 🖼️ 正文图片已上传: {}", ctx, image.source_path);
            }
        }
        Ok(())
    }

    async fn upload(
        &self,
        driver: &dyn PageDriver,
        file: &PathBuf,
        ctx: &JobCtx,
        result: &mut PublishResult,
    ) -> Result<bool> {
        let files = std::slice::from_ref(file);
        self.optional_action(
            driver,
            &self.controls.image_input,
            PublishStage::ImagesAttached,
            ctx,
            result,
            |input| async move { driver.upload_files(&input, files).await },
        )
        .await
    }

    async fn save_draft(&self, driver: &dyn PageDriver, ctx: &JobCtx) -> Result<Outcome> {
        info!("{} 📝 草稿模式，保存草稿", ctx);
        let before = driver.current_url().await?;
        let button = self
            .require(driver, &self.controls.save_draft, PublishStage::BodyInjected)
            .await?;
        driver.click(&button).await?;

        let (url, uncertain) = self
            .acknowledge(driver, ctx, &before, &self.controls.draft_saved_notice, None)
            .await?;
        Ok(Outcome::DraftSaved { url, uncertain })
    }

    async fn advance_to_settings(&self, driver: &dyn PageDriver, ctx: &JobCtx) -> Result<()> {
        let editor_url = driver.current_url().await?;
        self.retrying(ctx, "进入发布设置", || async move {
            let proceed = self
                .require(driver, &self.controls.proceed, PublishStage::AdvancedToSettings)
                .await?;
            driver.click(&proceed).await
        })
        .await?;

        let editor_url = editor_url.as_str();
        let reached = poll_until(self.options.navigation_timeout, self.options.poll, || async move {
            let url = driver.current_url().await?;
            if url != editor_url {
                return Ok(Some(url));
            }
            Ok(self
                .resolver
                .probe(driver, &self.controls.submit)
                .await?
                .map(|_| url))
        })
        .await?;

        match reached {
            Some(url) => {
                info!("{} ✓ 已进入发布设置: {}", ctx, url);
                Ok(())
            }
            None => Err(PublishError::NavigationTimeout {
                target: "发布设置页".to_string(),
                timeout_ms: self.options.navigation_timeout.as_millis() as u64,
            }),
        }
    }

    async fn apply_tags(
        &self,
        driver: &dyn PageDriver,
        job: &PublishJob,
        ctx: &JobCtx,
        result: &mut PublishResult,
    ) -> Result<()> {
        for tag in &job.document.tags {
            let tag = tag.as_str();
            let applied = self
                .optional_action(driver, &self.controls.tag_input, PublishStage::TagsApplied, ctx, result, |input| async move {
                    driver.type_text(&input, tag).await?;
                    driver.press_enter(&input).await
                })
                .await?;
            if !applied {
                break;
            }
            result.tags_applied.push(tag.to_string());
        }
        info!(
            "{} 🏷️ 标签: {}/{} 已设置",
            ctx,
            result.tags_applied.len(),
            job.document.tags.len()
        );
        Ok(())
    }

    async fn apply_price(
        &self,
        driver: &dyn PageDriver,
        price: u32,
        ctx: &JobCtx,
        result: &mut PublishResult,
    ) -> Result<()> {
        let stage = PublishStage::MonetizationApplied;
        let toggled = self
            .optional_action(driver, &self.controls.paid_toggle, stage, ctx, result, |toggle| async move {
                driver.click(&toggle).await
            })
            .await?;
        if !toggled {
            return Ok(());
        }

        let price_text = price.to_string();
        let price_text = price_text.as_str();
        let priced = self
            .optional_action(driver, &self.controls.price_input, stage, ctx, result, |input| async move {
                driver.fill(&input, price_text).await
            })
            .await?;
        if priced {
            result.applied_price = Some(price);
            info!("{} 💰 价格已设置: {}", ctx, price);
        }
        Ok(())
    }

    async fn place_paywall(
        &self,
        driver: &dyn PageDriver,
        job: &PublishJob,
        ctx: &JobCtx,
        result: &mut PublishResult,
    ) -> Result<PaywallPlacement> {
        let stage = PublishStage::PaywallLineLocated;
        let document = &job.document;
        let index = match document.paywall_paragraph_index {
            Some(index) if index > 0 => index,
            _ => {
                info!("{} 未标记付费分隔线，整篇付费", ctx);
                return Ok(PaywallPlacement::WholeDocument);
            }
        };

        self.optional_action(driver, &self.controls.paid_area_entry, stage, ctx, result, |button| async move {
            driver.click(&button).await
        })
        .await?;

        let controls = self
            .resolver
            .find_all(driver, &self.controls.paywall_controls, self.options.step_timeout)
            .await?;
        if controls.is_empty() {
            self.skip(ctx, stage, &self.controls.paywall_controls.name, result);
            return Ok(PaywallPlacement::NotPlaced);
        }

        let paragraphs: Vec<String> = self
            .resolver
            .find_all(driver, &self.controls.paragraphs, self.options.step_timeout)
            .await?
            .into_iter()
            .map(|p| p.text)
            .collect();

        let search_text = document.paywall_search_text.as_deref();
        let placement = choose_paywall_placement(&paragraphs, search_text, index, controls.len());
        let ordinal = match placement {
            PaywallPlacement::Anchored { ordinal } | PaywallPlacement::IndexFallback { ordinal } => ordinal,
            other => {
                warn!(
                    "{} ⚠️ 付费分隔线无法放置: 第 {} 段超出 {} 个可用位置",
                    ctx,
                    index,
                    controls.len()
                );
                self.report_low_confidence(job, other, search_text);
                return Ok(other);
            }
        };

        if let Err(err) = driver.click(&controls[ordinal]).await {
            if !err.is_retryable() {
                return Err(err);
            }
            warn!("{} ⚠️ 点击付费分隔线按钮失败: {}", ctx, err);
            self.skip(ctx, stage, &self.controls.paywall_controls.name, result);
            return Ok(PaywallPlacement::NotPlaced);
        }

        if placement.is_low_confidence() {
            warn!(
                "{} ⚠️ 未找到段落文本 {:?}，按序号放在第 {} 个位置（低置信度）",
                ctx,
                search_text,
                ordinal + 1
            );
            self.report_low_confidence(job, placement, search_text);
        } else {
            info!("{} ✓ 付费分隔线已放在第 {} 段之后", ctx, ordinal + 1);
            self.sink.emit(&PublishEvent::PaywallPlaced {
                job_id: job.id.clone(),
                placement,
            });
        }
        Ok(placement)
    }

    async fn apply_distribution(
        &self,
        driver: &dyn PageDriver,
        job: &PublishJob,
        ctx: &JobCtx,
        result: &mut PublishResult,
    ) -> Result<()> {
        let stage = PublishStage::CollectionApplied;
        let click = |el: ElementRef| async move { driver.click(&el).await };

        if let Some(name) = job.effective_collection() {
            let entry = self.controls.collection_entry(name);
            if self
                .optional_action(driver, &self.controls.collection_tab, stage, ctx, result, click)
                .await?
                && self.optional_action(driver, &entry, stage, ctx, result, click).await?
            {
                result.applied_collection = Some(name.to_string());
                info!("{} 📚 已加入合集: {}", ctx, name);
            }
        }

        if let Some(tier) = job.effective_membership() {
            let entry = self.controls.membership_entry(tier);
            if self
                .optional_action(driver, &self.controls.membership_tab, stage, ctx, result, click)
                .await?
                && self.optional_action(driver, &entry, stage, ctx, result, click).await?
            {
                result.applied_membership = Some(tier);
                info!("{} 👥 会员档位: {}", ctx, tier);
            }
        }

        if job.effective_cross_post() {
            result.cross_post_applied = self
                .optional_action(driver, &self.controls.cross_post_toggle, stage, ctx, result, click)
                .await?;
        }
        Ok(())
    }

    /// 等待 URL 跳转或成功提示；超时视为"结果不确定"，不重试
    async fn acknowledge(
        &self,
        driver: &dyn PageDriver,
        ctx: &JobCtx,
        from_url: &str,
        notice: &Target,
        dialog: Option<&Target>,
    ) -> Result<(String, bool)> {
        let dialog_clicked = AtomicBool::new(false);
        let dialog_clicked = &dialog_clicked;

        let observed = poll_until(self.options.confirm_timeout, self.options.poll, || async move {
            let url = driver.current_url().await?;
            if url != from_url {
                return Ok(Some(Acknowledgement::UrlChanged(url)));
            }
            if self.resolver.probe(driver, notice).await?.is_some() {
                return Ok(Some(Acknowledgement::Notice(url)));
            }
            if let Some(dialog) = dialog {
                if !dialog_clicked.load(Ordering::SeqCst) {
                    if let Some(button) = self.resolver.probe(driver, dialog).await? {
                        driver.click(&button).await?;
                        dialog_clicked.store(true, Ordering::SeqCst);
                        debug!("{} 已点击确认对话框", ctx);
                    }
                }
            }
            Ok(None)
        })
        .await?;

        match observed {
            Some(Acknowledgement::UrlChanged(url)) => {
                info!("{} ✓ 页面已跳转: {}", ctx, url);
                Ok((url, false))
            }
            Some(Acknowledgement::Notice(url)) => {
                info!("{} ✓ 出现成功提示", ctx);
                Ok((url, false))
            }
            None => {
                let url = driver.current_url().await?;
                let uncertain = PublishError::SubmissionUncertain { url: url.clone() };
                warn!("{} ⚠️ {}，不会自动重试", ctx, uncertain);
                self.sink.emit(&PublishEvent::SubmissionUncertain {
                    job_id: ctx.job_id.clone(),
                    url: url.clone(),
                });
                Ok((url, true))
            }
        }
    }

    async fn conclude(
        &self,
        driver: &dyn PageDriver,
        ctx: &JobCtx,
        result: &mut PublishResult,
        outcome: Outcome,
    ) {
        let (terminal, url, uncertain) = match outcome {
            Outcome::Published { url, uncertain } => (TerminalState::Published, url, uncertain),
            Outcome::DraftSaved { url, uncertain } => (TerminalState::DraftSaved, url, uncertain),
            Outcome::DryRun { url } => (TerminalState::DryRun, url, false),
        };

        if uncertain {
            result.submission_uncertain = true;
            result.screenshot_path = self.capture(driver, ctx, "uncertain").await;
        }

        let message = match (terminal, uncertain) {
            (TerminalState::Published, false) => "发布成功",
            (TerminalState::DraftSaved, false) => "草稿已保存",
            (TerminalState::DryRun, _) => "试运行完成，未提交",
            _ => "已提交，但无法确认结果",
        };
        info!("{} ✅ {} ({})", ctx, message, url);
        result.finish(terminal, Some(url), message);
    }

    // ========== 通用步骤辅助 ==========

    fn enter(&self, ctx: &JobCtx, stage: PublishStage) {
        debug!("{} → {}", ctx, stage);
        self.sink.emit(&PublishEvent::StageEntered {
            job_id: ctx.job_id.clone(),
            stage,
        });
    }

    /// 定位必需控件，找不到即失败
    async fn require(&self, driver: &dyn PageDriver, target: &Target, stage: PublishStage) -> Result<ElementRef> {
        self.resolver
            .find(driver, target, self.options.step_timeout)
            .await?
            .ok_or_else(|| PublishError::required_control(&target.name, stage))
    }

    /// 定位可选控件并执行操作
    ///
    /// 返回是否执行成功。控件缺失或操作反复失败时记录并跳过；
    /// 会话断开等其他错误照常向上传播。
    async fn optional_action<F, Fut>(
        &self,
        driver: &dyn PageDriver,
        target: &Target,
        stage: PublishStage,
        ctx: &JobCtx,
        result: &mut PublishResult,
        action: F,
    ) -> Result<bool>
    where
        F: Fn(ElementRef) -> Fut,
        Fut: Future<Output = Result<()>>,
    {
        let action = &action;
        let attempt = self
            .retrying(ctx, &target.name, || async move {
                let element = self
                    .resolver
                    .find(driver, target, self.options.step_timeout)
                    .await?
                    .ok_or_else(|| PublishError::OptionalControlNotFound {
                        control: target.name.clone(),
                    })?;
                action(element).await
            })
            .await;

        match attempt {
            Ok(()) => Ok(true),
            Err(err @ (PublishError::OptionalControlNotFound { .. } | PublishError::Browser(_))) => {
                warn!("{} ⚠️ {}: {}", ctx, stage, err);
                self.skip(ctx, stage, &target.name, result);
                Ok(false)
            }
            Err(err) => Err(err),
        }
    }

    fn skip(&self, ctx: &JobCtx, stage: PublishStage, control: &str, result: &mut PublishResult) {
        result.skipped_steps.push(control.to_string());
        self.sink.emit(&PublishEvent::OptionalStepSkipped {
            job_id: ctx.job_id.clone(),
            stage,
            control: control.to_string(),
        });
    }

    /// 对临时性浏览器错误按策略重试
    async fn retrying<T, F, Fut>(&self, ctx: &JobCtx, label: &str, mut attempt: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
    {
        let mut tries = 0;
        loop {
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && tries < self.options.step_retries => {
                    tries += 1;
                    warn!(
                        "{} {} 失败 (尝试 {}/{}): {}，稍后重试...",
                        ctx,
                        label,
                        tries,
                        self.options.step_retries + 1,
                        err
                    );
                    sleep(self.options.retry_backoff * tries).await;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn report_low_confidence(&self, job: &PublishJob, placement: PaywallPlacement, search_text: Option<&str>) {
        self.sink.emit(&PublishEvent::PaywallLowConfidence {
            job_id: job.id.clone(),
            placement,
            search_text: search_text.map(str::to_string),
        });
    }

    /// 保存诊断截图，失败时只记录警告
    async fn capture(&self, driver: &dyn PageDriver, ctx: &JobCtx, label: &str) -> Option<PathBuf> {
        let file_name = format!(
            "{}_{}_{}.png",
            ctx.file_stem(),
            label,
            chrono::Local::now().format("%Y%m%d_%H%M%S")
        );
        let path = self.options.screenshot_dir.join(file_name);
        match driver.screenshot(&path).await {
            Ok(()) => {
                info!("{} 📸 截图已保存: {}", ctx, path.display());
                Some(path)
            }
            Err(e) => {
                warn!("{} 截图失败: {}", ctx, e);
                None
            }
        }
    }

    // ========== 日志辅助方法 ==========

    fn log_job_start(&self, ctx: &JobCtx, job: &PublishJob) {
        info!("\n{} {}", ctx, "─".repeat(30));
        info!("{} 标题: {}", ctx, job.document.title);
        info!(
            "{} 模式: {:?}, 标签 {} 个, 价格 {:?}, 图片 {} 张",
            ctx,
            job.mode,
            job.document.tags.len(),
            job.effective_price(),
            job.images.len()
        );
    }
}

/// 选择付费分隔线按钮的位置
///
/// 优先按段落文本定位；找不到时退回 `index - 1`（低置信度）；
/// 两者都超出按钮数量时返回 `NotPlaced`。
pub fn choose_paywall_placement(
    paragraphs: &[String],
    search_text: Option<&str>,
    index: usize,
    control_count: usize,
) -> PaywallPlacement {
    let anchor = search_text.map(normalize_whitespace).filter(|s| !s.is_empty());
    if let Some(anchor) = anchor {
        let found = paragraphs
            .iter()
            .position(|text| normalize_whitespace(text).contains(&anchor));
        if let Some(ordinal) = found.filter(|&ordinal| ordinal < control_count) {
            return PaywallPlacement::Anchored { ordinal };
        }
    }

    match index.checked_sub(1) {
        Some(ordinal) if ordinal < control_count => PaywallPlacement::IndexFallback { ordinal },
        _ => PaywallPlacement::NotPlaced,
    }
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// 把 Markdown 渲染为粘贴用的 HTML
pub fn markdown_to_html(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options);
    let mut html = String::new();
    pulldown_cmark::html::push_html(&mut html, parser);
    html
}
