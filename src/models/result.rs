use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

use crate::error::{FailureKind, PublishError};
use crate::models::MembershipTier;

/// 发布流程所处阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PublishStage {
    Init,
    TitleSet,
    BodyInjected,
    ImagesAttached,
    AdvancedToSettings,
    TagsApplied,
    MonetizationApplied,
    PaywallLineLocated,
    CollectionApplied,
    SubmitClicked,
    ConfirmationHandled,
    Terminal,
}

impl PublishStage {
    pub fn name(self) -> &'static str {
        match self {
            PublishStage::Init => "初始化",
            PublishStage::TitleSet => "填写标题",
            PublishStage::BodyInjected => "写入正文",
            PublishStage::ImagesAttached => "上传图片",
            PublishStage::AdvancedToSettings => "进入发布设置",
            PublishStage::TagsApplied => "设置标签",
            PublishStage::MonetizationApplied => "设置价格",
            PublishStage::PaywallLineLocated => "设置付费分隔线",
            PublishStage::CollectionApplied => "设置合集",
            PublishStage::SubmitClicked => "点击提交",
            PublishStage::ConfirmationHandled => "确认提交结果",
            PublishStage::Terminal => "完成",
        }
    }
}

impl fmt::Display for PublishStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// 终止状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TerminalState {
    Published,
    DraftSaved,
    /// 试运行：所有步骤已执行，但未点击提交
    DryRun,
    Failed,
}

/// 付费分隔线的放置结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "placement", rename_all = "snake_case")]
pub enum PaywallPlacement {
    /// 非付费文章
    #[default]
    NotApplicable,
    /// 付费文章但没有分隔标记，整篇付费
    WholeDocument,
    /// 按段落文本定位成功
    Anchored { ordinal: usize },
    /// 文本未找到，按段落序号兜底（低置信度）
    IndexFallback { ordinal: usize },
    /// 控件缺失或序号越界，未能放置
    NotPlaced,
}

impl PaywallPlacement {
    pub fn is_low_confidence(self) -> bool {
        matches!(
            self,
            PaywallPlacement::IndexFallback { .. } | PaywallPlacement::NotPlaced
        )
    }
}

/// 单篇文章的发布结果
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishResult {
    pub job_id: String,
    pub success: bool,
    pub terminal: TerminalState,
    pub final_url: Option<String>,
    pub screenshot_path: Option<PathBuf>,
    pub message: String,
    /// 实际生效的设置（可选步骤被跳过时可能与请求不同）
    pub applied_price: Option<u32>,
    pub applied_collection: Option<String>,
    pub applied_membership: Option<MembershipTier>,
    pub cross_post_applied: bool,
    pub tags_applied: Vec<String>,
    pub paywall: PaywallPlacement,
    pub submission_uncertain: bool,
    pub failure: Option<FailureKind>,
    pub skipped_steps: Vec<String>,
    pub session_generation: u64,
}

impl PublishResult {
    /// 创建空结果（默认失败，由流程逐步填充）
    pub fn new(job_id: impl Into<String>, session_generation: u64) -> Self {
        Self {
            job_id: job_id.into(),
            success: false,
            terminal: TerminalState::Failed,
            final_url: None,
            screenshot_path: None,
            message: String::new(),
            applied_price: None,
            applied_collection: None,
            applied_membership: None,
            cross_post_applied: false,
            tags_applied: Vec::new(),
            paywall: PaywallPlacement::NotApplicable,
            submission_uncertain: false,
            failure: None,
            skipped_steps: Vec::new(),
            session_generation,
        }
    }

    /// 标记为失败
    pub fn fail(&mut self, err: &PublishError) {
        self.success = false;
        self.terminal = TerminalState::Failed;
        self.failure = Some(err.kind());
        self.message = err.to_string();
    }

    /// 标记为成功结束
    pub fn finish(&mut self, terminal: TerminalState, url: Option<String>, message: impl Into<String>) {
        self.success = true;
        self.terminal = terminal;
        self.final_url = url;
        self.message = message.into();
    }

    pub fn is_session_broken(&self) -> bool {
        self.failure.map_or(false, FailureKind::is_session_broken)
    }

    pub fn is_batch_fatal(&self) -> bool {
        self.failure.map_or(false, FailureKind::is_batch_fatal)
    }
}
