use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::PublishStage;

/// 发布流程错误类型
///
/// 只有 `AuthenticationExpired` 会中止整个批次，其余错误都只影响单篇文章。
#[derive(Debug, Error)]
pub enum PublishError {
    /// 源文件缺失或无法读取（解析器本身从不返回此错误）
    #[error("源文件不可用: {path} ({reason})")]
    MalformedInput { path: String, reason: String },

    /// 登录状态文件缺失或被平台拒绝
    #[error("登录状态已失效: {reason}")]
    AuthenticationExpired { reason: String },

    /// 必需控件未找到，单篇文章失败
    #[error("未找到必需控件 '{control}' (阶段: {stage})")]
    RequiredControlNotFound { control: String, stage: PublishStage },

    /// 可选控件未找到，跳过该步骤
    #[error("未找到可选控件 '{control}'，已跳过")]
    OptionalControlNotFound { control: String },

    /// 提交后既没有跳转也没有成功提示
    #[error("无法确认提交结果 (当前 URL: {url})")]
    SubmissionUncertain { url: String },

    /// 浏览器通道已断开，需要重启会话
    #[error("浏览器会话已断开: {reason}")]
    SessionBroken { reason: String },

    /// 连续失败次数达到阈值
    #[error("连续失败 {failures} 次，触发熔断")]
    CircuitBreakerTripped { failures: u32 },

    /// 页面导航或视图切换超时
    #[error("导航超时: {target} ({timeout_ms}ms)")]
    NavigationTimeout { target: String, timeout_ms: u64 },

    /// 浏览器操作失败（可重试）
    #[error("浏览器操作失败: {0}")]
    Browser(String),

    /// 进度文件读写失败
    #[error("进度文件错误 ({path}): {reason}")]
    Progress { path: String, reason: String },

    /// 配置错误
    #[error("配置错误: {0}")]
    Config(String),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

/// 失败分类，写入 `PublishResult`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    MalformedInput,
    AuthenticationExpired,
    RequiredControlNotFound,
    OptionalControlNotFound,
    SubmissionUncertain,
    SessionBroken,
    CircuitBreakerTripped,
    NavigationTimeout,
    Browser,
    Progress,
    Config,
    Io,
}

impl PublishError {
    /// 获取错误分类
    pub fn kind(&self) -> FailureKind {
        match self {
            PublishError::MalformedInput { .. } => FailureKind::MalformedInput,
            PublishError::AuthenticationExpired { .. } => FailureKind::AuthenticationExpired,
            PublishError::RequiredControlNotFound { .. } => FailureKind::RequiredControlNotFound,
            PublishError::OptionalControlNotFound { .. } => FailureKind::OptionalControlNotFound,
            PublishError::SubmissionUncertain { .. } => FailureKind::SubmissionUncertain,
            PublishError::SessionBroken { .. } => FailureKind::SessionBroken,
            PublishError::CircuitBreakerTripped { .. } => FailureKind::CircuitBreakerTripped,
            PublishError::NavigationTimeout { .. } => FailureKind::NavigationTimeout,
            PublishError::Browser(_) => FailureKind::Browser,
            PublishError::Progress { .. } => FailureKind::Progress,
            PublishError::Config(_) => FailureKind::Config,
            PublishError::Io(_) => FailureKind::Io,
        }
    }

    /// 是否应中止整个批次
    pub fn is_batch_fatal(&self) -> bool {
        matches!(self, PublishError::AuthenticationExpired { .. })
    }

    /// 单步操作是否值得重试
    pub fn is_retryable(&self) -> bool {
        matches!(self, PublishError::Browser(_))
    }
}

impl FailureKind {
    pub fn is_session_broken(self) -> bool {
        self == FailureKind::SessionBroken
    }

    pub fn is_batch_fatal(self) -> bool {
        self == FailureKind::AuthenticationExpired
    }
}

// ========== 从常见错误类型转换 ==========

impl From<chromiumoxide::error::CdpError> for PublishError {
    fn from(err: chromiumoxide::error::CdpError) -> Self {
        use chromiumoxide::error::CdpError;
        match err {
            CdpError::Ws(_) | CdpError::ChannelSendError(_) | CdpError::NoResponse => {
                PublishError::SessionBroken {
                    reason: err.to_string(),
                }
            }
            other => PublishError::Browser(other.to_string()),
        }
    }
}

impl From<serde_json::Error> for PublishError {
    fn from(err: serde_json::Error) -> Self {
        PublishError::Browser(format!("JSON 解析失败: {}", err))
    }
}

// ========== 便捷构造函数 ==========

impl PublishError {
    /// 创建必需控件缺失错误
    pub fn required_control(control: impl Into<String>, stage: PublishStage) -> Self {
        PublishError::RequiredControlNotFound {
            control: control.into(),
            stage,
        }
    }

    /// 创建登录失效错误
    pub fn auth_expired(reason: impl Into<String>) -> Self {
        PublishError::AuthenticationExpired {
            reason: reason.into(),
        }
    }

    /// 创建进度文件错误
    pub fn progress(path: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        PublishError::Progress {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

/// 发布流程结果类型
pub type Result<T> = std::result::Result<T, PublishError>;
