//! 页面驱动抽象 - 基础设施层
//!
//! `PageDriver` 是流程层与浏览器之间唯一的接缝：
//! 生产环境由 `JsExecutor` 基于 chromiumoxide 实现，测试中使用内存中的假页面。

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Result;

/// 单个控件匹配策略
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Strategy {
    /// `selector` 命中且可见文本与 `text` 完全一致
    ExactText { selector: String, text: String },
    /// `selector` 命中且可见文本包含 `text`
    PartialText { selector: String, text: String },
    /// ARIA 角色（含隐式角色），可选按名称过滤
    Role { role: String, name: Option<String> },
    /// 属性选择器
    Attribute { selector: String },
}

impl Strategy {
    pub fn exact_text(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Strategy::ExactText {
            selector: selector.into(),
            text: text.into(),
        }
    }

    pub fn partial_text(selector: impl Into<String>, text: impl Into<String>) -> Self {
        Strategy::PartialText {
            selector: selector.into(),
            text: text.into(),
        }
    }

    pub fn role(role: impl Into<String>, name: Option<&str>) -> Self {
        Strategy::Role {
            role: role.into(),
            name: name.map(str::to_string),
        }
    }

    pub fn attribute(selector: impl Into<String>) -> Self {
        Strategy::Attribute {
            selector: selector.into(),
        }
    }
}

/// 页面中已定位的元素
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementRef {
    /// 驱动内部使用的句柄
    pub handle: String,
    /// 元素的可见文本（空白已规整）
    pub text: String,
}

/// 单个浏览器页面的操作能力
#[async_trait]
pub trait PageDriver: Send + Sync {
    /// 导航到指定 URL
    async fn goto(&self, url: &str) -> Result<()>;

    /// 当前 URL
    async fn current_url(&self) -> Result<String>;

    /// 按策略查询元素，按文档顺序返回
    async fn query(&self, strategy: &Strategy, visible_only: bool) -> Result<Vec<ElementRef>>;

    async fn click(&self, element: &ElementRef) -> Result<()>;

    /// 逐字输入
    async fn type_text(&self, element: &ElementRef, text: &str) -> Result<()>;

    async fn press_enter(&self, element: &ElementRef) -> Result<()>;

    /// 直接替换输入框的值
    async fn fill(&self, element: &ElementRef, value: &str) -> Result<()>;

    /// 以粘贴事件写入富文本
    async fn paste_html(&self, element: &ElementRef, html: &str, plain: &str) -> Result<()>;

    /// 为文件输入框设置文件
    async fn upload_files(&self, element: &ElementRef, files: &[PathBuf]) -> Result<()>;

    async fn screenshot(&self, path: &Path) -> Result<()>;

    /// 关闭页面（以及自行启动的浏览器）
    async fn close(&mut self) -> Result<()>;
}

/// 创建已登录的浏览器会话
///
/// 每次调用都返回全新的会话，并已完成登录校验。
#[async_trait]
pub trait SessionFactory: Send + Sync {
    async fn open(&self) -> Result<Box<dyn PageDriver>>;
}
