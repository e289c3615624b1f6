//! # note publisher
//!
//! 把本地 Markdown 文章批量发布到 note.com 的浏览器自动化工具
//!
//! ## 架构设计
//!
//! 本系统采用严格的四层架构：
//!
//! ### ① 基础设施层（Infrastructure）
//! - `infrastructure/` - 持有稀缺资源（Page），只暴露能力
//! - `PageDriver` - 页面能力抽象，便于用假页面测试
//! - `JsExecutor` - 基于 chromiumoxide 的唯一 page owner
//!
//! ### ② 业务能力层（Services）
//! - `services/` - 描述"我能做什么"，不关心流程顺序
//! - `DocumentParser` / `ImageResolver` - 文档解析与图片收集
//! - `LocatorResolver` - 按优先级策略定位控件
//! - `ProgressStore` / `EventSink` - 进度与事件日志
//!
//! ### ③ 流程层（Workflow）
//! - `workflow/` - 定义"一篇文章"的完整发布流程
//! - `JobCtx` - 上下文封装（job_id + 序号 + 会话代数）
//! - `PublishFlow` - 状态机（标题 → 正文 → 图片 → 设置 → 提交 → 确认）
//!
//! ### ④ 编排层（Orchestration）
//! - `orchestrator/batch_runner` - 顺序执行、断点续传、熔断重启
//! - `orchestrator/batch_processor` - 应用入口，组装各层
//!
//! ## 模块结构

pub mod browser;
pub mod config;
pub mod error;
pub mod infrastructure;

pub mod models;
pub mod orchestrator;
pub mod services;
pub mod utils;
pub mod workflow;

// 重新导出常用类型
pub use browser::{connect_to_browser_and_page, ChromeSessionFactory};
pub use config::Config;
pub use error::{FailureKind, PublishError, Result};
pub use infrastructure::{JsExecutor, PageDriver, SessionFactory};
pub use models::{ParsedDocument, PublishJob, PublishResult};
pub use orchestrator::{App, BatchOptions, BatchReport, BatchRunner};
pub use services::{parse_document, DocumentParser};
pub use workflow::{JobCtx, PublishFlow};
