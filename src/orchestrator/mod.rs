//! 编排层（Orchestration Layer）
//!
//! ## 职责
//!
//! 本层负责批量调度，是整个系统的"指挥中心"。
//!
//! ## 模块划分
//!
//! ### `batch_processor` - 应用入口
//! - 管理应用生命周期（初始化、运行、统计）
//! - 加载文档并构建发布任务（Vec<PublishJob>）
//! - 组装会话工厂、事件日志和发布流程
//!
//! ### `batch_runner` - 批量发布执行器
//! - 严格按顺序执行任务，断点续传
//! - 持有唯一的浏览器会话，连续失败或断开时重启
//! - 持久化进度
//!
//! ## 层次关系
//!
//! ```text
//! batch_processor (加载 Vec<PublishJob>)
//!     ↓
//! batch_runner (顺序执行，管理会话)
//!     ↓
//! workflow::PublishFlow (处理单篇文章)
//!     ↓
//! services (能力层：parser / images / locator / progress / events)
//!     ↓
//! infrastructure (基础设施：PageDriver / JsExecutor)
//! ```

pub mod batch_processor;
pub mod batch_runner;

// 重新导出主要类型
pub use batch_processor::App;
pub use batch_runner::{BatchOptions, BatchReport, BatchRunner};
