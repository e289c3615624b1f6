//! 基础设施层：持有浏览器页面这一稀缺资源，只暴露能力

pub mod driver;
pub mod js_executor;

pub use driver::{ElementRef, PageDriver, SessionFactory, Strategy};
pub use js_executor::JsExecutor;
