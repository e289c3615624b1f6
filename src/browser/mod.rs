//! 浏览器接入：连接 / 启动浏览器，构建已登录的会话

pub mod connection;
pub mod headless;
pub mod session;

pub use connection::connect_to_browser_and_page;
pub use headless::launch_browser;
pub use session::{BrowserMode, ChromeSessionFactory, SessionState};

use chromiumoxide::handler::Handler;
use futures::StreamExt;
use tokio::task::JoinHandle;
use tracing::debug;

/// 在后台轮询 CDP 事件流，会话关闭时由调用方 abort
fn spawn_handler(mut handler: Handler) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = handler.next().await {
            if let Err(e) = event {
                debug!("浏览器事件流结束: {}", e);
                break;
            }
        }
    })
}
