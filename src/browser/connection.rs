use chromiumoxide::{Browser, Page};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::browser::spawn_handler;
use crate::error::Result;

/// 连接到已开启调试端口的浏览器，并打开一个新标签页
///
/// 不复用用户已打开的页面；返回的 `JoinHandle` 需要在关闭会话时 abort。
pub async fn connect_to_browser_and_page(
    port: u16,
    start_url: Option<&str>,
) -> Result<(Browser, Page, JoinHandle<()>)> {
    let endpoint = format!("http://localhost:{}", port);
    info!("🔌 正在连接浏览器: {}", endpoint);

    let (browser, handler) = Browser::connect(&endpoint).await.map_err(|e| {
        error!("连接浏览器失败 ({}): {}", endpoint, e);
        e
    })?;
    let handle = spawn_handler(handler);

    // 等待浏览器状态同步
    sleep(Duration::from_millis(300)).await;

    let page = browser.new_page(start_url.unwrap_or("about:blank")).await.map_err(|e| {
        error!("打开新标签页失败: {}", e);
        e
    })?;
    debug!("新标签页已打开: {:?}", start_url);

    Ok((browser, page, handle))
}
