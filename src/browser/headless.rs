use chromiumoxide::{Browser, BrowserConfig, Page};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, error, info};

use crate::browser::spawn_handler;
use crate::error::{PublishError, Result};

/// 启动新的浏览器进程并打开空白页
///
/// - `headless`: 是否使用无头模式
/// - `executable`: 浏览器可执行文件路径，未指定时由 chromiumoxide 自动查找
pub async fn launch_browser(
    headless: bool,
    executable: Option<&str>,
) -> Result<(Browser, Page, JoinHandle<()>)> {
    info!("🚀 启动浏览器 (无头模式: {})...", headless);

    let mut builder = BrowserConfig::builder()
        .args(vec![
            "--disable-gpu",
            "--no-sandbox",
            "--disable-dev-shm-usage",
            "--lang=ja-JP",
        ])
        .window_size(1280, 1800);
    if headless {
        builder = builder.new_headless_mode();
    } else {
        builder = builder.with_head();
    }
    if let Some(path) = executable {
        debug!("浏览器路径: {}", path);
        builder = builder.chrome_executable(path);
    }

    let config = builder.build().map_err(|e| {
        error!("配置浏览器失败: {}", e);
        PublishError::Config(format!("配置浏览器失败: {}", e))
    })?;

    let (browser, handler) = Browser::launch(config).await.map_err(|e| {
        error!("启动浏览器失败: {}", e);
        e
    })?;
    let handle = spawn_handler(handler);
    debug!("浏览器启动成功");

    sleep(Duration::from_millis(300)).await;

    let page = browser.new_page("about:blank").await.map_err(|e| {
        error!("创建页面失败: {}", e);
        e
    })?;
    info!("✅ 浏览器已就绪");

    Ok((browser, page, handle))
}
