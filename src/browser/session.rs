//! 浏览器会话工厂
//!
//! 每次打开会话都会：启动或连接浏览器 → 注入登录 Cookie → 访问首页确认仍处于登录状态。

use async_trait::async_trait;
use chromiumoxide::cdp::browser_protocol::network::{CookieParam, CookieSameSite, TimeSinceEpoch};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::browser::{connect_to_browser_and_page, launch_browser};
use crate::error::{PublishError, Result};
use crate::infrastructure::{JsExecutor, PageDriver, SessionFactory};

/// 登录状态文件（`{"cookies": [...]}`）
#[derive(Debug, Default, Deserialize)]
pub struct SessionState {
    #[serde(default)]
    pub cookies: Vec<StoredCookie>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoredCookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: Option<String>,
    #[serde(default)]
    pub path: Option<String>,
    /// 秒级时间戳，-1 表示会话 Cookie
    #[serde(default)]
    pub expires: Option<f64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default)]
    pub same_site: Option<String>,
}

impl SessionState {
    /// 读取登录状态文件；文件缺失或没有任何 Cookie 都视为登录失效
    pub async fn load(path: &Path) -> Result<Self> {
        let raw = tokio::fs::read_to_string(path).await.map_err(|e| {
            PublishError::auth_expired(format!("无法读取登录状态文件 {}: {}", path.display(), e))
        })?;
        let state: SessionState = serde_json::from_str(&raw).map_err(|e| {
            PublishError::auth_expired(format!("登录状态文件格式错误 {}: {}", path.display(), e))
        })?;
        if state.cookies.is_empty() {
            return Err(PublishError::auth_expired(format!(
                "登录状态文件中没有 Cookie: {}",
                path.display()
            )));
        }
        Ok(state)
    }

    fn cookie_params(&self) -> Vec<CookieParam> {
        self.cookies.iter().filter_map(StoredCookie::to_param).collect()
    }
}

impl StoredCookie {
    fn to_param(&self) -> Option<CookieParam> {
        let mut builder = CookieParam::builder()
            .name(self.name.clone())
            .value(self.value.clone())
            .http_only(self.http_only)
            .secure(self.secure);
        if let Some(domain) = &self.domain {
            builder = builder.domain(domain.clone());
        }
        if let Some(path) = &self.path {
            builder = builder.path(path.clone());
        }
        if let Some(expires) = self.expires.filter(|e| *e > 0.0) {
            builder = builder.expires(TimeSinceEpoch::new(expires));
        }
        if let Some(same_site) = self.same_site.as_deref().and_then(parse_same_site) {
            builder = builder.same_site(same_site);
        }

        match builder.build() {
            Ok(param) => Some(param),
            Err(e) => {
                warn!("忽略无效 Cookie '{}': {}", self.name, e);
                None
            }
        }
    }
}

fn parse_same_site(value: &str) -> Option<CookieSameSite> {
    match value.to_ascii_lowercase().as_str() {
        "strict" => Some(CookieSameSite::Strict),
        "lax" => Some(CookieSameSite::Lax),
        "none" => Some(CookieSameSite::None),
        _ => None,
    }
}

/// 浏览器启动方式
#[derive(Debug, Clone)]
pub enum BrowserMode {
    /// 连接已开启调试端口的浏览器
    Connect { port: u16 },
    /// 启动新的浏览器进程
    Launch {
        headless: bool,
        executable: Option<String>,
    },
}

/// 基于 chromiumoxide 的会话工厂
#[derive(Debug, Clone)]
pub struct ChromeSessionFactory {
    pub mode: BrowserMode,
    pub session_state_file: PathBuf,
    pub home_url: String,
    pub login_url_marker: String,
    pub navigation_timeout: Duration,
}

impl ChromeSessionFactory {
    async fn verify_login(&self, driver: &dyn PageDriver) -> Result<()> {
        tokio::time::timeout(self.navigation_timeout, driver.goto(&self.home_url))
            .await
            .map_err(|_| PublishError::NavigationTimeout {
                target: self.home_url.clone(),
                timeout_ms: self.navigation_timeout.as_millis() as u64,
            })??;

        let url = driver.current_url().await?;
        debug!("登录检查页面: {}", url);
        if url.contains(&self.login_url_marker) {
            return Err(PublishError::auth_expired(format!(
                "访问首页被重定向到登录页: {}",
                url
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl SessionFactory for ChromeSessionFactory {
    async fn open(&self) -> Result<Box<dyn PageDriver>> {
        let state = SessionState::load(&self.session_state_file).await?;

        let (browser, page, handler, owns_browser) = match &self.mode {
            BrowserMode::Connect { port } => {
                let (browser, page, handler) = connect_to_browser_and_page(*port, None).await?;
                (browser, page, handler, false)
            }
            BrowserMode::Launch { headless, executable } => {
                let (browser, page, handler) = launch_browser(*headless, executable.as_deref()).await?;
                (browser, page, handler, true)
            }
        };

        let cookies = state.cookie_params();
        let count = cookies.len();
        page.set_cookies(cookies).await?;
        debug!("已注入 {} 个 Cookie", count);

        let mut executor = JsExecutor::with_browser(page, browser, handler, owns_browser);
        if let Err(err) = self.verify_login(&executor).await {
            if let Err(e) = executor.close().await {
                warn!("关闭浏览器会话失败: {}", e);
            }
            return Err(err);
        }

        info!("✓ 登录状态有效");
        Ok(Box::new(executor))
    }
}
