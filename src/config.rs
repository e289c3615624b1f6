use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use tracing::warn;

use crate::error::{PublishError, Result};
use crate::models::{JobOverrides, PublishMode};

/// 配置文件路径的环境变量
pub const CONFIG_PATH_ENV: &str = "NOTE_PUBLISHER_CONFIG";
/// 默认配置文件
pub const DEFAULT_CONFIG_FILE: &str = "publisher.toml";

/// 程序配置
///
/// 来源优先级：环境变量 > TOML 配置文件 > 默认值
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    // --- 浏览器 ---
    /// 设置后连接该调试端口上的浏览器，否则启动新浏览器
    pub browser_debug_port: Option<u16>,
    pub headless: bool,
    pub chrome_executable: Option<String>,

    // --- 目标站点 ---
    pub editor_url: String,
    /// 用于检查登录状态的页面
    pub home_url: String,
    pub login_url_marker: String,
    /// 登录状态文件（`{"cookies": [...]}`）
    pub session_state_file: PathBuf,

    // --- 输入输出 ---
    pub documents_folder: PathBuf,
    pub progress_file: PathBuf,
    pub screenshot_dir: PathBuf,
    pub event_log_file: Option<PathBuf>,

    // --- 批次 ---
    pub publish_mode: PublishMode,
    pub default_price: Option<u32>,
    /// 起始序号（从1开始，包含）
    pub range_start: Option<usize>,
    /// 结束序号（包含）
    pub range_end: Option<usize>,
    pub limit: Option<usize>,
    pub resume: bool,
    pub dry_run: bool,
    pub pacing_secs: u64,
    pub failure_threshold: u32,

    // --- 等待与重试 ---
    pub step_timeout_ms: u64,
    pub navigation_timeout_ms: u64,
    pub confirm_timeout_ms: u64,
    pub step_retries: u32,
    pub poll_interval_ms: u64,

    /// 是否显示详细日志
    pub verbose_logging: bool,

    /// 对所有文章生效的覆盖设置
    pub overrides: JobOverrides,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            browser_debug_port: None,
            headless: false,
            chrome_executable: None,
            editor_url: "https://editor.note.com/new".to_string(),
            home_url: "https://note.com/".to_string(),
            login_url_marker: "/login".to_string(),
            session_state_file: PathBuf::from("auth_state.json"),
            documents_folder: PathBuf::from("articles"),
            progress_file: PathBuf::from("publish_progress.json"),
            screenshot_dir: PathBuf::from("screenshots"),
            event_log_file: Some(PathBuf::from("publish_events.jsonl")),
            publish_mode: PublishMode::Published,
            default_price: None,
            range_start: None,
            range_end: None,
            limit: None,
            resume: true,
            dry_run: false,
            pacing_secs: 10,
            failure_threshold: 5,
            step_timeout_ms: 15_000,
            navigation_timeout_ms: 30_000,
            confirm_timeout_ms: 20_000,
            step_retries: 2,
            poll_interval_ms: 250,
            verbose_logging: false,
            overrides: JobOverrides::default(),
        }
    }
}

impl Config {
    /// 加载配置：读取配置文件（如果存在），再应用环境变量
    pub fn load() -> Result<Self> {
        let explicit = std::env::var(CONFIG_PATH_ENV).ok().map(PathBuf::from);
        let mut config = match &explicit {
            Some(path) => Self::from_file(path)?,
            None if Path::new(DEFAULT_CONFIG_FILE).exists() => Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?,
            None => Self::default(),
        };
        config.apply_env();
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| PublishError::Config(format!("无法读取配置文件 {}: {}", path.display(), e)))?;
        Self::from_toml_str(&raw)
            .map_err(|e| PublishError::Config(format!("{} ({})", e, path.display())))
    }

    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| PublishError::Config(format!("配置文件格式错误: {}", e)))
    }

    /// 应用进程环境变量
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// 应用环境变量（`lookup` 用于注入变量来源）
    pub fn apply_env_from(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        let env = EnvReader { lookup: &lookup };

        env.optional("BROWSER_DEBUG_PORT", &mut self.browser_debug_port);
        env.value("HEADLESS", &mut self.headless);
        env.optional("CHROME_EXECUTABLE", &mut self.chrome_executable);
        env.value("EDITOR_URL", &mut self.editor_url);
        env.value("HOME_URL", &mut self.home_url);
        env.value("SESSION_STATE_FILE", &mut self.session_state_file);
        env.value("DOCUMENTS_FOLDER", &mut self.documents_folder);
        env.value("PROGRESS_FILE", &mut self.progress_file);
        env.value("SCREENSHOT_DIR", &mut self.screenshot_dir);
        env.optional("EVENT_LOG_FILE", &mut self.event_log_file);
        if let Some(raw) = (env.lookup)("PUBLISH_MODE") {
            match PublishMode::from_token(&raw) {
                Some(mode) => self.publish_mode = mode,
                None => warn!("环境变量 PUBLISH_MODE 的值无效: {}", raw),
            }
        }
        env.optional("DEFAULT_PRICE", &mut self.default_price);
        env.optional("RANGE_START", &mut self.range_start);
        env.optional("RANGE_END", &mut self.range_end);
        env.optional("LIMIT", &mut self.limit);
        env.value("RESUME", &mut self.resume);
        env.value("DRY_RUN", &mut self.dry_run);
        env.value("PACING_SECS", &mut self.pacing_secs);
        env.value("FAILURE_THRESHOLD", &mut self.failure_threshold);
        env.value("STEP_TIMEOUT_MS", &mut self.step_timeout_ms);
        env.value("NAVIGATION_TIMEOUT_MS", &mut self.navigation_timeout_ms);
        env.value("CONFIRM_TIMEOUT_MS", &mut self.confirm_timeout_ms);
        env.value("STEP_RETRIES", &mut self.step_retries);
        env.value("POLL_INTERVAL_MS", &mut self.poll_interval_ms);
        env.value("VERBOSE_LOGGING", &mut self.verbose_logging);
    }

    pub fn pacing(&self) -> Duration {
        Duration::from_secs(self.pacing_secs)
    }

    pub fn step_timeout(&self) -> Duration {
        Duration::from_millis(self.step_timeout_ms)
    }

    pub fn navigation_timeout(&self) -> Duration {
        Duration::from_millis(self.navigation_timeout_ms)
    }

    pub fn confirm_timeout(&self) -> Duration {
        Duration::from_millis(self.confirm_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

struct EnvReader<'a> {
    lookup: &'a dyn Fn(&str) -> Option<String>,
}

impl EnvReader<'_> {
    fn parse<T: FromStr>(&self, key: &str) -> Option<T> {
        let raw = (self.lookup)(key)?;
        match raw.trim().parse() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!("环境变量 {} 的值无效，已忽略: {}", key, raw);
                None
            }
        }
    }

    fn value<T: FromStr>(&self, key: &str, slot: &mut T) {
        if let Some(value) = self.parse(key) {
            *slot = value;
        }
    }

    fn optional<T: FromStr>(&self, key: &str, slot: &mut Option<T>) {
        if let Some(value) = self.parse(key) {
            *slot = Some(value);
        }
    }
}
