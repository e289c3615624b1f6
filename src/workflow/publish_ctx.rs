//! 发布上下文
//!
//! 封装"我正在处理第几篇文章、在第几代会话上"这一信息

use std::fmt::Display;
use std::path::Path;

/// 单篇文章的处理上下文
#[derive(Debug, Clone)]
pub struct JobCtx {
    /// 任务标识
    pub job_id: String,

    /// 在本批次中的序号（从1开始，仅用于日志显示）
    pub job_index: usize,

    /// 本批次任务总数
    pub total: usize,

    /// 当前浏览器会话的代数（每次重启加一）
    pub session_generation: u64,
}

impl JobCtx {
    /// 创建新的上下文
    pub fn new(job_id: impl Into<String>, job_index: usize, total: usize, session_generation: u64) -> Self {
        Self {
            job_id: job_id.into(),
            job_index,
            total,
            session_generation,
        }
    }

    /// 用于文件名的简短标识
    pub fn file_stem(&self) -> String {
        let stem = Path::new(&self.job_id)
            .file_stem()
            .map(|s| s.to_string_lossy().to_string())
            .unwrap_or_default();
        let cleaned: String = stem
            .chars()
            .map(|c| if c.is_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        if cleaned.is_empty() {
            format!("job{}", self.job_index)
        } else {
            cleaned
        }
    }
}

impl Display for JobCtx {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[文章 {}/{}]", self.job_index, self.total)
    }
}
