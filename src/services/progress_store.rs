//! 进度记录服务 - 业务能力层
//!
//! 记录已完成 / 失败的任务标识。每次更新都会立即落盘（先写临时文件再重命名），
//! 进程崩溃时最多丢失正在执行的那一篇。

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

use crate::error::{PublishError, Result};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
struct ProgressFile {
    #[serde(default)]
    completed: BTreeSet<String>,
    #[serde(default)]
    failed: BTreeSet<String>,
}

/// 进度记录
///
/// 同一个进度文件不允许被多个批次同时写入。
#[derive(Debug)]
pub struct ProgressStore {
    path: Option<PathBuf>,
    state: ProgressFile,
}

impl ProgressStore {
    /// 创建空记录，写入到指定文件
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            state: ProgressFile::default(),
        }
    }

    /// 只在内存中记录（不落盘）
    pub fn in_memory() -> Self {
        Self {
            path: None,
            state: ProgressFile::default(),
        }
    }

    /// 从文件加载；文件不存在时返回空记录，文件损坏时报错
    pub fn load(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let state = match fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content)
                .map_err(|e| PublishError::progress(path.display().to_string(), e))?,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {
                debug!("进度文件不存在，从头开始: {}", path.display());
                ProgressFile::default()
            }
            Err(err) => return Err(PublishError::progress(path.display().to_string(), err)),
        };

        info!(
            "📂 已加载进度: 完成 {} 篇, 失败 {} 篇",
            state.completed.len(),
            state.failed.len()
        );
        Ok(Self {
            path: Some(path),
            state,
        })
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    pub fn is_completed(&self, job_id: &str) -> bool {
        self.state.completed.contains(job_id)
    }

    pub fn is_failed(&self, job_id: &str) -> bool {
        self.state.failed.contains(job_id)
    }

    pub fn completed(&self) -> &BTreeSet<String> {
        &self.state.completed
    }

    pub fn failed(&self) -> &BTreeSet<String> {
        &self.state.failed
    }

    /// 记录成功并落盘
    pub fn mark_completed(&mut self, job_id: &str) -> Result<()> {
        self.state.failed.remove(job_id);
        self.state.completed.insert(job_id.to_string());
        self.persist()
    }

    /// 记录失败并落盘
    pub fn mark_failed(&mut self, job_id: &str) -> Result<()> {
        self.state.failed.insert(job_id.to_string());
        self.persist()
    }

    fn persist(&self) -> Result<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        write_json_atomic(path, &self.state)
            .map_err(|e| PublishError::progress(path.display().to_string(), e))
    }
}

fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    let data = serde_json::to_vec_pretty(value)?;
    fs::write(&tmp_path, &data)?;
    fs::rename(&tmp_path, path)
}
