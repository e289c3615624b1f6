use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::{info, warn};

use crate::error::{PublishError, Result};
use crate::models::{JobOverrides, PublishJob, PublishMode};
use crate::services::{DocumentParser, ImageResolver};

/// 批量加载选项
#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    pub mode: PublishMode,
    pub overrides: JobOverrides,
    pub default_price: Option<u32>,
    /// 起始序号（从 1 开始，含）
    pub start: Option<usize>,
    /// 结束序号（含）
    pub end: Option<usize>,
}

/// 从 Markdown 文件加载并构建发布任务
pub async fn load_job(path: &Path, options: &LoadOptions) -> Result<PublishJob> {
    let content = fs::read_to_string(path)
        .await
        .map_err(|e| PublishError::MalformedInput {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

    let document = DocumentParser::new().parse(&content);
    let images = ImageResolver::new().resolve(&document.body, path);

    Ok(PublishJob::new(path.display().to_string(), document, images, options.mode)
        .with_source_path(path)
        .with_overrides(options.overrides.clone())
        .with_default_price(options.default_price))
}

/// 列出文件夹中的所有 Markdown 文件，按文件名中的数字和字典序排序
pub async fn list_documents(folder: &Path) -> Result<Vec<PathBuf>> {
    if !folder.is_dir() {
        return Err(PublishError::MalformedInput {
            path: folder.display().to_string(),
            reason: "文件夹不存在".to_string(),
        });
    }

    let mut documents = Vec::new();
    let mut entries = fs::read_dir(folder).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let is_markdown = path
            .extension()
            .and_then(|s| s.to_str())
            .map_or(false, |ext| ext.eq_ignore_ascii_case("md"));
        if is_markdown && path.is_file() {
            documents.push(path);
        }
    }

    documents.sort_by_cached_key(|path| document_sort_key(path));
    Ok(documents)
}

/// 按序号范围（从 1 开始，含两端）选择文档
pub fn select_range(paths: Vec<PathBuf>, start: Option<usize>, end: Option<usize>) -> Vec<PathBuf> {
    let start = start.unwrap_or(1).max(1);
    let end = end.unwrap_or(usize::MAX);
    paths
        .into_iter()
        .enumerate()
        .filter(|(idx, _)| (start..=end).contains(&(idx + 1)))
        .map(|(_, path)| path)
        .collect()
}

/// 加载文件夹中选定范围内的所有任务
///
/// 单个文件读取失败时记录警告并跳过。
pub async fn load_jobs(folder: &Path, options: &LoadOptions) -> Result<Vec<PublishJob>> {
    let all = list_documents(folder).await?;
    let total = all.len();
    let selected = select_range(all, options.start, options.end);
    info!("共 {} 篇文档，本次选择 {} 篇", total, selected.len());

    let mut jobs = Vec::with_capacity(selected.len());
    for path in selected {
        match load_job(&path, options).await {
            Ok(job) => {
                info!(
                    "正在加载: {} (标题: {}, 图片 {} 张)",
                    path.file_name().unwrap_or_default().to_string_lossy(),
                    job.document.title,
                    job.images.len()
                );
                jobs.push(job);
            }
            Err(e) => warn!("加载文件失败 {}: {}", path.display(), e),
        }
    }

    Ok(jobs)
}

fn document_sort_key(path: &Path) -> (u64, String) {
    let name = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string();
    let number = name
        .chars()
        .skip_while(|c| !c.is_ascii_digit())
        .take_while(|c| c.is_ascii_digit())
        .collect::<String>()
        .parse()
        .unwrap_or(u64::MAX);
    (number, name)
}
