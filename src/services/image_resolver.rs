//! 图片解析服务 - 业务能力层
//!
//! 找出正文中的本地图片引用以及同目录 `images/` 文件夹中的图片，
//! 区分封面图和正文图片。找不到的文件只记录警告，不会让任务失败。

use regex::Regex;
use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{debug, warn};

use crate::models::{ImageReference, ImageRole, ResolvedImages};

const IMAGES_DIR: &str = "images";
const COVER_STEM: &str = "thumbnail";
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "gif", "webp"];

static IMAGE_REF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"!\[([^\]]*)\]\(\s*<?([^)\s>]+)>?(?:\s+"[^"]*")?\s*\)"#)
        .expect("image reference pattern is valid")
});

static TRAILING_NUMBER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(\d+)$").expect("trailing number pattern is valid"));

/// 图片解析服务
#[derive(Debug, Default, Clone, Copy)]
pub struct ImageResolver;

impl ImageResolver {
    pub fn new() -> Self {
        Self
    }

    /// 解析正文和 `images/` 文件夹中的图片
    ///
    /// # 参数
    /// - `body`: 已解析的正文
    /// - `document_path`: 文档路径，相对路径以其所在目录为基准
    pub fn resolve(&self, body: &str, document_path: &Path) -> ResolvedImages {
        let base_dir = document_path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut seen = HashSet::new();
        let mut resolved = ResolvedImages::default();

        for caps in IMAGE_REF.captures_iter(body) {
            let alt_text = caps.get(1).map_or("", |m| m.as_str()).trim();
            let source = caps.get(2).map_or("", |m| m.as_str());
            if is_remote(source) {
                debug!("跳过远程图片: {}", source);
                continue;
            }

            let candidate = base_dir.join(source);
            let Some(path) = existing_file(&candidate) else {
                warn!("⚠️ 图片不存在，已跳过: {}", candidate.display());
                continue;
            };
            if seen.insert(path.clone()) {
                place(&mut resolved, image_reference(alt_text, source, path));
            }
        }

        for (source, path) in folder_images(&base_dir.join(IMAGES_DIR)) {
            if seen.insert(path.clone()) {
                let alt_text = file_stem(&path);
                place(&mut resolved, image_reference(&alt_text, &source, path));
            }
        }

        resolved
            .inline
            .sort_by_key(|image| image.ordinal.unwrap_or(u32::MAX));
        resolved
    }

    /// 移除正文中的本地图片引用（本地图片通过上传添加）
    pub fn strip_local_images(&self, body: &str) -> String {
        let stripped = IMAGE_REF.replace_all(body, |caps: &regex::Captures| {
            let source = caps.get(2).map_or("", |m| m.as_str());
            if is_remote(source) {
                caps[0].to_string()
            } else {
                String::new()
            }
        });

        let mut out: Vec<&str> = Vec::new();
        for line in stripped.lines() {
            let blank = line.trim().is_empty();
            let prev_blank = out.last().map_or(true, |prev| prev.trim().is_empty());
            if blank && prev_blank {
                continue;
            }
            out.push(line);
        }
        out.join("\n").trim_end().to_string()
    }
}

fn is_remote(source: &str) -> bool {
    let lower = source.to_lowercase();
    ["http://", "https://", "//", "data:"]
        .iter()
        .any(|prefix| lower.starts_with(prefix))
}

fn existing_file(path: &Path) -> Option<PathBuf> {
    if !path.is_file() {
        return None;
    }
    fs::canonicalize(path).ok()
}

fn file_stem(path: &Path) -> String {
    path.file_stem()
        .unwrap_or_default()
        .to_string_lossy()
        .to_string()
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| {
            IMAGE_EXTENSIONS
                .iter()
                .any(|known| ext.eq_ignore_ascii_case(known))
        })
}

/// 扫描 `images/` 文件夹，按文件名排序返回 (原始路径, 绝对路径)
fn folder_images(dir: &Path) -> Vec<(String, PathBuf)> {
    let Ok(entries) = fs::read_dir(dir) else {
        return Vec::new();
    };

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && is_image(path))
        .collect();
    files.sort();

    files
        .into_iter()
        .filter_map(|path| {
            let name = path.file_name()?.to_string_lossy().to_string();
            let absolute = existing_file(&path)?;
            Some((format!("{}/{}", IMAGES_DIR, name), absolute))
        })
        .collect()
}

fn image_reference(alt_text: &str, source: &str, resolved_path: PathBuf) -> ImageReference {
    let stem = file_stem(&resolved_path);
    let role = if stem.eq_ignore_ascii_case(COVER_STEM) {
        ImageRole::Cover
    } else {
        ImageRole::Inline
    };
    let ordinal = TRAILING_NUMBER
        .captures(&stem)
        .and_then(|caps| caps[1].parse().ok());

    ImageReference {
        alt_text: alt_text.to_string(),
        source_path: source.to_string(),
        resolved_path,
        role,
        ordinal,
    }
}

fn place(resolved: &mut ResolvedImages, image: ImageReference) {
    match image.role {
        ImageRole::Cover if resolved.cover.is_none() => resolved.cover = Some(image),
        ImageRole::Cover => debug!("已有封面图，忽略: {}", image.resolved_path.display()),
        ImageRole::Inline => resolved.inline.push(image),
    }
}
