//! 日志工具模块
//!
//! 提供日志初始化和批次横幅输出的辅助函数

use anyhow::{Context as _, Result};
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;

/// 初始化 tracing 日志
///
/// `RUST_LOG` 优先；未设置时按 `verbose` 选择 `debug` 或 `info`。
pub fn init(verbose: bool) -> Result<()> {
    let fallback = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(fallback))
        .context("构建日志过滤器失败")?;

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init()
        .map_err(|err| anyhow::anyhow!("初始化日志失败: {err}"))?;

    Ok(())
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!("🚀 程序启动 - note 文章批量发布");
    info!("📁 文档目录: {}", config.documents_folder.display());
    info!(
        "📝 模式: {:?}{}",
        config.publish_mode,
        if config.dry_run { " (试运行)" } else { "" }
    );
    info!(
        "⏱️ 间隔: {}s, 熔断阈值: {}",
        config.pacing_secs, config.failure_threshold
    );
    info!("{}", "=".repeat(60));
}

/// 记录文章加载信息
pub fn log_documents_loaded(total: usize, resume: bool, progress_file: &Path) {
    info!("✓ 找到 {} 篇待处理的文章", total);
    if resume {
        info!("💡 断点续传已开启，进度文件: {}", progress_file.display());
    }
}

/// 打印最终统计信息
pub fn print_final_stats(
    total: usize,
    succeeded: usize,
    failed: usize,
    skipped: usize,
    restarts: usize,
    progress_file: &Path,
) {
    info!("\n{}", "=".repeat(60));
    info!("📊 全部处理完成统计");
    info!(
        "完成时间: {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("{}", "=".repeat(60));
    info!("✅ 成功: {}/{}", succeeded, total);
    info!("❌ 失败: {}", failed);
    info!("⏭️ 跳过: {}", skipped);
    info!("🔄 会话重启: {}", restarts);
    info!("{}", "=".repeat(60));
    info!("\n进度已保存至: {}", progress_file.display());
}

/// 截断长文本用于日志显示
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
