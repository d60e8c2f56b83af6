//! 日志工具模块
//!
//! 提供日志初始化和输出的辅助函数

use crate::config::Config;
use crate::workflow::ProgressState;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// 初始化日志
///
/// `RUST_LOG` 优先；否则默认 info，详细模式下为 debug。重复调用无副作用
pub fn init(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt().with_env_filter(filter).try_init();
}

/// 记录程序启动信息
pub fn log_startup(config: &Config) {
    info!("{}", "=".repeat(60));
    info!(
        "🚀 论文标注启动 - {}",
        chrono::Local::now().format("%Y-%m-%d %H:%M:%S")
    );
    info!("👤 标注者: {}", config.user);
    info!("📋 问题定义: {}", config.schema_file.display());
    info!("📚 论文列表: {}", config.papers_csv.display());
    info!("💾 导出文件: {}", config.export_file.display());
    info!("{}", "=".repeat(60));
}

/// 记录恢复位置
///
/// # 参数
/// - `state`: 恢复后的进度状态
/// - `total`: 分配给当前标注者的论文总数
pub fn log_resume(state: ProgressState, total: usize) {
    match state.index() {
        Some(index) => info!("▶️ 从第 {}/{} 篇继续", index + 1, total),
        None => info!("🎉 全部 {} 篇论文均已处理", total),
    }
}

/// 打印进度统计
///
/// # 参数
/// - `processed`: 已处理数量（有回答或已排除）
/// - `incomplete`: 已处理但校验未通过的数量
/// - `total`: 论文总数
pub fn log_progress_summary(processed: usize, incomplete: usize, total: usize) {
    info!("\n{}", "=".repeat(60));
    info!("📊 标注进度统计");
    info!("{}", "=".repeat(60));
    info!("✅ 已处理: {}/{}", processed, total);
    info!("⚠️ 未通过校验: {}", incomplete);
    info!("⏳ 待处理: {}", total.saturating_sub(processed));
    info!("{}", "=".repeat(60));
}

/// 截断长文本用于日志显示
///
/// # 参数
/// - `text`: 原始文本
/// - `max_len`: 最大字符数
///
/// # 返回
/// 返回截断后的文本
pub fn truncate_text(text: &str, max_len: usize) -> String {
    if text.chars().count() > max_len {
        text.chars().take(max_len).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
