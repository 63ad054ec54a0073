//! 日志初始化

use tracing_subscriber::EnvFilter;

/// 默认只显示本 crate 的 info 级别日志，可通过 `RUST_LOG` 覆盖
const DEFAULT_FILTER: &str = "question_tree_engine=info";

/// 安装全局日志订阅器
///
/// 重复调用是安全的（测试中多次调用只有第一次生效）。
pub fn init() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}
