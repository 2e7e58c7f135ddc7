//! tracing 订阅者初始化

use tracing_subscriber::EnvFilter;

use crate::config::LoggingConfig;

/// 安装全局 fmt 订阅者。`RUST_LOG` 优先于配置中的级别；重复调用是无害的。
pub fn init_tracing(config: &LoggingConfig) -> bool {
    if !config.log_to_console {
        return false;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.level.as_filter()));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .try_init()
        .is_ok()
}
