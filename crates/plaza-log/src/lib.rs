//! Structured logging for the Plaza server.
//!
//! Console output via the `tracing` ecosystem: uptime timestamps, module
//! paths, severity levels, and environment-based filtering (respects
//! `RUST_LOG`). The config system's `log_level` provides the default
//! filter when the environment sets none.

use plaza_config::Config;
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize the tracing subscriber.
///
/// Filter precedence: `RUST_LOG` when set, otherwise the config's
/// `debug.log_level`, otherwise `info`. Call once at startup.
pub fn init_logging(config: Option<&Config>) {
    let filter_str = config
        .map(|c| c.debug.log_level.as_str())
        .filter(|level| !level.is_empty())
        .unwrap_or("info")
        .to_string();

    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&filter_str));

    let console_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(false)
        .with_thread_names(true)
        .with_level(true)
        .with_timer(fmt::time::uptime());

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .init();

    tracing::info!(default_filter = %filter_str, "logging initialized");
}

/// Create an `EnvFilter` with the default filter string.
pub fn default_env_filter() -> EnvFilter {
    EnvFilter::new("info")
}
