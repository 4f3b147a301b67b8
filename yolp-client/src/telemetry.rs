//! Tracing subscriber initialization.

use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LogConfig;
use crate::error::{AppError, AppResult};

const DEFAULT_FILTER: &str = "yolp=info";

/// Pick the filter directives: `YOLP_LOG`, then `RUST_LOG`, then the config
/// file, then the default.
pub fn filter_directives(config: &LogConfig) -> String {
    ["YOLP_LOG", "RUST_LOG"]
        .iter()
        .find_map(|var| std::env::var(var).ok().filter(|v| !v.trim().is_empty()))
        .or_else(|| config.filter.clone())
        .unwrap_or_else(|| DEFAULT_FILTER.to_string())
}

/// Install the global subscriber. Logs go to stderr so command output on
/// stdout stays clean.
pub fn init_tracing(config: &LogConfig) -> AppResult<()> {
    let directives = filter_directives(config);
    let env_filter = EnvFilter::try_new(&directives)
        .map_err(|e| AppError::Telemetry(format!("invalid filter '{directives}': {e}")))?;

    let json_layer = config
        .json
        .then(|| fmt::layer().json().with_writer(std::io::stderr));
    let text_layer = (!config.json).then(|| fmt::layer().with_writer(std::io::stderr));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .try_init()
        .map_err(|e| AppError::Telemetry(e.to_string()))?;

    tracing::debug!(filter = %directives, json = config.json, "Tracing initialized");
    Ok(())
}
