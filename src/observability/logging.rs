//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the tracing subscriber once per process
//! - Pick the log level (RUST_LOG first, then config)
//! - Pick the output format (pretty for development, compact otherwise)
//!
//! # Design Decisions
//! - Uses tracing crate for structured logging
//! - Fields over interpolation: `correlation_id`, `url`, `strategy`, `attempt`

use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::ObservabilityConfig;

/// Build the filter: `RUST_LOG` when set and valid, otherwise the configured level.
pub fn env_filter(config: &ObservabilityConfig) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "fetch_gateway={level},tower_http={level}",
            level = config.log_level
        ))
    })
}

/// Install the global subscriber. Fails if one is already installed.
pub fn init_logging(
    config: &ObservabilityConfig,
) -> Result<(), tracing_subscriber::util::TryInitError> {
    let registry = tracing_subscriber::registry().with(env_filter(config));

    match config.log_format.as_str() {
        "pretty" => registry
            .with(tracing_subscriber::fmt::layer().pretty())
            .try_init(),
        _ => registry
            .with(tracing_subscriber::fmt::layer().compact())
            .try_init(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_level_used_without_env() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let config = ObservabilityConfig {
            log_level: "warn".into(),
            ..ObservabilityConfig::default()
        };
        let filter = env_filter(&config).to_string();
        assert!(filter.contains("fetch_gateway=warn"));
        assert!(filter.contains("tower_http=warn"));
    }
}
