//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (timeouts > 0, limits > 0)
//! - Check that the rendering endpoint is a usable URL when the tier is enabled
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: GatewayConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;
use thiserror::Error;
use url::Url;

use crate::config::schema::GatewayConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::new(
            "listener.bind_address",
            format!("'{}' is not a socket address", config.listener.bind_address),
        ));
    }

    if config.fetch.connect_timeout_secs == 0 {
        errors.push(ValidationError::new("fetch.connect_timeout_secs", "must be > 0"));
    }
    if config.fetch.total_timeout_secs == 0 {
        errors.push(ValidationError::new("fetch.total_timeout_secs", "must be > 0"));
    }
    if config.fetch.connect_timeout_secs > config.fetch.total_timeout_secs {
        errors.push(ValidationError::new(
            "fetch.connect_timeout_secs",
            "must not exceed fetch.total_timeout_secs",
        ));
    }
    if config.fetch.request_timeout_secs == 0 {
        errors.push(ValidationError::new("fetch.request_timeout_secs", "must be > 0"));
    }

    if config.render.enabled {
        if config.render.timeout_secs == 0 {
            errors.push(ValidationError::new("render.timeout_secs", "must be > 0"));
        }
        if Url::parse(&config.render.endpoint).is_err() {
            errors.push(ValidationError::new(
                "render.endpoint",
                format!("'{}' is not a valid URL", config.render.endpoint),
            ));
        }
        if config.render.max_attempts == Some(0) {
            errors.push(ValidationError::new("render.max_attempts", "must be >= 1"));
        }
    }

    if config.retries.max_attempts == 0 {
        errors.push(ValidationError::new("retries.max_attempts", "must be >= 1"));
    }
    if config.retries.base_delay_ms > config.retries.max_delay_ms {
        errors.push(ValidationError::new(
            "retries.base_delay_ms",
            "must not exceed retries.max_delay_ms",
        ));
    }

    if config.circuit_breaker.failure_threshold == 0 {
        errors.push(ValidationError::new(
            "circuit_breaker.failure_threshold",
            "must be >= 1",
        ));
    }

    if config.concurrency.limit == 0 {
        errors.push(ValidationError::new("concurrency.limit", "must be >= 1"));
    }

    match config.observability.log_format.as_str() {
        "pretty" | "compact" => {}
        other => errors.push(ValidationError::new(
            "observability.log_format",
            format!("unknown format '{other}'"),
        )),
    }

    if config.admin.enabled && config.admin.api_key.trim().is_empty() {
        errors.push(ValidationError::new("admin.api_key", "must not be empty"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
