//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::resilience::retries::RetryPolicy;

/// Root configuration for the fetch gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Fast path (direct HTTP) settings.
    pub fetch: FetchConfig,

    /// Rendered path (browser engine) settings.
    pub render: RenderConfig,

    /// Retry configuration shared by every tier.
    pub retries: RetryConfig,

    /// Circuit breaker settings.
    pub circuit_breaker: CircuitBreakerConfig,

    /// Admission control.
    pub concurrency: ConcurrencyConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    #[serde(default)]
    pub admin: AdminConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Fast path configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Connection establishment timeout in seconds.
    pub connect_timeout_secs: u64,

    /// Total time for one request/response exchange in seconds.
    pub total_timeout_secs: u64,

    /// Overall budget for one gateway call (retries and fallback included), in seconds.
    pub request_timeout_secs: u64,

    /// User agent sent to origins.
    pub user_agent: String,

    /// Maximum idle pooled connections per host.
    pub pool_limit: usize,

    /// Content must contain at least one of these markers to be usable.
    /// Empty means any non-blank body is accepted.
    pub required_markers: Vec<String>,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout_secs: 2,
            total_timeout_secs: 10,
            request_timeout_secs: 60,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
                         (KHTML, like Gecko) Chrome/125.0.0.0 Safari/537.36"
                .to_string(),
            pool_limit: 100,
            required_markers: Vec::new(),
        }
    }
}

impl FetchConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn total_timeout(&self) -> Duration {
        Duration::from_secs(self.total_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

/// Rendered path configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Enable the browser-rendering fallback tier.
    pub enabled: bool,

    /// Rendering service endpoint that accepts `{url, timeout_ms}` and returns HTML.
    pub endpoint: String,

    /// Time budget for one render in seconds.
    pub timeout_secs: u64,

    /// Attempts for the rendered tier. Falls back to `retries.max_attempts` when unset.
    pub max_attempts: Option<u32>,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            endpoint: "http://127.0.0.1:3000/content".to_string(),
            timeout_secs: 15,
            max_attempts: None,
        }
    }
}

impl RenderConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts per tier (the first try included).
    pub max_attempts: u32,

    /// Base delay for exponential backoff in milliseconds.
    pub base_delay_ms: u64,

    /// Maximum delay for exponential backoff in milliseconds.
    pub max_delay_ms: u64,

    /// Add up to 10% random jitter to each delay.
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
            jitter: true,
        }
    }
}

impl RetryConfig {
    /// Build the retry policy for a tier, optionally overriding the attempt count.
    pub fn policy(&self, max_attempts: Option<u32>) -> RetryPolicy {
        RetryPolicy::new(
            max_attempts.unwrap_or(self.max_attempts),
            Duration::from_millis(self.base_delay_ms),
        )
        .with_max_delay(Duration::from_millis(self.max_delay_ms))
        .with_jitter(self.jitter)
    }
}

/// Circuit breaker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive request-level failures that open the circuit.
    pub failure_threshold: u32,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
        }
    }
}

/// Admission control configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ConcurrencyConfig {
    /// Maximum fetches in flight at once.
    pub limit: usize,
}

impl Default for ConcurrencyConfig {
    fn default() -> Self {
        Self { limit: 20 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Log output format ("pretty" or "compact").
    pub log_format: String,

    /// Install the Prometheus recorder and serve `/metrics`.
    pub metrics_enabled: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: "compact".to_string(),
            metrics_enabled: true,
        }
    }
}

/// Admin API configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    /// Enable admin routes.
    pub enabled: bool,

    /// API key for authentication (Bearer token).
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            // WARNING: This is a placeholder! Change this in production.
            api_key: "CHANGE_ME_IN_PRODUCTION".to_string(),
        }
    }
}
