//! Fetch data model: requests, results, and the error taxonomy.

use serde::Serialize;
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;
use uuid::Uuid;

use crate::resilience::Deadline;

/// Which acquisition strategy produced (or failed to produce) content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum StrategyKind {
    /// Direct HTTP request.
    Fast,
    /// Browser rendering.
    Rendered,
}

impl StrategyKind {
    pub const ALL: [StrategyKind; 2] = [StrategyKind::Fast, StrategyKind::Rendered];

    pub fn as_str(&self) -> &'static str {
        match self {
            StrategyKind::Fast => "fast",
            StrategyKind::Rendered => "rendered",
        }
    }
}

impl fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One tier's contribution to an aggregate failure.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("{strategy} failed after {attempts} attempt(s): {error}")]
pub struct TierFailure {
    pub strategy: StrategyKind,
    pub attempts: u32,
    pub error: Box<FetchError>,
}

/// Errors surfaced by the gateway.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FetchError {
    /// Connection failure, DNS failure, or a non-2xx origin response.
    #[error("network error: {0}")]
    Network(String),

    /// An attempt or the whole request ran out of time.
    #[error("timed out after {0:?}")]
    Timeout(Duration),

    /// Content arrived but is not usable.
    #[error("unusable content: {0}")]
    Extraction(String),

    /// The breaker is open; no strategy was attempted.
    #[error("circuit open after {consecutive_failures} consecutive failures")]
    CircuitOpen { consecutive_failures: u32 },

    /// The gateway is shutting down.
    #[error("gateway is shutting down")]
    Shutdown,

    /// The request was rejected before any work was done.
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// Every tier failed.
    #[error("all strategies failed: {}", join_failures(.0))]
    Exhausted(Vec<TierFailure>),
}

fn join_failures(failures: &[TierFailure]) -> String {
    if failures.is_empty() {
        return "no strategy attempted".to_string();
    }
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl FetchError {
    /// Transient errors worth another attempt on the same tier.
    pub fn is_retryable(&self) -> bool {
        matches!(self, FetchError::Network(_) | FetchError::Timeout(_))
    }

    /// Whether this failure says something about origin availability.
    ///
    /// An aggregate counts only when every tier failed on the network; an
    /// origin that answered with unusable content is not "down".
    pub fn counts_against_breaker(&self) -> bool {
        match self {
            FetchError::Network(_) | FetchError::Timeout(_) => true,
            FetchError::Exhausted(failures) => {
                !failures.is_empty() && failures.iter().all(|f| f.error.counts_against_breaker())
            }
            _ => false,
        }
    }

    /// Stable machine-readable tag.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::Network(_) => "network",
            FetchError::Timeout(_) => "timeout",
            FetchError::Extraction(_) => "extraction",
            FetchError::CircuitOpen { .. } => "circuit_open",
            FetchError::Shutdown => "shutdown",
            FetchError::InvalidRequest(_) => "invalid_request",
            FetchError::Exhausted(_) => "exhausted",
        }
    }
}

/// One gateway call. Immutable once built.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    url: Url,
    timeout: Duration,
    deadline: Deadline,
    correlation_id: Uuid,
}

impl FetchRequest {
    /// Parse `url` and start the request clock.
    pub fn new(url: &str, timeout: Duration) -> Result<Self, FetchError> {
        let url = parse_target(url)?;
        if timeout.is_zero() {
            return Err(FetchError::InvalidRequest("timeout must be > 0".into()));
        }
        Ok(Self {
            url,
            timeout,
            deadline: Deadline::after(timeout),
            correlation_id: Uuid::new_v4(),
        })
    }

    pub fn with_correlation_id(mut self, correlation_id: Uuid) -> Self {
        self.correlation_id = correlation_id;
        self
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn deadline(&self) -> Deadline {
        self.deadline
    }

    pub fn correlation_id(&self) -> Uuid {
        self.correlation_id
    }
}

fn parse_target(raw: &str) -> Result<Url, FetchError> {
    let url = Url::parse(raw.trim())
        .map_err(|e| FetchError::InvalidRequest(format!("'{raw}' is not a valid URL: {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(FetchError::InvalidRequest(format!(
            "unsupported scheme '{}'",
            url.scheme()
        )));
    }
    if url.host().is_none() {
        return Err(FetchError::InvalidRequest(format!("'{raw}' has no host")));
    }
    Ok(url)
}

/// Content returned by a successful fetch.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub url: Url,
    pub correlation_id: Uuid,
    pub content: String,
    pub strategy: StrategyKind,
    /// Attempts spent on the winning tier.
    pub attempts: u32,
    pub elapsed: Duration,
}
