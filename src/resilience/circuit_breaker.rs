//! Circuit breaker guarding the fetch path.
//!
//! # States
//! - Closed: normal operation, fetches pass through
//! - Open: origins assumed down, fetches fail fast
//!
//! # State Transitions
//! ```text
//! Closed → Open: consecutive_failures reaches threshold
//! Open → Closed: explicit reset only
//! Closed → Closed: any success zeroes consecutive_failures
//! ```
//!
//! # Design Decisions
//! - One breaker per gateway, injected rather than global
//! - Counts request-level outcomes, never individual retry attempts
//! - No half-open probing; recovery is an operator decision

use serde::Serialize;
use std::sync::{Mutex, MutexGuard};

use crate::fetch::FetchError;
use crate::observability::metrics;

/// Breaker status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum CircuitStatus {
    Closed,
    Open,
}

impl CircuitStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitStatus::Closed => "closed",
            CircuitStatus::Open => "open",
        }
    }
}

impl std::fmt::Display for CircuitStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Point-in-time view of the breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CircuitSnapshot {
    pub status: CircuitStatus,
    pub consecutive_failures: u32,
    pub threshold: u32,
}

#[derive(Debug)]
struct CircuitInner {
    status: CircuitStatus,
    consecutive_failures: u32,
}

/// Thread-safe failure-count circuit breaker.
#[derive(Debug)]
pub struct CircuitBreaker {
    threshold: u32,
    inner: Mutex<CircuitInner>,
}

impl CircuitBreaker {
    /// Create a closed breaker that opens after `threshold` consecutive failures.
    pub fn new(threshold: u32) -> Self {
        metrics::record_circuit_status(CircuitStatus::Closed);
        Self {
            threshold: threshold.max(1),
            inner: Mutex::new(CircuitInner {
                status: CircuitStatus::Closed,
                consecutive_failures: 0,
            }),
        }
    }

    // Every critical section leaves the state consistent, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, CircuitInner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn threshold(&self) -> u32 {
        self.threshold
    }

    pub fn status(&self) -> CircuitStatus {
        self.lock().status
    }

    pub fn is_open(&self) -> bool {
        self.status() == CircuitStatus::Open
    }

    pub fn consecutive_failures(&self) -> u32 {
        self.lock().consecutive_failures
    }

    /// Fail fast with `CircuitOpen` while the breaker is open.
    pub fn check(&self) -> Result<(), FetchError> {
        let inner = self.lock();
        match inner.status {
            CircuitStatus::Closed => Ok(()),
            CircuitStatus::Open => Err(FetchError::CircuitOpen {
                consecutive_failures: inner.consecutive_failures,
            }),
        }
    }

    pub fn snapshot(&self) -> CircuitSnapshot {
        let inner = self.lock();
        CircuitSnapshot {
            status: inner.status,
            consecutive_failures: inner.consecutive_failures,
            threshold: self.threshold,
        }
    }

    /// Record a request-level success.
    ///
    /// Leaves an open breaker open: a request admitted before the trip cannot close it.
    pub fn record_success(&self) {
        let mut inner = self.lock();
        if inner.status == CircuitStatus::Open {
            tracing::debug!("Success recorded while circuit open, ignoring");
            return;
        }
        if inner.consecutive_failures > 0 {
            tracing::debug!(
                previous_failures = inner.consecutive_failures,
                "Circuit failure count reset"
            );
        }
        inner.consecutive_failures = 0;
    }

    /// Record a request-level failure. Returns the status after the update.
    pub fn record_failure(&self) -> CircuitStatus {
        let mut inner = self.lock();
        if inner.status == CircuitStatus::Open {
            return CircuitStatus::Open;
        }

        inner.consecutive_failures = inner.consecutive_failures.saturating_add(1);
        if inner.consecutive_failures >= self.threshold {
            inner.status = CircuitStatus::Open;
            drop(inner);

            tracing::error!(
                threshold = self.threshold,
                "Circuit breaker opened due to repeated failures"
            );
            metrics::record_circuit_status(CircuitStatus::Open);
            return CircuitStatus::Open;
        }

        tracing::warn!(
            consecutive_failures = inner.consecutive_failures,
            threshold = self.threshold,
            "Fetch failure recorded"
        );
        CircuitStatus::Closed
    }

    /// Close the breaker and clear the failure count, unconditionally.
    pub fn reset(&self) {
        let mut inner = self.lock();
        let was = inner.status;
        inner.status = CircuitStatus::Closed;
        inner.consecutive_failures = 0;
        drop(inner);

        tracing::info!(previous = %was, "Circuit breaker reset");
        metrics::record_circuit_status(CircuitStatus::Closed);
    }
}
