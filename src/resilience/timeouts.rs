//! Timeout enforcement.
//!
//! # Responsibilities
//! - Carry one wall-clock deadline through every sub-call of a fetch
//! - Clamp per-attempt timeouts to what is left of the caller's budget
//!
//! # Design Decisions
//! - Built on `tokio::time::Instant` so paused-clock tests observe it
//! - Timeout errors are distinct from other errors

use std::time::Duration;
use tokio::time::Instant;

/// Absolute point in time by which a fetch must be finished.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Deadline {
    at: Instant,
}

impl Deadline {
    /// A deadline `budget` from now.
    pub fn after(budget: Duration) -> Self {
        Self {
            at: Instant::now() + budget,
        }
    }

    pub fn instant(&self) -> Instant {
        self.at
    }

    /// Time left before the deadline, zero once it has passed.
    pub fn remaining(&self) -> Duration {
        self.at.saturating_duration_since(Instant::now())
    }

    pub fn is_expired(&self) -> bool {
        self.remaining().is_zero()
    }

    /// The smaller of `limit` and the remaining budget.
    pub fn clamp(&self, limit: Duration) -> Duration {
        limit.min(self.remaining())
    }
}
