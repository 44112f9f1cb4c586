//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Fetch through one tier:
//!     → timeouts.rs (deadline threaded through every attempt and sleep)
//!     → On failure: retries.rs (check if retryable, retry with backoff.rs delays)
//!     → After every tier: circuit_breaker.rs (one success/failure per request)
//! ```
//!
//! # Design Decisions
//! - Timeouts are non-negotiable; every external call has a deadline
//! - Only network and timeout failures are retried
//! - Circuit breaker prevents cascading failures
//! - Retry is a combinator, independent of what it wraps

pub mod backoff;
pub mod circuit_breaker;
pub mod retries;
pub mod timeouts;

pub use circuit_breaker::{CircuitBreaker, CircuitSnapshot, CircuitStatus};
pub use retries::{RetryError, RetryPolicy};
pub use timeouts::Deadline;
