//! Gateway health reporting.
//!
//! # Data Flow
//! ```text
//! Gateway::health()
//!     → CircuitBreaker::snapshot()   (status, consecutive failures)
//!     → ConcurrencyLimiter           (in flight, free slots)
//!     → Shutdown                     (draining or not)
//!     → HealthReport → GET /health
//! ```
//!
//! # Design Decisions
//! - Health is derived on demand; there is no background prober
//! - An open circuit reports "degraded", not "down": the operator decides

pub mod report;

pub use report::{HealthReport, HealthStatus};
