//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! All subsystems produce:
//!     → logging.rs (structured log events)
//!     → metrics.rs (counters, gauges, histograms)
//!
//! Consumers:
//!     → Log aggregation (stdout)
//!     → GET /metrics (Prometheus scrape)
//!     → GET /admin/metrics (JSON snapshot)
//! ```
//!
//! # Design Decisions
//! - Correlation id flows through every fetch span
//! - Metrics are cheap (atomic increments)

pub mod logging;
pub mod metrics;

pub use self::metrics::{MetricsRecorder, MetricsSnapshot, Outcome};
