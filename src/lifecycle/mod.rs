//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Shutdown::trigger
//!
//! Shutdown (shutdown.rs):
//!     trigger → HTTP server stops accepting and drains
//!             → Gateway closes its limiter (pending acquires fail)
//!             → In-flight fetches resolve with FetchError::Shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accept, fail pending, cancel in-flight
//! - The triggered flag is sticky so late subscribers still observe it

pub mod shutdown;
pub mod signals;

pub use shutdown::Shutdown;
