//! Admission control.
//!
//! Bounds how many fetches run at once. Callers wait for a slot instead of
//! being rejected; the slot is an RAII guard released on every exit path.

pub mod limiter;

pub use limiter::{ConcurrencyLimiter, ConcurrencySlot};
