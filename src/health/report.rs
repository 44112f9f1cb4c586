//! Point-in-time gateway health.
//!
//! # States
//! - Ok: circuit closed, accepting work
//! - Degraded: circuit open, every fetch fails fast until reset
//! - ShuttingDown: draining, new fetches fail with `Shutdown`

use serde::Serialize;

use crate::resilience::{CircuitSnapshot, CircuitStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Ok,
    Degraded,
    ShuttingDown,
}

/// Body of `GET /health`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub circuit: CircuitStatus,
    pub consecutive_failures: u32,
    pub threshold: u32,
    pub uptime_seconds: f64,
    pub in_flight: usize,
    pub available_slots: usize,
}

impl HealthReport {
    pub fn new(
        circuit: CircuitSnapshot,
        shutting_down: bool,
        uptime_seconds: f64,
        in_flight: usize,
        available_slots: usize,
    ) -> Self {
        let status = if shutting_down {
            HealthStatus::ShuttingDown
        } else if circuit.status == CircuitStatus::Open {
            HealthStatus::Degraded
        } else {
            HealthStatus::Ok
        };

        Self {
            status,
            circuit: circuit.status,
            consecutive_failures: circuit.consecutive_failures,
            threshold: circuit.threshold,
            uptime_seconds,
            in_flight,
            available_slots,
        }
    }

    pub fn is_healthy(&self) -> bool {
        self.status == HealthStatus::Ok
    }
}
