use axum::{extract::State, Json};
use serde::Serialize;

use crate::health::HealthStatus;
use crate::http::server::AppState;
use crate::observability::MetricsSnapshot;
use crate::resilience::CircuitSnapshot;

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: HealthStatus,
    pub circuit: CircuitSnapshot,
    pub strategies: Vec<&'static str>,
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let health = state.gateway.health();
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: health.status,
        circuit: state.gateway.breaker().snapshot(),
        strategies: state
            .gateway
            .strategies()
            .iter()
            .map(|s| s.as_str())
            .collect(),
    })
}

pub async fn get_metrics(State(state): State<AppState>) -> Json<MetricsSnapshot> {
    Json(state.gateway.metrics().snapshot())
}

pub async fn reset_circuit(State(state): State<AppState>) -> Json<CircuitSnapshot> {
    tracing::info!("Circuit reset requested via admin API");
    Json(state.gateway.reset_circuit())
}
