//! Operator API.
//!
//! Every route sits behind bearer-token auth against `admin.api_key`.

pub mod auth;
pub mod handlers;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};

use self::auth::admin_auth_middleware;
use self::handlers::*;
use crate::http::server::AppState;

pub fn setup_admin_router(state: AppState) -> Router {
    Router::new()
        .route("/admin/status", get(get_status))
        .route("/admin/metrics", get(get_metrics))
        .route("/admin/circuit/reset", post(reset_circuit))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            admin_auth_middleware,
        ))
        .with_state(state)
}
