//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (request ID, tracing)
//! - Bind server to listener
//! - Drain gracefully on shutdown

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::admin::setup_admin_router;
use crate::config::AdminConfig;
use crate::fetch::FetchError;
use crate::gateway::Gateway;
use crate::http::request::FetchParams;
use crate::http::response::FetchResponse;
use crate::lifecycle::Shutdown;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gateway: Arc<Gateway>,
    /// Present when the Prometheus recorder is installed.
    pub prometheus: Option<PrometheusHandle>,
    pub admin: Arc<AdminConfig>,
}

impl AppState {
    pub fn new(gateway: Arc<Gateway>, prometheus: Option<PrometheusHandle>, admin: AdminConfig) -> Self {
        Self {
            gateway,
            prometheus,
            admin: Arc::new(admin),
        }
    }
}

/// HTTP front end of the gateway.
pub struct HttpServer {
    router: Router,
    shutdown: Shutdown,
}

impl HttpServer {
    pub fn new(state: AppState, shutdown: Shutdown) -> Self {
        Self {
            router: Self::build_router(state),
            shutdown,
        }
    }

    /// Build the Axum router with all middleware layers.
    pub fn build_router(state: AppState) -> Router {
        let mut router = Router::new()
            .route("/fetch", get(fetch_handler))
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .with_state(state.clone());

        if state.admin.enabled {
            router = router.merge(setup_admin_router(state));
        }

        router.layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
    }

    /// Run the server until shutdown is triggered, then drain open requests.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        let shutdown = self.shutdown.clone();
        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move { shutdown.wait().await })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

async fn fetch_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    params: Result<Query<FetchParams>, QueryRejection>,
) -> Result<Json<FetchResponse>, FetchError> {
    let Query(params) = params.map_err(|e| FetchError::InvalidRequest(e.body_text()))?;
    let request = params.into_request(&headers, state.gateway.default_timeout())?;
    let result = state.gateway.execute(request).await?;
    Ok(Json(FetchResponse::from(result)))
}

async fn health_handler(State(state): State<AppState>) -> Response {
    let report = state.gateway.health();
    let status = if report.is_healthy() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (status, Json(report)).into_response()
}

async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.prometheus {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            handle.render(),
        )
            .into_response(),
        None => (StatusCode::NOT_FOUND, "metrics exporter disabled").into_response(),
    }
}
