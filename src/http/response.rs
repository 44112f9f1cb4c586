//! Response shaping.
//!
//! # Responsibilities
//! - Serialize successful fetches as JSON
//! - Map gateway errors to HTTP status codes
//!
//! # Design Decisions
//! - Origin failures are 502, our own timeouts are 504
//! - An open circuit and a draining gateway are both 503 (retry later)
//! - Error bodies carry a stable machine tag plus a human message

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use uuid::Uuid;

use crate::fetch::{FetchError, FetchResult, StrategyKind};

/// Body of a successful `GET /fetch`.
#[derive(Debug, Clone, Serialize)]
pub struct FetchResponse {
    pub url: String,
    pub correlation_id: Uuid,
    pub strategy: StrategyKind,
    pub attempts: u32,
    pub elapsed_seconds: f64,
    pub content_length: usize,
    pub content: String,
}

impl From<FetchResult> for FetchResponse {
    fn from(result: FetchResult) -> Self {
        Self {
            url: result.url.to_string(),
            correlation_id: result.correlation_id,
            strategy: result.strategy,
            attempts: result.attempts,
            elapsed_seconds: result.elapsed.as_secs_f64(),
            content_length: result.content.len(),
            content: result.content,
        }
    }
}

/// Body of every error response.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
    pub message: String,
}

pub fn status_for(error: &FetchError) -> StatusCode {
    match error {
        FetchError::InvalidRequest(_) => StatusCode::BAD_REQUEST,
        FetchError::Extraction(_) => StatusCode::UNPROCESSABLE_ENTITY,
        FetchError::Network(_) | FetchError::Exhausted(_) => StatusCode::BAD_GATEWAY,
        FetchError::CircuitOpen { .. } | FetchError::Shutdown => StatusCode::SERVICE_UNAVAILABLE,
        FetchError::Timeout(_) => StatusCode::GATEWAY_TIMEOUT,
    }
}

impl IntoResponse for FetchError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.kind(),
            message: self.to_string(),
        };
        (status_for(&self), Json(body)).into_response()
    }
}
