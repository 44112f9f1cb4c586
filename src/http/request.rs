//! Request parsing.
//!
//! # Responsibilities
//! - Deserialize `/fetch` query parameters
//! - Derive the correlation id from the request id header
//! - Build the `FetchRequest` handed to the gateway
//!
//! # Design Decisions
//! - The request id is set by tower-http before handlers run, so the log
//!   correlation id and the response header always agree

use axum::http::HeaderMap;
use serde::Deserialize;
use std::time::Duration;
use uuid::Uuid;

use crate::fetch::{FetchError, FetchRequest};

/// Header name for request ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Query string of `GET /fetch`.
#[derive(Debug, Clone, Deserialize)]
pub struct FetchParams {
    pub url: String,
    /// Overall budget in milliseconds; the configured default when absent.
    pub timeout_ms: Option<u64>,
}

impl FetchParams {
    pub fn into_request(
        self,
        headers: &HeaderMap,
        default_timeout: Duration,
    ) -> Result<FetchRequest, FetchError> {
        let timeout = self
            .timeout_ms
            .map(Duration::from_millis)
            .unwrap_or(default_timeout);

        let request = FetchRequest::new(&self.url, timeout)?;
        Ok(match correlation_id(headers) {
            Some(id) => request.with_correlation_id(id),
            None => request,
        })
    }
}

/// Request id header parsed as a UUID, when present and well-formed.
pub fn correlation_id(headers: &HeaderMap) -> Option<Uuid> {
    headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| Uuid::parse_str(v.trim()).ok())
}
