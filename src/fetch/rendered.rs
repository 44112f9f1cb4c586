//! Rendered acquisition: delegate to a browser engine.
//!
//! # Responsibilities
//! - Define the `Renderer` seam over an opaque browser engine
//! - Ship `RenderServiceClient`, which talks to a remote rendering service
//! - Bound every render with the tier timeout
//!
//! # Design Decisions
//! - The engine is never embedded; it runs out of process
//! - Service errors and non-2xx answers are retryable network failures

use serde::Serialize;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use url::Url;

use crate::fetch::strategy::{AcquireFuture, AcquisitionStrategy};
use crate::fetch::{FetchError, StrategyKind};

/// Future returned by a renderer.
pub type RenderFuture<'a> = Pin<Box<dyn Future<Output = Result<String, FetchError>> + Send + 'a>>;

/// Opaque browser engine: loads a page, runs its scripts, returns the HTML.
pub trait Renderer: Send + Sync {
    fn render<'a>(&'a self, url: &'a Url, timeout: Duration) -> RenderFuture<'a>;
}

#[derive(Debug, Serialize)]
struct RenderRequest<'a> {
    url: &'a str,
    timeout_ms: u64,
}

/// Client for an HTTP rendering service.
///
/// POSTs `{"url": ..., "timeout_ms": ...}` to the endpoint and treats the
/// response body as the rendered document.
#[derive(Debug, Clone)]
pub struct RenderServiceClient {
    client: reqwest::Client,
    endpoint: Url,
}

impl RenderServiceClient {
    pub fn new(endpoint: Url) -> Result<Self, reqwest::Error> {
        Ok(Self {
            client: reqwest::Client::builder().build()?,
            endpoint,
        })
    }

    async fn post(&self, url: &Url, timeout: Duration) -> Result<String, FetchError> {
        let body = RenderRequest {
            url: url.as_str(),
            timeout_ms: timeout.as_millis().min(u128::from(u64::MAX)) as u64,
        };

        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&body)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| render_error(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Network(format!("render service returned HTTP {status}")));
        }

        response.text().await.map_err(|e| render_error(e, timeout))
    }
}

fn render_error(error: reqwest::Error, timeout: Duration) -> FetchError {
    if error.is_timeout() {
        FetchError::Timeout(timeout)
    } else {
        FetchError::Network(format!("render service: {}", error.without_url()))
    }
}

impl Renderer for RenderServiceClient {
    fn render<'a>(&'a self, url: &'a Url, timeout: Duration) -> RenderFuture<'a> {
        Box::pin(self.post(url, timeout))
    }
}

/// Slow fallback strategy wrapping a [`Renderer`].
#[derive(Clone)]
pub struct RenderedFetch {
    renderer: Arc<dyn Renderer>,
    timeout: Duration,
}

impl RenderedFetch {
    pub fn new(renderer: Arc<dyn Renderer>, timeout: Duration) -> Self {
        Self { renderer, timeout }
    }
}

impl AcquisitionStrategy for RenderedFetch {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Rendered
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn attempt<'a>(&'a self, url: &'a Url, timeout: Duration) -> AcquireFuture<'a> {
        let limit = timeout.min(self.timeout);
        Box::pin(async move {
            tokio::time::timeout(limit, self.renderer.render(url, limit))
                .await
                .map_err(|_| FetchError::Timeout(limit))?
        })
    }
}
