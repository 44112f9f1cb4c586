//! The gateway facade: admission, breaker fast-fail, orchestration, shutdown.
//!
//! # Data Flow
//! ```text
//! Gateway::fetch(url)
//!     → FetchRequest::new (parse URL, start deadline, correlation id)
//!     → breaker.check()            open → CircuitOpen (no slot taken)
//!     → limiter.acquire()          bounded by deadline and shutdown
//!     → orchestrator.fetch()       raced against shutdown
//!     → slot dropped, request outcome counted
//! ```

use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::Instrument;
use url::Url;

use crate::admission::ConcurrencyLimiter;
use crate::config::validation::validate_config;
use crate::config::{ConfigError, GatewayConfig};
use crate::fetch::{
    FastFetch, FetchError, FetchOrchestrator, FetchRequest, FetchResult, RenderServiceClient,
    RenderedFetch, RequiredMarkers, StrategyKind,
};
use crate::health::HealthReport;
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::observability::MetricsRecorder;
use crate::resilience::{CircuitBreaker, CircuitSnapshot};

/// Errors raised while assembling a gateway.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to build HTTP client: {0}")]
    Client(#[from] reqwest::Error),

    #[error("invalid render endpoint: {0}")]
    RenderEndpoint(#[from] url::ParseError),
}

/// Resilient content fetcher shared by every caller.
pub struct Gateway {
    orchestrator: FetchOrchestrator,
    limiter: ConcurrencyLimiter,
    shutdown: Shutdown,
    default_timeout: Duration,
    started: Instant,
}

impl Gateway {
    pub fn new(
        orchestrator: FetchOrchestrator,
        limiter: ConcurrencyLimiter,
        shutdown: Shutdown,
        default_timeout: Duration,
    ) -> Self {
        Self {
            orchestrator,
            limiter,
            shutdown,
            default_timeout,
            started: Instant::now(),
        }
    }

    /// Wire the production tiers from configuration.
    pub fn from_config(config: &GatewayConfig, shutdown: Shutdown) -> Result<Self, GatewayError> {
        validate_config(config).map_err(ConfigError::Validation)?;

        let breaker = Arc::new(CircuitBreaker::new(config.circuit_breaker.failure_threshold));
        let recorder = Arc::new(MetricsRecorder::new());

        let mut orchestrator = FetchOrchestrator::new(breaker, recorder)
            .validator(Arc::new(RequiredMarkers::new(
                config.fetch.required_markers.clone(),
            )))
            .tier(Arc::new(FastFetch::new(&config.fetch)?), config.retries.policy(None));

        if config.render.enabled {
            let renderer = RenderServiceClient::new(Url::parse(&config.render.endpoint)?)?;
            orchestrator = orchestrator.tier(
                Arc::new(RenderedFetch::new(Arc::new(renderer), config.render.timeout())),
                config.retries.policy(config.render.max_attempts),
            );
        }

        tracing::info!(
            strategies = ?orchestrator.strategies(),
            concurrency = config.concurrency.limit,
            failure_threshold = config.circuit_breaker.failure_threshold,
            max_attempts = config.retries.max_attempts,
            "Gateway initialized"
        );

        Ok(Self::new(
            orchestrator,
            ConcurrencyLimiter::new(config.concurrency.limit),
            shutdown,
            config.fetch.request_timeout(),
        ))
    }

    /// Fetch `url` with the default request timeout.
    pub async fn fetch(&self, url: &str) -> Result<FetchResult, FetchError> {
        let request = FetchRequest::new(url, self.default_timeout)?;
        self.execute(request).await
    }

    /// Fetch with an explicit request.
    pub async fn execute(&self, request: FetchRequest) -> Result<FetchResult, FetchError> {
        let span = tracing::info_span!(
            "fetch",
            correlation_id = %request.correlation_id(),
            url = %request.url()
        );

        async move {
            let result = self.run(&request).await;
            match &result {
                Ok(_) => metrics::record_request("success"),
                Err(e) => {
                    metrics::record_request(e.kind());
                    tracing::warn!(error = %e, "Fetch failed");
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run(&self, request: &FetchRequest) -> Result<FetchResult, FetchError> {
        if self.shutdown.is_triggered() {
            return Err(FetchError::Shutdown);
        }
        self.orchestrator.breaker().check()?;

        let deadline = request.deadline();
        let _slot = tokio::select! {
            biased;
            _ = self.shutdown.wait() => return Err(FetchError::Shutdown),
            acquired = tokio::time::timeout_at(deadline.instant(), self.limiter.acquire()) => {
                acquired.map_err(|_| FetchError::Timeout(request.timeout()))??
            }
        };

        tokio::select! {
            biased;
            _ = self.shutdown.wait() => {
                tracing::info!("Fetch cancelled by shutdown");
                Err(FetchError::Shutdown)
            }
            result = self.orchestrator.fetch(request) => result,
        }
    }

    pub fn health(&self) -> HealthReport {
        HealthReport::new(
            self.breaker().snapshot(),
            self.shutdown.is_triggered(),
            self.started.elapsed().as_secs_f64(),
            self.limiter.in_flight(),
            self.limiter.available(),
        )
    }

    /// Close the circuit unconditionally.
    pub fn reset_circuit(&self) -> CircuitSnapshot {
        self.breaker().reset();
        self.breaker().snapshot()
    }

    /// Stop admitting work and cancel in-flight fetches.
    pub fn shutdown(&self) {
        self.shutdown.trigger();
        self.limiter.close();
    }

    pub fn strategies(&self) -> Vec<StrategyKind> {
        self.orchestrator.strategies()
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        self.orchestrator.breaker()
    }

    pub fn metrics(&self) -> &Arc<MetricsRecorder> {
        self.orchestrator.metrics()
    }

    pub fn limiter(&self) -> &ConcurrencyLimiter {
        &self.limiter
    }

    pub fn default_timeout(&self) -> Duration {
        self.default_timeout
    }
}
