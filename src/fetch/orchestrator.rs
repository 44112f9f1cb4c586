//! Tiered fetch orchestration.
//!
//! # Responsibilities
//! - Refuse work while the circuit breaker is open
//! - Run each tier (strategy + retry policy) in order until one succeeds
//! - Validate content before a tier counts as successful
//! - Report one outcome per tier to metrics, one per request to the breaker
//!
//! # Data Flow
//! ```text
//! fetch(request)
//!     → breaker.check()                      open → CircuitOpen
//!     → tier 1 (fast):     retry(attempt → validate)
//!     → tier 2 (rendered): retry(attempt → validate)   only if tier 1 failed
//!     → success: breaker.record_success, metrics(kind, success, latency)
//!     → all failed: breaker.record_failure, Exhausted(causes)
//! ```
//!
//! # Design Decisions
//! - Breaker state is mutated at most once per call
//! - Every attempt is bounded by `min(tier timeout, remaining deadline)`
//! - Shutdown aborts the call without touching the breaker
//! - Running out of request budget is not an origin failure

use std::sync::Arc;
use tokio::time::Instant;

use crate::fetch::strategy::AcquisitionStrategy;
use crate::fetch::validate::{ContentValidator, NonEmptyContent};
use crate::fetch::{FetchError, FetchRequest, FetchResult, StrategyKind, TierFailure};
use crate::observability::{MetricsRecorder, Outcome};
use crate::resilience::retries::Attempt;
use crate::resilience::{CircuitBreaker, RetryError, RetryPolicy};

struct Tier {
    strategy: Arc<dyn AcquisitionStrategy>,
    policy: RetryPolicy,
}

/// Runs acquisition tiers in order behind a circuit breaker.
pub struct FetchOrchestrator {
    tiers: Vec<Tier>,
    breaker: Arc<CircuitBreaker>,
    metrics: Arc<MetricsRecorder>,
    validator: Arc<dyn ContentValidator>,
}

impl FetchOrchestrator {
    /// An orchestrator with no tiers that accepts any non-blank content.
    pub fn new(breaker: Arc<CircuitBreaker>, metrics: Arc<MetricsRecorder>) -> Self {
        Self {
            tiers: Vec::new(),
            breaker,
            metrics,
            validator: Arc::new(NonEmptyContent),
        }
    }

    /// Append a tier. Tiers run in the order they are added.
    pub fn tier(mut self, strategy: Arc<dyn AcquisitionStrategy>, policy: RetryPolicy) -> Self {
        self.tiers.push(Tier { strategy, policy });
        self
    }

    pub fn validator(mut self, validator: Arc<dyn ContentValidator>) -> Self {
        self.validator = validator;
        self
    }

    pub fn strategies(&self) -> Vec<StrategyKind> {
        self.tiers.iter().map(|t| t.strategy.kind()).collect()
    }

    pub fn breaker(&self) -> &Arc<CircuitBreaker> {
        &self.breaker
    }

    pub fn metrics(&self) -> &Arc<MetricsRecorder> {
        &self.metrics
    }

    /// Fetch `request.url()` through the tiers, bounded by the request deadline.
    pub async fn fetch(&self, request: &FetchRequest) -> Result<FetchResult, FetchError> {
        self.breaker.check()?;

        let started = Instant::now();
        let deadline = request.deadline();
        let mut failures = Vec::with_capacity(self.tiers.len());
        let mut out_of_budget = false;

        for tier in &self.tiers {
            let kind = tier.strategy.kind();
            let tier_started = Instant::now();

            let outcome = tier
                .policy
                .run(
                    deadline,
                    tier.strategy.timeout(),
                    |attempt| self.attempt(tier.strategy.as_ref(), request, attempt),
                    FetchError::is_retryable,
                )
                .await;

            match outcome {
                Ok((content, attempts)) => {
                    self.metrics
                        .record(kind, Outcome::Success, Some(tier_started.elapsed()));
                    self.breaker.record_success();

                    let elapsed = started.elapsed();
                    tracing::info!(
                        correlation_id = %request.correlation_id(),
                        strategy = %kind,
                        attempts,
                        elapsed = ?elapsed,
                        "Fetch succeeded"
                    );
                    return Ok(FetchResult {
                        url: request.url().clone(),
                        correlation_id: request.correlation_id(),
                        content,
                        strategy: kind,
                        attempts,
                        elapsed,
                    });
                }
                Err(retry_error) => {
                    self.metrics.record(kind, Outcome::Failure, None);

                    let attempts = retry_error.attempts();
                    let deadline_hit = matches!(retry_error, RetryError::DeadlineExceeded { .. });
                    let error = retry_error
                        .into_last()
                        .unwrap_or(FetchError::Timeout(request.timeout()));
                    if error == FetchError::Shutdown {
                        return Err(FetchError::Shutdown);
                    }

                    tracing::warn!(
                        correlation_id = %request.correlation_id(),
                        strategy = %kind,
                        attempts,
                        error = %error,
                        "Strategy exhausted, falling back"
                    );
                    failures.push(TierFailure {
                        strategy: kind,
                        attempts,
                        error: Box::new(error),
                    });

                    if deadline_hit || deadline.is_expired() {
                        out_of_budget = true;
                        break;
                    }
                }
            }
        }

        // A caller's budget running out says nothing about the origin.
        let error = FetchError::Exhausted(failures);
        if !out_of_budget && error.counts_against_breaker() {
            self.breaker.record_failure();
        } else {
            tracing::debug!(
                correlation_id = %request.correlation_id(),
                "Failure not counted against circuit breaker"
            );
        }
        Err(error)
    }

    async fn attempt(
        &self,
        strategy: &dyn AcquisitionStrategy,
        request: &FetchRequest,
        attempt: Attempt,
    ) -> Result<String, FetchError> {
        let result = match tokio::time::timeout(
            attempt.timeout,
            strategy.attempt(request.url(), attempt.timeout),
        )
        .await
        {
            Ok(result) => result,
            Err(_) => Err(FetchError::Timeout(attempt.timeout)),
        };

        let result = result.and_then(|content| {
            self.validator.validate(request.url(), &content)?;
            Ok(content)
        });

        if let Err(error) = &result {
            tracing::warn!(
                correlation_id = %request.correlation_id(),
                strategy = %strategy.kind(),
                attempt = attempt.number,
                error = %error,
                "Fetch attempt failed"
            );
        }
        result
    }
}
