//! Acquisition strategy abstraction.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use url::Url;

use crate::fetch::{FetchError, StrategyKind};

/// Future returned by a single acquisition attempt.
pub type AcquireFuture<'a> = Pin<Box<dyn Future<Output = Result<String, FetchError>> + Send + 'a>>;

/// One way of turning a URL into page content.
///
/// Implementations perform exactly one attempt per call; retries and
/// fallback belong to the orchestrator.
pub trait AcquisitionStrategy: Send + Sync {
    fn kind(&self) -> StrategyKind;

    /// Upper bound for one attempt. The orchestrator may pass less when the
    /// request deadline is closer.
    fn timeout(&self) -> Duration;

    fn attempt<'a>(&'a self, url: &'a Url, timeout: Duration) -> AcquireFuture<'a>;
}
