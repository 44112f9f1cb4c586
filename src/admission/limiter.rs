//! Semaphore-backed concurrency limiter.
//!
//! # Responsibilities
//! - Admit at most `capacity` fetches at a time
//! - Queue further callers in FIFO order (tokio's semaphore is fair)
//! - Fail pending and future acquisitions once closed for shutdown
//! - Keep the `gateway_in_flight` gauge current

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::fetch::FetchError;
use crate::observability::metrics;

/// Fixed-size pool of fetch slots.
#[derive(Debug, Clone)]
pub struct ConcurrencyLimiter {
    semaphore: Arc<Semaphore>,
    capacity: usize,
    in_flight: Arc<AtomicUsize>,
}

impl ConcurrencyLimiter {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Wait for a free slot.
    ///
    /// Fails with [`FetchError::Shutdown`] once the limiter is closed, also
    /// for callers already waiting.
    pub async fn acquire(&self) -> Result<ConcurrencySlot, FetchError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| FetchError::Shutdown)?;

        let in_flight = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        metrics::record_in_flight(in_flight);
        tracing::trace!(in_flight, capacity = self.capacity, "Concurrency slot acquired");

        Ok(ConcurrencySlot {
            _permit: permit,
            in_flight: self.in_flight.clone(),
        })
    }

    /// Stop admitting work.
    pub fn close(&self) {
        if !self.semaphore.is_closed() {
            self.semaphore.close();
            tracing::info!(in_flight = self.in_flight(), "Concurrency limiter closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Slots free right now.
    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }
}

/// A held fetch slot.
///
/// When dropped, the slot is released back to the pool. This holds on
/// error, timeout, cancellation, and panic unwinding alike.
#[derive(Debug)]
pub struct ConcurrencySlot {
    _permit: OwnedSemaphorePermit,
    in_flight: Arc<AtomicUsize>,
}

impl Drop for ConcurrencySlot {
    fn drop(&mut self) {
        let in_flight = self.in_flight.fetch_sub(1, Ordering::SeqCst) - 1;
        metrics::record_in_flight(in_flight);
    }
}
