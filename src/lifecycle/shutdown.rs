//! Shutdown coordination for the gateway.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;

/// Coordinator for graceful shutdown.
///
/// Provides a broadcast channel that all long-running tasks can subscribe to.
/// Cloning yields a handle to the same coordinator.
#[derive(Debug, Clone)]
pub struct Shutdown {
    /// Broadcast channel sender.
    tx: broadcast::Sender<()>,
    triggered: Arc<AtomicBool>,
}

impl Shutdown {
    /// Create a new shutdown coordinator.
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(1);
        Self {
            tx,
            triggered: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Subscribe to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.tx.subscribe()
    }

    /// Trigger the shutdown signal. Idempotent.
    pub fn trigger(&self) {
        if !self.triggered.swap(true, Ordering::SeqCst) {
            tracing::info!(subscribers = self.tx.receiver_count(), "Shutdown triggered");
        }
        let _ = self.tx.send(());
    }

    pub fn is_triggered(&self) -> bool {
        self.triggered.load(Ordering::SeqCst)
    }

    /// Resolve once shutdown has been triggered, including before this call.
    pub async fn wait(&self) {
        let mut rx = self.subscribe();
        if self.is_triggered() {
            return;
        }
        // Closed channel means the coordinator is gone; treat as shutdown.
        let _ = rx.recv().await;
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}
