//! OS signal handling.
//!
//! # Responsibilities
//! - Wait for SIGINT (ctrl-c) or SIGTERM
//! - Translate either into a shutdown trigger
//!
//! # Design Decisions
//! - Uses Tokio's signal handling (async-safe)
//! - SIGTERM is unix-only; elsewhere only ctrl-c is observed

use crate::lifecycle::Shutdown;

/// Resolve when the process is asked to stop.
pub async fn wait_for_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!(signal = "SIGINT", "Signal received"),
        _ = terminate => tracing::info!(signal = "SIGTERM", "Signal received"),
    }
}

/// Spawn a task that triggers `shutdown` on the first stop signal.
pub fn spawn_signal_handler(shutdown: Shutdown) -> tokio::task::JoinHandle<()> {
    tokio::spawn(async move {
        wait_for_signal().await;
        shutdown.trigger();
    })
}
