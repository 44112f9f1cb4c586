//! Fetch gateway server binary.

use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::net::TcpListener;

use fetch_gateway::config::{load_config, GatewayConfig};
use fetch_gateway::http::{AppState, HttpServer};
use fetch_gateway::lifecycle::signals::spawn_signal_handler;
use fetch_gateway::observability::{logging, metrics};
use fetch_gateway::{Gateway, Shutdown};

#[derive(Parser)]
#[command(name = "fetch-gateway")]
#[command(about = "Resilient page-content fetch gateway", long_about = None)]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long, env = "GATEWAY_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => GatewayConfig::default(),
    };

    logging::init_logging(&config.observability)?;
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "fetch-gateway starting");

    if let Some(path) = &args.config {
        tracing::info!(path = %path.display(), "Configuration loaded");
    } else {
        tracing::warn!("No configuration file given, using defaults");
    }
    if config.admin.enabled && config.admin.api_key == "CHANGE_ME_IN_PRODUCTION" {
        tracing::warn!("Admin API is using the placeholder api_key");
    }

    let prometheus = if config.observability.metrics_enabled {
        Some(metrics::init_metrics()?)
    } else {
        None
    };

    let shutdown = Shutdown::new();
    let gateway = Arc::new(Gateway::from_config(&config, shutdown.clone())?);
    spawn_signal_handler(shutdown.clone());

    // Close admission as soon as shutdown starts, not when the server finishes draining.
    {
        let gateway = gateway.clone();
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            shutdown.wait().await;
            gateway.shutdown();
        });
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let state = AppState::new(gateway, prometheus, config.admin.clone());
    HttpServer::new(state, shutdown).run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
