//! Nim Game Server - Entry Point
//!
//! Loads configuration, binds the listener and accepts connections until
//! interrupted, then waits for running matches to finish.

use std::env;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use nim_server::{serve, Matchmaker, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logging with environment filter
    // Use RUST_LOG env var to control log level
    // e.g., RUST_LOG=debug or RUST_LOG=nim_server=trace
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("nim_server=info,nimd=info")),
        )
        .init();

    // Bind address from command line (port or host:port) or config
    let config = ServerConfig::load(env::args().nth(1))?;

    let listener = TcpListener::bind(&config.bind_address).await?;
    info!("Nim server listening on {}", config.bind_address);

    let matchmaker = Arc::new(Matchmaker::from_config(&config));

    serve(listener, Arc::clone(&matchmaker), async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for shutdown signal: {}", e);
            std::future::pending::<()>().await;
        }
    })
    .await;

    info!(
        "Waiting for {} running match(es) to finish",
        matchmaker.active_sessions()
    );
    matchmaker.wait_idle().await;
    info!("Server shut down");

    Ok(())
}
