//! Shield Sync Receiver
//!
//! Accepts `SyncResource` / `SyncNamespace` calls from the shield controller
//! and writes them to the configured store.
//!
//! # Configuration
//!
//! Environment variables (a `.env` file in the working directory is loaded
//! first):
//! - `DATABASE_TYPE`: `mongo` (default), `postgres` or `postgresql`
//! - `MONGO_URI`, `MONGO_DB` (default: shield)
//! - `POSTGRES_HOST`, `POSTGRES_PORT`, `POSTGRES_DB`, `POSTGRES_USER`, `POSTGRES_PASSWORD`
//! - `GRPC_PORT`: Port to listen on (default: 50051)
//! - `RECEIVER_MAX_WORKERS`: Concurrent request limit (default: 10)
//! - `RECEIVER_CONFIG`: Path to a YAML config file

use clap::Parser;
use shield_receiver::{
    create_backend, logging, server, ReceiverConfig, StorageBackend, SyncHandler,
};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "shield-receiver")]
#[command(version)]
#[command(about = "Receives sync events and persists them to MongoDB or PostgreSQL", long_about = None)]
struct Cli {
    /// Path to config file
    #[arg(long, short)]
    config: Option<PathBuf>,

    /// Port to listen on (overrides config and environment)
    #[arg(long, short)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() {
    logging::init();

    if let Err(e) = run().await {
        tracing::error!("{}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    if let Ok(path) = dotenvy::dotenv() {
        tracing::debug!("Loaded environment from {}", path.display());
    }
    let cli = Cli::parse();

    // Load configuration
    let mut config = ReceiverConfig::load(cli.config)?;
    if let Some(port) = cli.port {
        config.port = port;
    }

    // Configuration and connection errors stop us before we listen
    let backend = Arc::new(create_backend(&config)?);
    backend.connect().await?;
    tracing::info!("Using {} storage backend", backend.name());

    let app = server::router(SyncHandler::new(Arc::clone(&backend)), config.max_workers);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = match tokio::net::TcpListener::bind(addr).await {
        Ok(listener) => listener,
        Err(e) => {
            backend.disconnect().await;
            return Err(e.into());
        }
    };
    tracing::info!(
        "Sync receiver listening on {} (max {} concurrent requests)",
        addr,
        config.max_workers
    );

    let served = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await;

    // In-flight requests have drained; release the store exactly once
    backend.disconnect().await;
    tracing::info!("Sync receiver stopped");

    served?;
    Ok(())
}

/// Resolves on Ctrl-C or, on Unix, SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::warn!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
    tracing::info!("Shutting down sync receiver...");
}
