//! Server binary: opens the store and serves the chargeback API.

use std::sync::Arc;

use clap::Parser;
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

use disputedb_core::{Engine, EngineConfig, RecordStore};
use disputedb_server::{router, ServerConfig};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = ServerConfig::parse();

    let engine_config = EngineConfig::default().sync_on_commit(!config.no_sync);
    let engine = Arc::new(Engine::open_with_config(&config.db_path, engine_config)?);
    let store = RecordStore::new(Arc::clone(&engine))?;

    let listener = TcpListener::bind(config.listen_addr()).await?;
    info!(
        addr = %config.listen_addr(),
        db = %config.db_path.display(),
        "listening"
    );

    axum::serve(listener, router(store))
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    engine.close()?;
    info!("shut down cleanly");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to install shutdown handler");
    }
}
