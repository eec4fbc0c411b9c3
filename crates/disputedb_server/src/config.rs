//! Process configuration.

use clap::Parser;
use std::path::PathBuf;

/// Command-line and environment configuration for the server binary.
///
/// Every flag can also come from the environment, so container
/// deployments need no argument plumbing.
#[derive(Debug, Clone, Parser)]
#[command(name = "disputedb", version, about = "Idempotent chargeback store over HTTP")]
pub struct ServerConfig {
    /// Port to listen on.
    #[arg(long, env = "PORT", default_value_t = 8080)]
    pub port: u16,

    /// Address to bind.
    #[arg(long, env = "BIND_ADDR", default_value = "0.0.0.0")]
    pub bind_addr: String,

    /// Path of the store file.
    #[arg(long, env = "DB_PATH", default_value = "chargebacks.db")]
    pub db_path: PathBuf,

    /// Skip fsync on commit (faster, loses the last commits on power
    /// failure; process crashes stay safe).
    #[arg(long, env = "NO_SYNC", default_value_t = false)]
    pub no_sync: bool,
}

impl ServerConfig {
    /// The socket address string to bind.
    #[must_use]
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.bind_addr, self.port)
    }
}
