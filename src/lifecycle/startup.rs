//! Startup orchestration.
//!
//! # Responsibilities
//! - Load and validate configuration
//! - Initialize logging and, when enabled, the metrics exporter
//! - Load the signing secret
//! - Build the server, bind the listener, serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - The listener binds last (traffic only when ready)

use std::net::SocketAddr;
use std::path::Path;

use thiserror::Error;
use tokio::net::TcpListener;

use crate::auth::{Secret, SecretError};
use crate::config::{load_config, ConfigError};
use crate::http::{BuildError, HttpServer};
use crate::lifecycle::Shutdown;
use crate::observability::{init_logging, init_metrics, LoggingError};

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("logging: {0}")]
    Logging(#[from] LoggingError),

    #[error("secret: {0}")]
    Secret(#[from] SecretError),

    #[error("metrics: {0}")]
    Metrics(#[from] metrics_exporter_prometheus::BuildError),

    #[error("server: {0}")]
    Build(#[from] BuildError),

    #[error("io: {0}")]
    Io(#[from] std::io::Error),
}

/// Start the gateway from a config file and run until a termination signal.
pub async fn run(config_path: &Path) -> Result<(), StartupError> {
    let config = load_config(config_path)?;
    init_logging(&config.observability)?;

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        config = %config_path.display(),
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        "edge-gateway starting"
    );

    let secret = Secret::from_env(&config.auth.secret_env)?;

    if config.observability.metrics_enabled {
        // Validation already checked the address when metrics are on
        if let Ok(addr) = config.observability.metrics_address.parse::<SocketAddr>() {
            init_metrics(addr)?;
        }
    }

    let server = HttpServer::new(&config, &secret)?;
    drop(secret);

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let receiver = shutdown.subscribe();
    shutdown.trigger_on_signal();

    server.run(listener, receiver).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
