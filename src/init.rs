// Initialization utilities for the CLI
//
// Logging/tracing setup and storage session construction

use std::sync::Arc;

use anyhow::Result;
use logfanout_config::{LogConfig, LogFormat, StorageConfig};
use logfanout_writer::{MemorySession, Session};
use tracing::info;

/// Initialize tracing/logging from the logging section of the config
pub fn init_tracing(config: &LogConfig) {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let env_filter =
        EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    let registry = tracing_subscriber::registry().with(env_filter);

    // Try to set the global subscriber; ignore error if already set (idempotent)
    let _ = match config.format {
        LogFormat::Json => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().json().with_writer(std::io::stderr)),
        ),
        LogFormat::Text => tracing::subscriber::set_global_default(
            registry.with(fmt::layer().with_writer(std::io::stderr)),
        ),
    };
}

/// Open one storage session.
///
/// Dry runs get an in-memory session. Real sessions need the `scylla` feature.
pub async fn connect_session(config: &StorageConfig, dry_run: bool) -> Result<Arc<dyn Session>> {
    if dry_run {
        info!("Dry run: writes are recorded in memory only");
        return Ok(Arc::new(MemorySession::new()));
    }

    connect_cluster(config).await
}

#[cfg(feature = "scylla")]
async fn connect_cluster(config: &StorageConfig) -> Result<Arc<dyn Session>> {
    info!(
        hosts = %config.contact_points.join(","),
        table = %config.by_id_table,
        "Connecting to storage cluster"
    );
    let session = logfanout_writer::ScyllaSession::connect(config).await?;
    Ok(Arc::new(session))
}

#[cfg(not(feature = "scylla"))]
async fn connect_cluster(config: &StorageConfig) -> Result<Arc<dyn Session>> {
    Err(logfanout_writer::WriterError::invalid_config(format!(
        "cannot connect to [{}]: built without the `scylla` feature (use --dry-run or rebuild with --features scylla)",
        config.contact_points.join(",")
    ))
    .into())
}
