// Configuration validation
//
// Validates that required fields are present and values are sensible

use crate::*;
use anyhow::{bail, Result};
use tracing::warn;

/// Rows per batch above which the store starts warning about batch size.
const LARGE_BATCH_ROWS: usize = 1_000;

pub fn validate_config(config: &RuntimeConfig) -> Result<()> {
    validate_storage_config(&config.storage)?;
    validate_ingest_config(&config.ingest)?;
    validate_log_config(&config.logging)?;
    Ok(())
}

fn validate_storage_config(config: &StorageConfig) -> Result<()> {
    if config.contact_points.is_empty() {
        bail!("storage.contact_points must list at least one host");
    }

    if config.contact_points.iter().any(|h| h.trim().is_empty()) {
        bail!("storage.contact_points must not contain empty hosts");
    }

    validate_table_name(&config.by_id_table)?;

    if config.by_id_table == BY_DAY_TABLE {
        bail!(
            "storage.by_id_table must differ from the by-day table '{}'",
            BY_DAY_TABLE
        );
    }

    if config.connect_timeout_secs == 0 {
        bail!("storage.connect_timeout_secs must be greater than 0");
    }

    if config.request_timeout_secs == Some(0) {
        bail!("storage.request_timeout_secs must be greater than 0 when set");
    }

    if config.password.is_some() && config.username.is_none() {
        bail!("storage.password requires storage.username");
    }

    Ok(())
}

fn validate_table_name(name: &str) -> Result<()> {
    if name.is_empty() {
        bail!("storage.by_id_table must not be empty");
    }

    let valid_part =
        |part: &str| !part.is_empty() && part.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');

    let parts: Vec<&str> = name.split('.').collect();
    if parts.len() > 2 || !parts.iter().all(|p| valid_part(p)) {
        bail!(
            "storage.by_id_table '{}' must be 'table' or 'keyspace.table' using [A-Za-z0-9_]",
            name
        );
    }

    Ok(())
}

fn validate_ingest_config(config: &IngestConfig) -> Result<()> {
    if config.batch_size == 0 {
        bail!("ingest.batch_size must be greater than 0");
    }

    if config.shard_count == 0 {
        bail!("ingest.shard_count must be greater than 0");
    }

    if i32::try_from(config.shard_count).is_err() {
        bail!("ingest.shard_count must fit the int shardid column");
    }

    if config.by_id_precision().is_none() {
        bail!(
            "ingest.by_id_precision must be between 1 and 6, got {}",
            config.by_id_precision
        );
    }

    if config.by_day_precision().is_none() {
        bail!(
            "ingest.by_day_precision must be between 1 and 6, got {}",
            config.by_day_precision
        );
    }

    if config.lines_per_call == 0 {
        bail!("ingest.lines_per_call must be greater than 0");
    }

    if config.workers == 0 {
        bail!("ingest.workers must be greater than 0");
    }

    if config.queue_depth == 0 {
        bail!("ingest.queue_depth must be greater than 0");
    }

    if config.batch_size > LARGE_BATCH_ROWS {
        warn!(
            batch_size = config.batch_size,
            "ingest.batch_size is very large; the cluster may reject oversized batches"
        );
    }

    Ok(())
}

fn validate_log_config(config: &LogConfig) -> Result<()> {
    if config.level.trim().is_empty() {
        bail!("logging.level must not be empty");
    }

    Ok(())
}
