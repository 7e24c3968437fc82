use super::{LogFormat, RuntimeConfig, ShardStrategy};
use anyhow::{anyhow, Context, Result};

pub const ENV_PREFIX: &str = "LOGFANOUT_";

/// Abstraction over environment-variable lookups so tests (and embedders)
/// can supply their own source of overrides.
pub trait EnvSource {
    /// Get a variable by its name without the LOGFANOUT_ prefix
    fn get(&self, key: &str) -> Option<String>;
}

/// Apply environment-variable overrides (highest priority) to the runtime config.
pub fn apply_env_overrides<E: EnvSource>(config: &mut RuntimeConfig, env: &E) -> Result<()> {
    // Storage cluster
    if let Some(hosts) = get_env_string(env, "HOSTS") {
        config.storage.contact_points = split_hosts(&hosts);
    }
    if let Some(table) = get_env_string(env, "BY_ID_TABLE") {
        config.storage.by_id_table = table;
    }
    if let Some(val) = get_env_u64(env, "CONNECT_TIMEOUT_SECS")? {
        config.storage.connect_timeout_secs = val;
    }
    if let Some(val) = get_env_u64(env, "REQUEST_TIMEOUT_SECS")? {
        config.storage.request_timeout_secs = Some(val);
    }
    if let Some(user) = get_env_string(env, "USERNAME") {
        config.storage.username = Some(user);
    }
    if let Some(password) = get_env_string(env, "PASSWORD") {
        config.storage.password = Some(password);
    }

    // Ingestion
    if let Some(val) = get_env_usize(env, "BATCH_SIZE")? {
        config.ingest.batch_size = val;
    }
    if let Some(val) = get_env_u32(env, "SHARD_COUNT")? {
        config.ingest.shard_count = val;
    }
    if let Some(strategy) = get_env_string(env, "SHARD_STRATEGY") {
        config.ingest.shard_strategy = strategy
            .parse::<ShardStrategy>()
            .context("Invalid LOGFANOUT_SHARD_STRATEGY value")?;
    }
    if let Some(val) = get_env_usize(env, "LINES_PER_CALL")? {
        config.ingest.lines_per_call = val;
    }
    if let Some(val) = get_env_usize(env, "WORKERS")? {
        config.ingest.workers = val;
    }
    if let Some(val) = get_env_usize(env, "QUEUE_DEPTH")? {
        config.ingest.queue_depth = val;
    }
    if let Some(val) = get_env_u8(env, "BY_ID_PRECISION")? {
        config.ingest.by_id_precision = val;
    }
    if let Some(val) = get_env_u8(env, "BY_DAY_PRECISION")? {
        config.ingest.by_day_precision = val;
    }

    // Logging
    if let Some(level) = get_env_string(env, "LOG_LEVEL") {
        config.logging.level = level;
    }
    if let Some(format) = get_env_string(env, "LOG_FORMAT") {
        config.logging.format = format
            .parse::<LogFormat>()
            .context("Invalid LOGFANOUT_LOG_FORMAT value")?;
    }

    Ok(())
}

/// Split a comma-separated host list, dropping empty entries.
pub fn split_hosts(hosts: &str) -> Vec<String> {
    hosts
        .split(',')
        .map(str::trim)
        .filter(|h| !h.is_empty())
        .map(str::to_string)
        .collect()
}

fn get_env_string<E: EnvSource>(env: &E, key: &str) -> Option<String> {
    env.get(key)
}

fn get_env_parsed<E, T>(env: &E, key: &str) -> Result<Option<T>>
where
    E: EnvSource,
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match get_env_string(env, key) {
        Some(val) => {
            let parsed = val
                .trim()
                .parse::<T>()
                .map_err(|e| anyhow!("Failed to parse {}{}: {}", ENV_PREFIX, key, e))?;
            Ok(Some(parsed))
        }
        None => Ok(None),
    }
}

fn get_env_usize<E: EnvSource>(env: &E, key: &str) -> Result<Option<usize>> {
    get_env_parsed(env, key)
}

fn get_env_u64<E: EnvSource>(env: &E, key: &str) -> Result<Option<u64>> {
    get_env_parsed(env, key)
}

fn get_env_u32<E: EnvSource>(env: &E, key: &str) -> Result<Option<u32>> {
    get_env_parsed(env, key)
}

fn get_env_u8<E: EnvSource>(env: &E, key: &str) -> Result<Option<u8>> {
    get_env_parsed(env, key)
}
