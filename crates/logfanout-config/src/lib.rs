// logfanout-config - Configuration for the ingestion writer and CLI
//
// Supports configuration from multiple sources:
// 1. Environment variables (highest priority)
// 2. Config file path from LOGFANOUT_CONFIG env var
// 3. Config file contents from LOGFANOUT_CONFIG_CONTENT env var
// 4. Default config file locations (./config.toml, ./.logfanout.toml)
// 5. Built-in defaults (lowest priority)
//
// CLI flags are applied on top by the binary.

use anyhow::Result;
use logfanout_core::{DatePrecision, BATCH_SIZE, SHARD_COUNT};
use serde::{Deserialize, Serialize};
use std::time::Duration;

mod env_overrides;
mod sources;
mod validation;

pub use env_overrides::{split_hosts, EnvSource, ENV_PREFIX};

/// Table for the by-day view. Not configurable.
pub const BY_DAY_TABLE: &str = "nginx.t_nginx_log_by_day";

/// Main runtime configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub ingest: IngestConfig,

    #[serde(default)]
    pub logging: LogConfig,
}

/// Storage cluster configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Contact points, `host` or `host:port`
    pub contact_points: Vec<String>,
    /// Fully qualified table for the by-id view
    pub by_id_table: String,
    pub connect_timeout_secs: u64,
    /// Per-call timeout for execute/batch; unset means wait indefinitely
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_timeout_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            contact_points: vec!["127.0.0.1:9042".to_string()],
            by_id_table: "nginx.t_nginx_log_by_id".to_string(),
            connect_timeout_secs: 5,
            request_timeout_secs: None,
            username: None,
            password: None,
        }
    }
}

impl StorageConfig {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn request_timeout(&self) -> Option<Duration> {
        self.request_timeout_secs.map(Duration::from_secs)
    }
}

/// How by-day rows are spread across shards
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShardStrategy {
    /// One random shard per batch
    #[default]
    PerBatch,
    /// Next shard per record, cycling through all shards
    RoundRobin,
}

impl std::fmt::Display for ShardStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ShardStrategy::PerBatch => write!(f, "per_batch"),
            ShardStrategy::RoundRobin => write!(f, "round_robin"),
        }
    }
}

impl std::str::FromStr for ShardStrategy {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "per_batch" | "batch" | "random" => Ok(ShardStrategy::PerBatch),
            "round_robin" | "record" => Ok(ShardStrategy::RoundRobin),
            _ => anyhow::bail!(
                "Unsupported shard strategy: {}. Supported: per_batch, round_robin",
                s
            ),
        }
    }
}

/// Ingestion behaviour
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    pub batch_size: usize,
    pub shard_count: u32,
    pub shard_strategy: ShardStrategy,
    /// Logdate precision level (1..=6) for the by-id view
    pub by_id_precision: u8,
    /// Logdate precision level (1..=6) for the by-day view
    pub by_day_precision: u8,
    /// Lines handed to one `insert_log_batch` call by the CLI
    pub lines_per_call: usize,
    /// Number of pool workers, each with its own session
    pub workers: usize,
    /// Pending calls buffered per worker before submit waits
    pub queue_depth: usize,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            batch_size: BATCH_SIZE,
            shard_count: SHARD_COUNT,
            shard_strategy: ShardStrategy::PerBatch,
            by_id_precision: DatePrecision::Day.level(),
            by_day_precision: DatePrecision::DayKey.level(),
            lines_per_call: 10_000,
            workers: 1,
            queue_depth: 4,
        }
    }
}

impl IngestConfig {
    pub fn by_id_precision(&self) -> Option<DatePrecision> {
        DatePrecision::from_level(self.by_id_precision)
    }

    pub fn by_day_precision(&self) -> Option<DatePrecision> {
        DatePrecision::from_level(self.by_day_precision)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::Text,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

impl std::str::FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "text" => Ok(LogFormat::Text),
            "json" => Ok(LogFormat::Json),
            _ => anyhow::bail!("Unsupported log format: {}. Supported: text, json", s),
        }
    }
}

impl RuntimeConfig {
    /// Load configuration from all sources with priority
    pub fn load() -> Result<Self> {
        sources::load_config()
    }

    /// Load configuration from a specific file path (for CLI usage).
    pub fn load_from_path(path: impl AsRef<std::path::Path>) -> Result<Self> {
        sources::load_from_file_path(path)
    }

    /// Load configuration with graceful fallback to defaults.
    /// Does not fail if config file is missing.
    pub fn load_or_default() -> Result<Self> {
        sources::load_or_default()
    }

    /// Merge another config into this one (used for TOML layering).
    pub fn merge(&mut self, other: RuntimeConfig) {
        self.storage = other.storage;
        self.ingest = other.ingest;
        self.logging = other.logging;
    }

    /// Apply environment overrides from a custom source.
    pub fn apply_env_overrides_from<E: EnvSource>(&mut self, env: &E) -> Result<()> {
        env_overrides::apply_env_overrides(self, env)
    }

    /// Build a configuration from inline TOML plus overrides from an `EnvSource`.
    pub fn load_with_env<E: EnvSource>(inline_config: Option<&str>, env: &E) -> Result<Self> {
        let mut config = RuntimeConfig::default();

        if let Some(inline) = inline_config {
            config.merge(sources::parse_toml(inline, "inline config content")?);
        }

        config.apply_env_overrides_from(env)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        validation::validate_config(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shard_strategy_from_str() {
        assert_eq!(
            "per_batch".parse::<ShardStrategy>().unwrap(),
            ShardStrategy::PerBatch
        );
        assert_eq!(
            "round-robin".parse::<ShardStrategy>().unwrap(),
            ShardStrategy::RoundRobin
        );
        assert_eq!(
            "RANDOM".parse::<ShardStrategy>().unwrap(),
            ShardStrategy::PerBatch
        );
        assert!("hash".parse::<ShardStrategy>().is_err());
    }

    #[test]
    fn test_default_configs() {
        let config = RuntimeConfig::default();
        assert_eq!(config.ingest.batch_size, 200);
        assert_eq!(config.ingest.shard_count, 12);
        assert_eq!(config.ingest.by_id_precision(), Some(DatePrecision::Day));
        assert_eq!(config.ingest.by_day_precision(), Some(DatePrecision::DayKey));
        assert_eq!(config.storage.by_id_table, "nginx.t_nginx_log_by_id");
        assert_eq!(config.logging.format, LogFormat::Text);
        assert!(config.storage.request_timeout().is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config: RuntimeConfig = toml::from_str(
            r#"
            [storage]
            contact_points = ["10.0.0.1", "10.0.0.2"]

            [ingest]
            shard_strategy = "round_robin"
            "#,
        )
        .unwrap();

        assert_eq!(config.storage.contact_points.len(), 2);
        assert_eq!(config.storage.by_id_table, "nginx.t_nginx_log_by_id");
        assert_eq!(config.ingest.shard_strategy, ShardStrategy::RoundRobin);
        assert_eq!(config.ingest.batch_size, 200);
        assert_eq!(config.logging.level, "info");
    }
}
