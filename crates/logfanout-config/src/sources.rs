// Configuration source loading.
//
// Priority order:
// 1. Environment variables (LOGFANOUT_* prefix)
// 2. Config file path from LOGFANOUT_CONFIG
// 3. Inline config content from LOGFANOUT_CONFIG_CONTENT
// 4. Default config files (./config.toml, ./.logfanout.toml)
// 5. Built-in defaults

use crate::env_overrides::{self, EnvSource, ENV_PREFIX};
use crate::RuntimeConfig;
use anyhow::{Context, Result};
use std::env;
use std::path::Path;

const DEFAULT_CONFIG_FILES: [&str; 2] = ["./config.toml", "./.logfanout.toml"];

/// Load configuration using the process environment and default file locations.
pub fn load_config() -> Result<RuntimeConfig> {
    let mut config = RuntimeConfig::default();

    if let Some(file_config) = load_from_file()? {
        config.merge(file_config);
    }

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;
    config.validate()?;
    Ok(config)
}

pub(crate) fn parse_toml(content: &str, origin: &str) -> Result<RuntimeConfig> {
    toml::from_str(content).with_context(|| format!("Failed to parse {}", origin))
}

fn read_file(path: &Path) -> Result<RuntimeConfig> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_toml(&content, &format!("config file: {}", path.display()))
}

fn load_from_file() -> Result<Option<RuntimeConfig>> {
    if let Ok(path) = env::var(format!("{}CONFIG", ENV_PREFIX)) {
        return read_file(Path::new(&path)).map(Some);
    }

    if let Ok(content) = env::var(format!("{}CONFIG_CONTENT", ENV_PREFIX)) {
        return parse_toml(&content, "inline config from LOGFANOUT_CONFIG_CONTENT").map(Some);
    }

    for path in DEFAULT_CONFIG_FILES {
        let path = Path::new(path);
        if path.exists() {
            return read_file(path).map(Some);
        }
    }

    Ok(None)
}

/// Load configuration from a specific file path (for CLI --config flag).
/// Returns error if file doesn't exist or can't be parsed.
pub fn load_from_file_path(path: impl AsRef<Path>) -> Result<RuntimeConfig> {
    load_from_file_path_with_env(path, &StdEnvSource)
}

pub(crate) fn load_from_file_path_with_env<E: EnvSource>(
    path: impl AsRef<Path>,
    env: &E,
) -> Result<RuntimeConfig> {
    let mut config = RuntimeConfig::default();
    config.merge(read_file(path.as_ref())?);

    env_overrides::apply_env_overrides(&mut config, env)?;

    config.validate()?;
    Ok(config)
}

/// Load configuration with graceful fallback to defaults.
pub fn load_or_default() -> Result<RuntimeConfig> {
    let mut config = RuntimeConfig::default();

    match load_from_file() {
        Ok(Some(file_config)) => config.merge(file_config),
        Ok(None) => {}
        Err(e) => tracing::warn!(error = %e, "Ignoring unreadable config file, using defaults"),
    }

    env_overrides::apply_env_overrides(&mut config, &StdEnvSource)?;

    config.validate()?;
    Ok(config)
}

struct StdEnvSource;

impl EnvSource for StdEnvSource {
    fn get(&self, key: &str) -> Option<String> {
        env::var(format!("{}{}", ENV_PREFIX, key)).ok()
    }
}
