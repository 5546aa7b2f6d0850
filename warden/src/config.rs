//! Bot configuration: load/save of a JSON file under the user config dir.

use crate::error::{ConfigError, ConfigResult};
use crate::util::config_dir;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tracing::debug;

/// Top-level bot configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BotConfig {
    /// Command prefix (e.g. `!`).
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Org UTC offset in minutes east, attached to parsed schedules.
    #[serde(default)]
    pub org_offset_minutes: Option<i64>,
    /// Seconds between task reconciliation runs.
    #[serde(default = "default_sync_interval")]
    pub sync_interval_secs: u64,
    /// Task file override; defaults to `tasks.json` next to the config.
    #[serde(default)]
    pub tasks_file: Option<PathBuf>,
}

fn default_prefix() -> String {
    "!".to_string()
}

const fn default_sync_interval() -> u64 {
    10
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: default_prefix(),
            org_offset_minutes: None,
            sync_interval_secs: default_sync_interval(),
            tasks_file: None,
        }
    }
}

impl BotConfig {
    /// The task file this config points at.
    #[must_use]
    pub fn tasks_path(&self) -> PathBuf {
        self.tasks_file
            .clone()
            .unwrap_or_else(crate::util::tasks_path)
    }

    /// Sanity-check values that would break the scheduler loop.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.prefix.is_empty() {
            return Err(ConfigError::invalid("prefix must not be empty"));
        }
        if self.sync_interval_secs == 0 {
            return Err(ConfigError::invalid("sync_interval_secs must be positive"));
        }
        if let Some(offset) = self.org_offset_minutes {
            if !(-14 * 60..=14 * 60).contains(&offset) {
                return Err(ConfigError::invalid("org_offset_minutes out of range"));
            }
        }
        Ok(())
    }
}

/// Default config file path.
#[must_use]
pub fn config_path() -> PathBuf {
    config_dir().join("config.json")
}

/// Load the config file, falling back to defaults when it is missing.
pub async fn load_config() -> ConfigResult<BotConfig> {
    let path = config_path();
    if !path.exists() {
        debug!(path = %path.display(), "no config file, using defaults");
        return Ok(BotConfig::default());
    }
    let content = tokio::fs::read_to_string(&path).await?;
    let config: BotConfig = serde_json::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

/// Write the config file, creating the directory when needed.
pub async fn save_config(config: &BotConfig) -> ConfigResult<()> {
    config.validate()?;
    let path = config_path();
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent).await?;
    }
    let content = serde_json::to_string_pretty(config)?;
    tokio::fs::write(&path, content).await?;
    debug!(path = %path.display(), "config saved");
    Ok(())
}
