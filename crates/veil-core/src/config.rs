//! Engine configuration loading and management.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Full configuration for a Veil engine instance.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct EngineConfig {
    /// Revocation registry settings.
    #[serde(default)]
    pub revocation: RevocationSettings,

    /// Logging settings.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// How a registry orders the timestamps of successive status lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimestampPolicy {
    /// Every update must carry a timestamp greater than the last one.
    #[default]
    Strict,
    /// Updates may repeat the last timestamp when they belong to the same
    /// publication batch. Timestamps still never go backwards.
    AllowEqual,
}

impl TimestampPolicy {
    /// Whether an update at `next` may follow a snapshot at `last`.
    pub fn permits(&self, last: u64, next: u64) -> bool {
        match self {
            Self::Strict => next > last,
            Self::AllowEqual => next >= last,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RevocationSettings {
    /// Ordering rule for status-list timestamps.
    #[serde(default)]
    pub timestamp_policy: TimestampPolicy,
    /// Whether new registries start with every index active.
    #[serde(default = "default_true")]
    pub issuance_by_default: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Log format (text, json).
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_true() -> bool {
    true
}
fn default_log_level() -> String {
    "info".into()
}
fn default_log_format() -> String {
    "text".into()
}

impl Default for RevocationSettings {
    fn default() -> Self {
        Self {
            timestamp_policy: TimestampPolicy::default(),
            issuance_by_default: default_true(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl EngineConfig {
    /// Load config from a TOML file, falling back to defaults for missing fields.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            let contents = std::fs::read_to_string(path)?;
            let config: EngineConfig = toml::from_str(&contents)?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Save the current config to a TOML file.
    pub fn save(&self, path: &Path) -> anyhow::Result<()> {
        let contents = toml::to_string_pretty(self)?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, contents)?;
        Ok(())
    }
}
