//! Daftar configuration system.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DaftarError, Result};

/// Root configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DaftarConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

impl Default for DaftarConfig {
    fn default() -> Self {
        Self {
            store: StoreConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

impl DaftarConfig {
    /// Load config from the default path (~/.daftar/config.toml).
    pub fn load() -> Result<Self> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load config from a specific path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| DaftarError::Config(format!("Failed to read config: {e}")))?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| DaftarError::Config(format!("Failed to parse config: {e}")))?;
        Ok(config)
    }

    /// Save config to the default path.
    pub fn save(&self) -> Result<()> {
        let path = Self::default_path();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)
            .map_err(|e| DaftarError::Config(format!("Failed to serialize config: {e}")))?;
        std::fs::write(&path, content)?;
        Ok(())
    }

    /// Get the default config path.
    pub fn default_path() -> PathBuf {
        Self::home_dir().join("config.toml")
    }

    /// Get the Daftar home directory.
    pub fn home_dir() -> PathBuf {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".daftar")
    }
}

/// Document store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    DaftarConfig::home_dir().join("daftar.db")
}

/// Reminder scheduler configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    #[serde(default = "bool_true")]
    pub enabled: bool,
    /// Seconds between sweeps over all outstanding debts.
    #[serde(default = "default_tick_secs")]
    pub tick_secs: u64,
    /// Seconds between `start()` retries when the store is unreachable.
    #[serde(default = "default_start_retry_secs")]
    pub start_retry_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: bool_true(),
            tick_secs: default_tick_secs(),
            start_retry_secs: default_start_retry_secs(),
        }
    }
}

fn bool_true() -> bool {
    true
}

fn default_tick_secs() -> u64 {
    300
}

fn default_start_retry_secs() -> u64 {
    30
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_sane() {
        let config = DaftarConfig::default();
        assert!(config.scheduler.enabled);
        assert_eq!(config.scheduler.tick_secs, 300);
        assert!(config.store.db_path.ends_with("daftar.db"));
    }

    #[test]
    fn partial_toml_fills_defaults() {
        let config: DaftarConfig = toml::from_str("[scheduler]\ntick_secs = 60\n").unwrap();
        assert_eq!(config.scheduler.tick_secs, 60);
        assert!(config.scheduler.enabled);
        assert_eq!(config.scheduler.start_retry_secs, 30);
    }
}
