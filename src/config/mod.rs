//! # Configuration Management Module
//!
//! TOML configuration for the mineclick engine and its CLI.
//!
//! ## Configuration Structure
//!
//! - [`GameRules`] (`[game]`) - Tunable numbers: exp per level, reward ranges, caps
//! - [`StorageConfig`] - Data directory, database path, optional catalog seed file
//! - [`LoggingConfig`] - Log level and optional log file
//! - [`SchedulerConfig`] - Boss reset sweep settings
//!
//! ## Usage
//!
//! ```rust,no_run
//! use mineclick::config::Config;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::load("config.toml").await?;
//!     config.validate()?;
//!     println!("exp per level: {}", config.game.exp_per_level);
//!     Ok(())
//! }
//! ```

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use tokio::fs;

use crate::game::{load_catalog_from_json, Catalog, GameRules};

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub game: GameRules,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub data_dir: String,
    /// Defaults to `<data_dir>/mine.db`.
    #[serde(default)]
    pub db_path: Option<String>,
    /// JSON catalog replacing the built-in tables.
    #[serde(default)]
    pub catalog_file: Option<String>,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: "./data".to_string(),
            db_path: None,
            catalog_file: None,
        }
    }
}

impl StorageConfig {
    pub fn db_path(&self) -> PathBuf {
        match &self.db_path {
            Some(path) => PathBuf::from(path),
            None => PathBuf::from(&self.data_dir).join("mine.db"),
        }
    }

    /// The configured catalog file, or the standard tables.
    pub fn load_catalog(&self) -> Result<Catalog> {
        match &self.catalog_file {
            Some(path) => load_catalog_from_json(path)
                .map_err(|e| anyhow!("Failed to load catalog {}: {}", path, e)),
            None => Ok(Catalog::standard()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            file: Some("mineclick.log".to_string()),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    pub enabled: bool,
    /// How often the gate is checked; the reset interval itself lives in `[game]`.
    pub check_interval_secs: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            check_interval_secs: 60,
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.game
            .validate()
            .map_err(|e| anyhow!("Invalid [game] section: {}", e))?;
        if self.storage.data_dir.trim().is_empty() {
            return Err(anyhow!("storage.data_dir must not be empty"));
        }
        if self.scheduler.enabled && self.scheduler.check_interval_secs == 0 {
            return Err(anyhow!("scheduler.check_interval_secs must be positive"));
        }
        Ok(())
    }
}
