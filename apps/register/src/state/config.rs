//! # Configuration State
//!
//! Register configuration loaded at startup.
//!
//! ## Configuration Sources (Priority Order)
//! 1. Environment variables (`TALLY_*`)
//! 2. Config file (`config.toml` in the platform config dir, or `TALLY_CONFIG`)
//! 3. Defaults (this file)
//!
//! ## Thread Safety
//! Configuration is read-only after initialization, so no mutex needed.

use std::path::{Path, PathBuf};

use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use tally_core::{DEFAULT_HISTORY_LIMIT, DEFAULT_LOW_STOCK_THRESHOLD};
use thiserror::Error;
use tracing::{debug, info};

const ENV_CONFIG_PATH: &str = "TALLY_CONFIG";
const ENV_DB_PATH: &str = "TALLY_DB_PATH";
const ENV_STORE_NAME: &str = "TALLY_STORE_NAME";
const ENV_LOW_STOCK_THRESHOLD: &str = "TALLY_LOW_STOCK_THRESHOLD";
const ENV_MAX_CONNECTIONS: &str = "TALLY_MAX_CONNECTIONS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Could not read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Invalid value for {key}: '{value}'")]
    InvalidValue { key: &'static str, value: String },

    #[error("Could not determine app data directory")]
    NoDataDir,
}

/// Register configuration.
///
/// Missing keys in `config.toml` fall back to the defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Store name (report header)
    pub store_name: String,

    /// Currency symbol (for display)
    pub currency_symbol: String,

    /// Number of decimal places for currency
    pub currency_decimals: u8,

    /// Database file. `None` means the platform data directory.
    pub database_path: Option<PathBuf>,

    pub max_connections: u32,

    /// Stock at or below this (and above zero) counts as low.
    pub low_stock_threshold: i64,

    /// Default number of ledger entries / recent sales returned.
    pub history_limit: u32,
}

impl Default for AppConfig {
    fn default() -> Self {
        AppConfig {
            store_name: "Tally Boutique".to_string(),
            currency_symbol: "$".to_string(),
            currency_decimals: 2,
            database_path: None,
            max_connections: 5,
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
            history_limit: DEFAULT_HISTORY_LIMIT,
        }
    }
}

impl AppConfig {
    /// Loads defaults, then the config file if present, then the environment.
    pub fn load() -> Result<Self, ConfigError> {
        let file = match std::env::var(ENV_CONFIG_PATH) {
            Ok(path) => Some(PathBuf::from(path)),
            Err(_) => project_dirs().map(|dirs| dirs.config_dir().join("config.toml")),
        };

        let mut config = match file {
            Some(path) if path.exists() => AppConfig::from_file(&path)?,
            _ => AppConfig::default(),
        };

        config.apply_env(|key| std::env::var(key).ok())?;
        info!(store = %config.store_name, "Configuration loaded");
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        debug!(?path, "Reading config file");
        let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        AppConfig::from_toml_str(&raw)
    }

    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(raw)?)
    }

    /// Applies `TALLY_*` overrides read through `lookup`.
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(ENV_DB_PATH) {
            self.database_path = Some(PathBuf::from(path));
        }

        if let Some(name) = lookup(ENV_STORE_NAME) {
            self.store_name = name;
        }

        if let Some(raw) = lookup(ENV_LOW_STOCK_THRESHOLD) {
            self.low_stock_threshold = raw
                .trim()
                .parse::<i64>()
                .ok()
                .filter(|t| *t >= 0)
                .ok_or(ConfigError::InvalidValue {
                    key: ENV_LOW_STOCK_THRESHOLD,
                    value: raw,
                })?;
        }

        if let Some(raw) = lookup(ENV_MAX_CONNECTIONS) {
            self.max_connections = raw
                .trim()
                .parse::<u32>()
                .ok()
                .filter(|n| *n > 0)
                .ok_or(ConfigError::InvalidValue {
                    key: ENV_MAX_CONNECTIONS,
                    value: raw,
                })?;
        }

        Ok(())
    }

    /// Database file path, defaulting to the platform data directory.
    ///
    /// ## Platform-Specific Paths
    /// - **macOS**: `~/Library/Application Support/com.tally.pos/tally.db`
    /// - **Windows**: `%APPDATA%\tally\pos\data\tally.db`
    /// - **Linux**: `~/.local/share/pos/tally.db`
    pub fn resolve_database_path(&self) -> Result<PathBuf, ConfigError> {
        if let Some(path) = &self.database_path {
            return Ok(path.clone());
        }

        let dirs = project_dirs().ok_or(ConfigError::NoDataDir)?;
        let data_dir = dirs.data_dir();
        std::fs::create_dir_all(data_dir).map_err(|source| ConfigError::Io {
            path: data_dir.to_path_buf(),
            source,
        })?;

        Ok(data_dir.join("tally.db"))
    }

    /// Formats a cent amount as a currency string.
    ///
    /// ## Example
    /// ```rust,ignore
    /// let config = AppConfig::default();
    /// assert_eq!(config.format_currency(1234), "$12.34");
    /// ```
    pub fn format_currency(&self, cents: i64) -> String {
        let divisor = 10_i64.pow(self.currency_decimals as u32);
        let whole = (cents / divisor).abs();
        let frac = (cents % divisor).abs();
        let sign = if cents < 0 { "-" } else { "" };

        if self.currency_decimals == 0 {
            format!("{}{}{}", sign, self.currency_symbol, whole)
        } else {
            format!(
                "{}{}{}.{:0width$}",
                sign,
                self.currency_symbol,
                whole,
                frac,
                width = self.currency_decimals as usize
            )
        }
    }
}

fn project_dirs() -> Option<ProjectDirs> {
    ProjectDirs::from("com", "tally", "pos")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_format_currency() {
        let config = AppConfig::default();
        assert_eq!(config.format_currency(1234), "$12.34");
        assert_eq!(config.format_currency(1), "$0.01");
        assert_eq!(config.format_currency(-1234), "-$12.34");
        assert_eq!(config.format_currency(-5), "-$0.05");

        let whole = AppConfig {
            currency_symbol: "¥".into(),
            currency_decimals: 0,
            ..AppConfig::default()
        };
        assert_eq!(whole.format_currency(1500), "¥1500");
    }

    #[test]
    fn test_toml_overrides_defaults() {
        let config = AppConfig::from_toml_str(
            r#"
            store_name = "Corner Shop"
            low_stock_threshold = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.store_name, "Corner Shop");
        assert_eq!(config.low_stock_threshold, 3);
        assert_eq!(config.history_limit, DEFAULT_HISTORY_LIMIT);
    }

    #[test]
    fn test_env_beats_file() {
        let mut config = AppConfig::from_toml_str("store_name = \"File\"").unwrap();
        config
            .apply_env(env(&[
                (ENV_STORE_NAME, "Env"),
                (ENV_LOW_STOCK_THRESHOLD, "4"),
                (ENV_DB_PATH, "/tmp/t.db"),
            ]))
            .unwrap();

        assert_eq!(config.store_name, "Env");
        assert_eq!(config.low_stock_threshold, 4);
        assert_eq!(config.resolve_database_path().unwrap(), PathBuf::from("/tmp/t.db"));
    }

    #[test]
    fn test_invalid_env_value_rejected() {
        let mut config = AppConfig::default();
        let err = config
            .apply_env(env(&[(ENV_MAX_CONNECTIONS, "zero")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { key: ENV_MAX_CONNECTIONS, .. }));

        let err = config
            .apply_env(env(&[(ENV_LOW_STOCK_THRESHOLD, "-1")]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidValue { .. }));
    }
}
