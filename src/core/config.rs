//! Runtime configuration loaded from `partbin.toml`.
//!
//! Precedence, lowest first: built-in defaults, the TOML file, the
//! `PARTBIN_DB` environment variable, then command-line overrides.

use crate::core::error::PartbinError;
use crate::core::schemas;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE_NAME: &str = "partbin.toml";
pub const DB_ENV_VAR: &str = "PARTBIN_DB";
pub const DEFAULT_LOW_STOCK_THRESHOLD: i64 = 5;

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub database: DatabaseConfig,
    pub audit: AuditConfig,
    pub reports: ReportsConfig,
    pub shell: ShellConfig,
    pub log: LogConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AuditConfig {
    pub enabled: bool,
    /// Defaults to `<db stem>.events.jsonl` next to the database.
    pub path: Option<PathBuf>,
    pub actor: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportsConfig {
    pub low_stock_threshold: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ShellConfig {
    pub prompt: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LogConfig {
    pub level: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(schemas::DEFAULT_DB_NAME),
        }
    }
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            path: None,
            actor: "partbin".to_string(),
        }
    }
}

impl Default for ReportsConfig {
    fn default() -> Self {
        Self {
            low_stock_threshold: DEFAULT_LOW_STOCK_THRESHOLD,
        }
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            prompt: ">>> ".to_string(),
        }
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "warn".to_string(),
        }
    }
}

impl Config {
    /// Where audit events go, or `None` when auditing is switched off.
    pub fn audit_log_path(&self) -> Option<PathBuf> {
        if !self.audit.enabled {
            return None;
        }
        Some(
            self.audit
                .path
                .clone()
                .unwrap_or_else(|| self.database.path.with_extension("events.jsonl")),
        )
    }
}

pub fn parse_config(content: &str) -> Result<Config, PartbinError> {
    let config: Config =
        toml::from_str(content).map_err(|e| PartbinError::ConfigError(e.to_string()))?;
    if config.reports.low_stock_threshold < 0 {
        return Err(PartbinError::ConfigError(format!(
            "reports.low_stock_threshold must be >= 0, got {}",
            config.reports.low_stock_threshold
        )));
    }
    Ok(config)
}

/// Load config from an explicit path, or from `partbin.toml` in `cwd` if present.
///
/// An explicit path that is missing is an error; a missing implicit file is not.
pub fn load_config(explicit: Option<&Path>, cwd: &Path) -> Result<Config, PartbinError> {
    let mut config = match explicit {
        Some(path) => {
            if !path.is_file() {
                return Err(PartbinError::ConfigError(format!(
                    "config file not found: {}",
                    path.display()
                )));
            }
            parse_config(&fs::read_to_string(path)?)?
        }
        None => {
            let implicit = cwd.join(CONFIG_FILE_NAME);
            if implicit.is_file() {
                parse_config(&fs::read_to_string(&implicit)?)?
            } else {
                Config::default()
            }
        }
    };

    if let Ok(db) = std::env::var(DB_ENV_VAR) {
        if !db.trim().is_empty() {
            config.database.path = PathBuf::from(db);
        }
    }
    Ok(config)
}
