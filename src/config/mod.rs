//! Configuration management for canonid
//!
//! Settings are read from a TOML file (by default
//! `~/.config/canonid/config.toml`), then overridden by `CANONID_SECTION__KEY`
//! environment variables, then validated as a whole.

use crate::error::{CanonError, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

mod validator;

pub use validator::ConfigValidator;

/// Schema version written by `config init` and accepted on load
pub const SCHEMA_VERSION: &str = "1.0.0";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(rename = "_meta")]
    pub meta: MetaConfig,
    pub storage: StorageConfig,
    #[serde(default)]
    pub resolution: ResolutionConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Metadata about the configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetaConfig {
    pub schema_version: String,
    #[serde(default = "current_timestamp")]
    pub created_at: String,
    #[serde(default = "current_timestamp")]
    pub last_modified: String,
}

fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Which [`Store`](crate::storage::Store) implementation backs the resolver
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StorageBackend {
    Sqlite,
    Memory,
}

/// Storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub database_path: PathBuf,
    pub pool_size: u32,
    pub busy_timeout_ms: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Sqlite,
            database_path: PathBuf::from("~/.canonid/canonid.db"),
            pool_size: 8,
            busy_timeout_ms: 5000,
        }
    }
}

/// How a later import treats mutable descriptive fields of an existing record
///
/// Absent incoming values never erase stored ones under either policy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MutableFieldPolicy {
    /// Present incoming values replace stored ones
    #[default]
    LastWriteWins,
    /// Incoming values only fill fields that are still absent
    FirstWriteWins,
}

impl std::str::FromStr for MutableFieldPolicy {
    type Err = CanonError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "last_write_wins" => Ok(MutableFieldPolicy::LastWriteWins),
            "first_write_wins" => Ok(MutableFieldPolicy::FirstWriteWins),
            other => Err(CanonError::InvalidConfigValue {
                path: "resolution.mutable_field_policy".to_string(),
                message: format!(
                    "expected 'last_write_wins' or 'first_write_wins', got '{}'",
                    other
                ),
            }),
        }
    }
}

/// Resolution protocol configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResolutionConfig {
    /// Retry a create that lost a race as a single lookup
    pub retry_on_conflict: bool,
    pub mutable_field_policy: MutableFieldPolicy,
}

impl Default for ResolutionConfig {
    fn default() -> Self {
        Self {
            retry_on_conflict: true,
            mutable_field_policy: MutableFieldPolicy::default(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// `tracing-subscriber` filter directive; `RUST_LOG` takes precedence
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "canonid=info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(CanonError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = std::fs::read_to_string(path).map_err(|e| CanonError::Io {
            source: e,
            context: format!("Failed to read config file: {:?}", path),
        })?;
        let mut config: Config = toml::from_str(&content)?;

        config.apply_env_overrides();
        ConfigValidator::validate(&config)?;

        Ok(config)
    }

    /// Save configuration to a file
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content).map_err(|e| CanonError::Io {
            source: e,
            context: format!("Failed to write config file: {:?}", path),
        })?;
        Ok(())
    }

    /// Apply environment variable overrides
    /// Environment variables in format: CANONID_SECTION__KEY=value
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(std::env::vars());
    }

    /// Apply `CANONID_`-prefixed overrides from an arbitrary variable list
    pub fn apply_overrides<I>(&mut self, vars: I)
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            if let Some(config_key) = key.strip_prefix("CANONID_") {
                if let Err(e) = self.set_value_from_env(config_key, &value) {
                    tracing::warn!("Failed to apply env override {}: {}", key, e);
                }
            }
        }
    }

    fn set_value_from_env(&mut self, path: &str, value: &str) -> Result<()> {
        match path {
            "STORAGE__BACKEND" => {
                self.storage.backend = match value.to_ascii_lowercase().as_str() {
                    "sqlite" => StorageBackend::Sqlite,
                    "memory" => StorageBackend::Memory,
                    _ => {
                        return Err(CanonError::InvalidConfigValue {
                            path: path.to_string(),
                            message: format!("Unknown storage backend '{}'", value),
                        })
                    }
                };
            }
            "STORAGE__DATABASE_PATH" => {
                self.storage.database_path = PathBuf::from(value);
            }
            "STORAGE__POOL_SIZE" => {
                self.storage.pool_size = parse_value(path, value)?;
            }
            "STORAGE__BUSY_TIMEOUT_MS" => {
                self.storage.busy_timeout_ms = parse_value(path, value)?;
            }
            "RESOLUTION__RETRY_ON_CONFLICT" => {
                self.resolution.retry_on_conflict = parse_value(path, value)?;
            }
            "RESOLUTION__MUTABLE_FIELD_POLICY" => {
                self.resolution.mutable_field_policy = value.parse()?;
            }
            "LOGGING__FILTER" => {
                self.logging.filter = value.to_string();
            }
            _ => {
                tracing::debug!("Unknown env config key: {}", path);
            }
        }
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir()
            .ok_or_else(|| CanonError::Config("Cannot determine config directory".to_string()))?;

        Ok(config_dir.join("canonid").join("config.toml"))
    }

    /// Database path with a leading `~/` expanded
    pub fn database_path(&self) -> Result<PathBuf> {
        expand_path(&self.storage.database_path)
    }
}

fn parse_value<T: std::str::FromStr>(path: &str, value: &str) -> Result<T> {
    value.parse().map_err(|_| CanonError::InvalidConfigValue {
        path: path.to_string(),
        message: format!("Cannot parse '{}'", value),
    })
}

/// Expand a leading `~/` to the home directory
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let path_str = path
        .to_str()
        .ok_or_else(|| CanonError::Config("Invalid path encoding".to_string()))?;

    if let Some(stripped) = path_str.strip_prefix("~/") {
        let home = dirs::home_dir()
            .ok_or_else(|| CanonError::Config("Cannot determine home directory".to_string()))?;
        Ok(home.join(stripped))
    } else {
        Ok(path.to_path_buf())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            meta: MetaConfig {
                schema_version: SCHEMA_VERSION.to_string(),
                created_at: current_timestamp(),
                last_modified: current_timestamp(),
            },
            storage: StorageConfig::default(),
            resolution: ResolutionConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}
