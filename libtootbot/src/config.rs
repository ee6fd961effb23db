//! Configuration management for Tootbot
//!
//! The configuration file is optional. Every field has a default so a bare
//! `tootbot --operation toot ...` works without one.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{ConfigError, Result};

pub const DEFAULT_GATEWAY_URL: &str = "https://nitter.net";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub gateway: GatewayConfig,
    #[serde(default)]
    pub storage: StorageConfig,
}

/// Feed gateway exposing `/{handle}/rss` and `/pic/...` picture URLs
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GatewayConfig {
    #[serde(default = "default_gateway_url")]
    pub url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Directory holding the credential files
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    /// Ledger database path, defaults to `{data_dir}/tootbot.db`
    #[serde(default)]
    pub database: Option<String>,
}

fn default_gateway_url() -> String {
    DEFAULT_GATEWAY_URL.to_string()
}

fn default_data_dir() -> String {
    "~/.local/share/tootbot".to_string()
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            url: default_gateway_url(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            database: None,
        }
    }
}

impl GatewayConfig {
    /// Gateway URL without a trailing slash
    pub fn base_url(&self) -> &str {
        self.url.trim_end_matches('/')
    }
}

impl StorageConfig {
    pub fn data_path(&self) -> PathBuf {
        PathBuf::from(shellexpand::tilde(&self.data_dir).to_string())
    }

    pub fn database_path(&self) -> PathBuf {
        match &self.database {
            Some(path) => PathBuf::from(shellexpand::tilde(path).to_string()),
            None => self.data_path().join("tootbot.db"),
        }
    }
}

impl Config {
    /// Load configuration from the default location
    ///
    /// A missing file yields the default configuration; an unreadable or
    /// malformed one is an error.
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            tracing::debug!("No config file at {:?}, using defaults", config_path);
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        let config: Config = toml::from_str(&content).map_err(ConfigError::ParseError)?;
        Ok(config)
    }

    /// Explicit credential file locations for an `(instance, username)` pair
    pub fn credential_paths(&self, instance: &str, username: &str) -> CredentialPaths {
        CredentialPaths::in_dir(&self.storage.data_path(), instance, username)
    }
}

/// Locations of the two credential files for one account on one instance
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CredentialPaths {
    /// Application registration, scoped to the instance
    pub app: PathBuf,
    /// Account access token, scoped to the account
    pub account: PathBuf,
}

impl CredentialPaths {
    pub fn in_dir(dir: &Path, instance: &str, username: &str) -> Self {
        Self {
            app: dir.join(format!("{}.secret", instance)),
            account: dir.join(format!("{}.secret", username)),
        }
    }
}

/// Normalize an instance name into an API base URL
pub fn instance_base_url(instance: &str) -> String {
    if instance.starts_with("http://") || instance.starts_with("https://") {
        instance.trim_end_matches('/').to_string()
    } else {
        format!("https://{}", instance.trim_end_matches('/'))
    }
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("TOOTBOT_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("tootbot").join("config.toml"))
}
