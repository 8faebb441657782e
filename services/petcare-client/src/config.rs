//! Configuration types for the pet-care client

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{PetCareError, Result};

/// Client configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub live: LiveConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub push: PushConfig,
}

/// REST API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u64,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout_seconds: default_request_timeout(),
        }
    }
}

/// Live channel settings
///
/// `url` is the socket.io server root; `http(s)` and `ws(s)` are accepted and
/// a bare host is served from `/socket.io/`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    #[serde(default = "default_live_url")]
    pub url: String,
    #[serde(default = "default_connection_timeout")]
    pub connection_timeout_seconds: u64,
    #[serde(default)]
    pub reconnect: ReconnectConfig,
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            url: default_live_url(),
            connection_timeout_seconds: default_connection_timeout(),
            reconnect: ReconnectConfig::default(),
        }
    }
}

/// Configuration for automatic reconnection of the live channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReconnectConfig {
    /// Enable automatic reconnection when the connection is lost
    #[serde(default = "default_reconnect_enabled")]
    pub enabled: bool,
    /// Fixed delay between reconnection attempts in seconds
    #[serde(default = "default_reconnect_interval")]
    pub interval_seconds: u64,
    /// Maximum number of reconnection attempts (None for unlimited)
    #[serde(default = "default_max_retries")]
    pub max_retries: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            enabled: default_reconnect_enabled(),
            interval_seconds: default_reconnect_interval(),
            max_retries: default_max_retries(),
        }
    }
}

/// Local key/value storage settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

/// Push notification settings
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PushConfig {
    /// Device token issued by the push provider, if already known
    #[serde(default)]
    pub device_token: Option<String>,
}

fn default_base_url() -> String {
    "https://apcs-backend.onrender.com/api".to_string()
}

fn default_request_timeout() -> u64 {
    10
}

fn default_live_url() -> String {
    "https://apcs-backend.onrender.com".to_string()
}

fn default_connection_timeout() -> u64 {
    10
}

fn default_reconnect_enabled() -> bool {
    true
}

fn default_reconnect_interval() -> u64 {
    1
}

fn default_max_retries() -> Option<u32> {
    Some(5)
}

fn default_storage_path() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("petcare")
        .join("storage.json")
}

/// Load configuration from a JSON file
pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path).map_err(|e| {
        PetCareError::Config(format!("Failed to read {}: {}", path.display(), e))
    })?;
    let config: Config = serde_json::from_str(&content)?;
    Ok(config)
}
