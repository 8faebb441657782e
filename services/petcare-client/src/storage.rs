//! Local persisted key/value state
//!
//! Tokens and launch flags are kept as plain string pairs in a single JSON
//! file. There is no schema versioning; unknown keys are preserved. Writes go
//! to a sibling temp file that is renamed over the original, and on unix the
//! file is readable by its owner only.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::debug;

use crate::error::{PetCareError, Result};

/// Storage keys
pub mod keys {
    pub const USER_TOKEN: &str = "userToken";
    pub const REFRESH_TOKEN: &str = "refreshToken";
    pub const PUSH_TOKEN: &str = "pushToken";
    pub const ALREADY_LAUNCHED: &str = "alreadyLaunched";
    pub const AUTO_LOGIN: &str = "autoLogin";
}

/// Trait for string key/value persistence
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `Ok(None)` when the key is absent
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value; removing an absent key is not an error
    async fn remove(&self, key: &str) -> Result<()>;
}

/// JSON-file implementation of [`KeyValueStore`]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_all(&self) -> Result<BTreeMap<String, String>> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(content) if content.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(content) => Ok(serde_json::from_str(&content)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(PetCareError::Storage(format!(
                "Failed to read {}: {}",
                self.path.display(),
                e
            ))),
        }
    }

    async fn write_all(&self, values: &BTreeMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await.map_err(|e| {
                    PetCareError::Storage(format!(
                        "Failed to create {}: {}",
                        parent.display(),
                        e
                    ))
                })?;
            }
        }
        let content = serde_json::to_string_pretty(values)?;
        let temp = self.temp_path();
        let write_error =
            |e: std::io::Error| PetCareError::Storage(format!("Failed to write {}: {}", temp.display(), e));

        let mut options = tokio::fs::OpenOptions::new();
        options.write(true).create(true).truncate(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(&temp).await.map_err(write_error)?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            // A leftover temp file keeps its old mode on open
            file.set_permissions(std::fs::Permissions::from_mode(0o600))
                .await
                .map_err(write_error)?;
        }
        file.write_all(content.as_bytes()).await.map_err(write_error)?;
        file.sync_all().await.map_err(write_error)?;
        drop(file);

        tokio::fs::rename(&temp, &self.path).await.map_err(|e| {
            PetCareError::Storage(format!("Failed to replace {}: {}", self.path.display(), e))
        })
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_all().await?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut values = self.read_all().await?;
        values.insert(key.to_string(), value.to_string());
        debug!("Stored key {} in {}", key, self.path.display());
        self.write_all(&values).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut values = self.read_all().await?;
        if values.remove(key).is_some() {
            debug!("Removed key {} from {}", key, self.path.display());
            self.write_all(&values).await?;
        }
        Ok(())
    }
}

/// In-memory implementation of [`KeyValueStore`]
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.values
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.values.lock().await.remove(key);
        Ok(())
    }
}

/// Source of the current bearer token
#[async_trait]
#[cfg_attr(test, mockall::automock)]
pub trait TokenProvider: Send + Sync {
    /// Current access token, if any
    async fn access_token(&self) -> Result<Option<String>>;
}

/// Typed access to the credentials kept in a [`KeyValueStore`]
#[derive(Clone)]
pub struct TokenStore {
    store: Arc<dyn KeyValueStore>,
}

impl TokenStore {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    pub fn inner(&self) -> &Arc<dyn KeyValueStore> {
        &self.store
    }

    pub async fn token(&self) -> Result<Option<String>> {
        self.store.get(keys::USER_TOKEN).await
    }

    pub async fn refresh_token(&self) -> Result<Option<String>> {
        self.store.get(keys::REFRESH_TOKEN).await
    }

    pub async fn set_token(&self, token: &str) -> Result<()> {
        self.store.set(keys::USER_TOKEN, token).await
    }

    pub async fn save_tokens(&self, token: &str, refresh_token: &str) -> Result<()> {
        self.store.set(keys::USER_TOKEN, token).await?;
        self.store.set(keys::REFRESH_TOKEN, refresh_token).await
    }

    /// Remove both tokens; the refresh token is removed even if the first removal fails
    pub async fn clear_tokens(&self) -> Result<()> {
        let first = self.store.remove(keys::USER_TOKEN).await;
        let second = self.store.remove(keys::REFRESH_TOKEN).await;
        first.and(second)
    }
}

#[async_trait]
impl TokenProvider for TokenStore {
    async fn access_token(&self) -> Result<Option<String>> {
        self.token().await
    }
}
