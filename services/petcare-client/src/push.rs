//! Push notification registration

use async_trait::async_trait;
use tracing::{info, warn};

use crate::config::PushConfig;
use crate::error::{PetCareError, Result};
use crate::storage::{keys, KeyValueStore};

/// Token stored when the provider cannot issue one
pub const DEVELOPMENT_TOKEN: &str = "development-token";

/// Source of push device tokens
#[async_trait]
pub trait PushProvider: Send + Sync {
    /// Provider name used in log output
    fn type_name(&self) -> &str;

    /// Ask for permission to deliver notifications
    async fn request_permission(&self) -> Result<bool>;

    /// Issue a device token
    async fn device_token(&self) -> Result<String>;
}

/// Provider backed by a token from the configuration file
#[derive(Debug, Clone, Default)]
pub struct ConfiguredPushProvider {
    token: Option<String>,
}

impl ConfiguredPushProvider {
    pub fn new(config: &PushConfig) -> Self {
        Self {
            token: config.device_token.clone(),
        }
    }
}

#[async_trait]
impl PushProvider for ConfiguredPushProvider {
    fn type_name(&self) -> &str {
        "configured"
    }

    async fn request_permission(&self) -> Result<bool> {
        Ok(true)
    }

    async fn device_token(&self) -> Result<String> {
        self.token
            .clone()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PetCareError::Config("No push device token configured".to_string()))
    }
}

/// Obtain a device token and persist it as `pushToken`
///
/// Returns `Ok(None)` when permission is refused. A provider that grants
/// permission but cannot issue a token yields [`DEVELOPMENT_TOKEN`].
pub async fn register_for_push(
    provider: &dyn PushProvider,
    store: &dyn KeyValueStore,
) -> Result<Option<String>> {
    if !provider.request_permission().await? {
        warn!("Permission for {} notifications not granted", provider.type_name());
        return Ok(None);
    }

    let token = match provider.device_token().await {
        Ok(token) => token,
        Err(e) => {
            warn!("Push token not available ({}), using development token", e);
            DEVELOPMENT_TOKEN.to_string()
        }
    };

    store.set(keys::PUSH_TOKEN, &token).await?;
    info!("Push notification token: {}", token);
    Ok(Some(token))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[tokio::test]
    async fn stores_provider_token() {
        let provider = ConfiguredPushProvider::new(&PushConfig {
            device_token: Some("ExponentPushToken[abc]".to_string()),
        });
        let store = MemoryStore::new();

        let token = register_for_push(&provider, &store).await.unwrap();
        assert_eq!(token.as_deref(), Some("ExponentPushToken[abc]"));
        assert_eq!(
            store.get(keys::PUSH_TOKEN).await.unwrap().as_deref(),
            Some("ExponentPushToken[abc]")
        );
    }

    #[tokio::test]
    async fn falls_back_to_development_token() {
        let provider = ConfiguredPushProvider::default();
        let store = MemoryStore::new();

        let token = register_for_push(&provider, &store).await.unwrap();
        assert_eq!(token.as_deref(), Some(DEVELOPMENT_TOKEN));
        assert_eq!(
            store.get(keys::PUSH_TOKEN).await.unwrap().as_deref(),
            Some(DEVELOPMENT_TOKEN)
        );
    }

    struct DenyingProvider;

    #[async_trait]
    impl PushProvider for DenyingProvider {
        fn type_name(&self) -> &str {
            "denying"
        }

        async fn request_permission(&self) -> Result<bool> {
            Ok(false)
        }

        async fn device_token(&self) -> Result<String> {
            panic!("token requested without permission")
        }
    }

    #[tokio::test]
    async fn refused_permission_stores_nothing() {
        let store = MemoryStore::new();
        assert_eq!(register_for_push(&DenyingProvider, &store).await.unwrap(), None);
        assert_eq!(store.get(keys::PUSH_TOKEN).await.unwrap(), None);
    }
}
