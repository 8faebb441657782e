//! Request/success/failure actions over the REST client and live channel
//!
//! Every operation marks its slice as loading, performs one call, and then
//! either stores the result or records a user-facing error string in the
//! slice's `error` field. The original error is returned to the caller.

mod auth;
mod control;
mod notifications;
mod schedules;
mod sensors;

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, error};

pub use control::{dual_dispatch, DeliveryPath};

use crate::api::ApiClient;
use crate::config::Config;
use crate::error::{PetCareError, Result};
use crate::http::ReqwestHttpClient;
use crate::live::LiveClient;
use crate::storage::{FileStore, KeyValueStore, TokenStore};
use crate::store::{Action, Store};

/// Client facade tying together REST, the live channel and shared state
pub struct PetCare {
    api: ApiClient,
    live: LiveClient,
    store: Store,
}

impl PetCare {
    /// Assemble from already constructed parts
    ///
    /// `live` must have been built with the same `store`.
    pub fn new(api: ApiClient, live: LiveClient, store: Store) -> Self {
        Self { api, live, store }
    }

    /// Build the production stack: reqwest, WebSocket and a JSON file store
    pub fn from_config(config: &Config) -> Result<Self> {
        let http = ReqwestHttpClient::new(Duration::from_secs(config.api.request_timeout_seconds))?;
        let kv: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(&config.storage.path));
        debug!("Using storage file {}", config.storage.path.display());

        let store = Store::new();
        let api = ApiClient::new(&config.api, Arc::new(http), TokenStore::new(kv));
        let live = LiveClient::new(config.live.clone(), store.clone());
        Ok(Self::new(api, live, store))
    }

    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    pub fn live(&self) -> &LiveClient {
        &self.live
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    /// Underlying key/value storage
    pub fn kv(&self) -> &Arc<dyn KeyValueStore> {
        self.api.tokens().inner()
    }

    /// Open the live channel with the stored credentials
    ///
    /// Failures are logged only; reconnection carries on in the background.
    pub async fn connect_live(&self) {
        let credentials = Arc::new(self.api.tokens().clone());
        if let Err(e) = self.live.connect(credentials).await {
            error!("Live channel unavailable: {}", e);
        }
    }

    /// Record `err` in the store via `action` and hand it back
    async fn fail<T>(
        &self,
        err: PetCareError,
        fallback: &str,
        action: impl FnOnce(String) -> Action,
    ) -> Result<T> {
        let message = err.user_message(fallback);
        error!("{}: {}", fallback, err);
        self.store.dispatch(action(message)).await;
        Err(err)
    }
}
