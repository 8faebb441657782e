//! First-launch and auto-login flags

use tracing::{debug, error};

use crate::actions::PetCare;
use crate::error::Result;
use crate::storage::{keys, KeyValueStore};
use crate::store::Action;
use crate::types::User;

/// Outcome of start-up checks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Startup {
    pub first_launch: bool,
    pub user: Option<User>,
}

/// Record that the client has run; returns `true` only the first time
///
/// A storage error reads as "not first launch".
pub async fn check_first_launch(store: &dyn KeyValueStore) -> bool {
    match store.get(keys::ALREADY_LAUNCHED).await {
        Ok(Some(_)) => false,
        Ok(None) => {
            if let Err(e) = store.set(keys::ALREADY_LAUNCHED, "true").await {
                error!("Error recording first launch: {}", e);
            }
            true
        }
        Err(e) => {
            error!("Error checking first launch: {}", e);
            false
        }
    }
}

pub async fn auto_login_enabled(store: &dyn KeyValueStore) -> Result<bool> {
    Ok(store.get(keys::AUTO_LOGIN).await?.as_deref() == Some("true"))
}

pub async fn set_auto_login(store: &dyn KeyValueStore, enabled: bool) -> Result<()> {
    let value = if enabled { "true" } else { "false" };
    store.set(keys::AUTO_LOGIN, value).await
}

impl PetCare {
    /// Start-up sequence
    ///
    /// The stored session is only resumed when auto-login is enabled;
    /// otherwise the auth slice is reset.
    pub async fn startup(&self) -> Startup {
        let first_launch = check_first_launch(self.kv().as_ref()).await;

        let user = match auto_login_enabled(self.kv().as_ref()).await {
            Ok(true) => match self.check_auth_state().await {
                Ok(user) => user,
                Err(e) => {
                    error!("Error checking auth state: {}", e);
                    None
                }
            },
            Ok(false) => {
                debug!("Auto-login disabled");
                self.store().dispatch(Action::Logout).await;
                None
            }
            Err(e) => {
                error!("Error reading auto-login flag: {}", e);
                None
            }
        };

        Startup { first_launch, user }
    }
}
