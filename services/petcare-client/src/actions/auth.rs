//! Session and account actions

use tracing::{debug, error, info};

use super::PetCare;
use crate::error::{PetCareError, Result};
use crate::store::Action;
use crate::types::{ProfileUpdate, User};

impl PetCare {
    /// Log in, then open the live channel
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        self.store.dispatch(Action::AuthRequest).await;
        match self.api.login(email, password).await {
            Ok(user) => {
                info!("Logged in as {}", user.email);
                self.store.dispatch(Action::AuthSuccess(user.clone())).await;
                self.connect_live().await;
                Ok(user)
            }
            Err(e) => self.fail(e, "Login failed", Action::AuthFailure).await,
        }
    }

    /// Create an account, then open the live channel
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User> {
        self.store.dispatch(Action::AuthRequest).await;
        match self.api.register(name, email, password).await {
            Ok(user) => {
                info!("Registered {}", user.email);
                self.store.dispatch(Action::AuthSuccess(user.clone())).await;
                self.connect_live().await;
                Ok(user)
            }
            Err(e) => self.fail(e, "Registration failed", Action::AuthFailure).await,
        }
    }

    /// End the session
    ///
    /// Tokens are cleared and the auth slice reset whether or not the server
    /// acknowledged the logout.
    pub async fn logout(&self) -> Result<()> {
        let result = self.api.logout().await;
        if let Err(e) = &result {
            error!("Logout error: {}", e);
        }
        self.live.disconnect().await;
        self.store.dispatch(Action::Logout).await;
        result
    }

    /// Validate the stored token
    ///
    /// Returns `Ok(None)` without a network call when no token is stored.
    /// Any failure resets the auth slice.
    pub async fn check_auth_state(&self) -> Result<Option<User>> {
        let token = match self.api.tokens().token().await {
            Ok(token) => token,
            Err(e) => {
                self.store.dispatch(Action::Logout).await;
                return Err(e);
            }
        };
        if token.is_none() {
            debug!("No stored token, skipping verification");
            self.store.dispatch(Action::Logout).await;
            return Ok(None);
        }

        self.store.dispatch(Action::AuthRequest).await;
        match self.api.verify_token().await {
            Ok(user) => {
                self.store.dispatch(Action::AuthSuccess(user.clone())).await;
                self.connect_live().await;
                Ok(Some(user))
            }
            Err(e) => {
                error!("Auth state check error: {}", e);
                self.store.dispatch(Action::Logout).await;
                Err(e)
            }
        }
    }

    /// Like [`check_auth_state`](Self::check_auth_state) but a missing token is an error
    pub async fn require_user(&self) -> Result<User> {
        self.check_auth_state()
            .await?
            .ok_or(PetCareError::Unauthorized)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User> {
        self.store.dispatch(Action::AuthRequest).await;
        match self.api.update_profile(update).await {
            Ok(user) => {
                self.store.dispatch(Action::ProfileUpdated(user.clone())).await;
                Ok(user)
            }
            Err(e) => self.fail(e, "Profile update failed", Action::AuthFailure).await,
        }
    }

    pub async fn change_password(&self, current_password: &str, new_password: &str) -> Result<()> {
        self.store.dispatch(Action::AuthRequest).await;
        match self.api.change_password(current_password, new_password).await {
            Ok(()) => {
                self.store.dispatch(Action::PasswordChanged).await;
                Ok(())
            }
            Err(e) => self.fail(e, "Password change failed", Action::AuthFailure).await,
        }
    }

    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        self.store.dispatch(Action::AuthRequest).await;
        match self.api.forgot_password(email).await {
            Ok(()) => {
                self.store.dispatch(Action::PasswordResetRequested).await;
                Ok(())
            }
            Err(e) => {
                self.fail(e, "Failed to send reset instructions", Action::AuthFailure)
                    .await
            }
        }
    }
}
