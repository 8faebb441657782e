//! Authentication endpoints

use tracing::{debug, error};

use super::{endpoints, ApiClient};
use crate::error::Result;
use crate::http::Method;
use crate::types::{AuthResponse, ProfileUpdate, User, UserEnvelope};

impl ApiClient {
    /// Log in and persist both tokens
    pub async fn login(&self, email: &str, password: &str) -> Result<User> {
        let body = serde_json::json!({ "email": email, "password": password });
        let auth: AuthResponse = self
            .request_json(Method::Post, endpoints::LOGIN, &[], Some(body))
            .await?;
        self.tokens
            .save_tokens(&auth.token, &auth.refresh_token)
            .await?;
        debug!("Logged in as {}", auth.user.email);
        Ok(auth.user)
    }

    /// Create an account and persist both tokens
    pub async fn register(&self, name: &str, email: &str, password: &str) -> Result<User> {
        let body = serde_json::json!({ "name": name, "email": email, "password": password });
        let auth: AuthResponse = self
            .request_json(Method::Post, endpoints::REGISTER, &[], Some(body))
            .await?;
        self.tokens
            .save_tokens(&auth.token, &auth.refresh_token)
            .await?;
        debug!("Registered {}", auth.user.email);
        Ok(auth.user)
    }

    /// Notify the server (when a token is held) and always clear local tokens
    pub async fn logout(&self) -> Result<()> {
        let has_token = matches!(self.tokens.token().await, Ok(Some(_)));
        if has_token {
            match self.request(Method::Post, endpoints::LOGOUT, &[], None).await {
                Ok(_) => debug!("API logout successful"),
                Err(e) => error!("API logout error: {}", e),
            }
        }
        self.tokens.clear_tokens().await?;
        debug!("Logout complete, tokens cleared");
        Ok(())
    }

    pub async fn forgot_password(&self, email: &str) -> Result<()> {
        let body = serde_json::json!({ "email": email });
        self.request(Method::Post, endpoints::FORGOT_PASSWORD, &[], Some(body))
            .await?;
        Ok(())
    }

    /// Validate the stored token and return its user
    pub async fn verify_token(&self) -> Result<User> {
        let envelope: UserEnvelope = self
            .request_json(Method::Get, endpoints::VERIFY, &[], None)
            .await?;
        Ok(envelope.user)
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User> {
        let body = serde_json::to_value(update)?;
        let envelope: UserEnvelope = self
            .request_json(Method::Put, endpoints::PROFILE, &[], Some(body))
            .await?;
        Ok(envelope.user)
    }

    pub async fn change_password(&self, current_password: &str, new_password: &str) -> Result<()> {
        let body = serde_json::json!({
            "currentPassword": current_password,
            "newPassword": new_password,
        });
        self.request(Method::Put, endpoints::CHANGE_PASSWORD, &[], Some(body))
            .await?;
        Ok(())
    }
}
