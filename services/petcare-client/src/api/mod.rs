//! REST client for the pet-care backend
//!
//! Every request carries the stored bearer token. A 401 triggers a single
//! token refresh and retry; if the refresh fails both tokens are dropped and
//! the original rejection is returned.

mod auth;
mod control;
mod notifications;
mod schedules;
mod sensors;

use std::sync::Arc;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::config::ApiConfig;
use crate::error::{PetCareError, Result};
use crate::http::{HttpClient, HttpRequest, HttpResponse, Method};
use crate::storage::TokenStore;

/// Endpoint paths relative to the API base URL
pub mod endpoints {
    pub const LOGIN: &str = "/auth/login";
    pub const REGISTER: &str = "/auth/register";
    pub const FORGOT_PASSWORD: &str = "/auth/forgot-password";
    pub const REFRESH_TOKEN: &str = "/auth/refresh-token";
    pub const LOGOUT: &str = "/auth/logout";
    pub const VERIFY: &str = "/auth/verify";
    pub const PROFILE: &str = "/auth/profile";
    pub const CHANGE_PASSWORD: &str = "/auth/change-password";
    pub const SENSORS: &str = "/sensors";
    pub const SENSOR_HISTORY: &str = "/sensors/history";
    pub const SCHEDULES: &str = "/schedules";
    pub const NOTIFICATIONS: &str = "/notifications";
}

/// `collection` followed by `segments`, each percent-encoded as one path
/// segment so ids cannot add or remove path components
pub(crate) fn resource_path(collection: &str, segments: &[&str]) -> Result<String> {
    let mut url = reqwest::Url::parse("http://backend")
        .and_then(|base| base.join(collection))
        .map_err(|e| PetCareError::Config(format!("Invalid endpoint {}: {}", collection, e)))?;
    url.path_segments_mut()
        .map_err(|_| PetCareError::Config(format!("Invalid endpoint {}", collection)))?
        .extend(segments);
    Ok(url.path().to_string())
}

/// Error body returned by the backend on rejection
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RefreshResponse {
    token: String,
}

/// REST client bound to one backend
pub struct ApiClient {
    base_url: String,
    http: Arc<dyn HttpClient>,
    tokens: TokenStore,
}

impl ApiClient {
    pub fn new(config: &ApiConfig, http: Arc<dyn HttpClient>, tokens: TokenStore) -> Self {
        Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            http,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenStore {
        &self.tokens
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Send an authenticated request and return the successful response
    pub(crate) async fn request(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<HttpResponse> {
        let mut request = HttpRequest::new(method, self.url(path));
        request.query = query
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect();
        request.body = body;
        request.bearer = self.tokens.token().await.unwrap_or_else(|e| {
            error!("Error retrieving token for request: {}", e);
            None
        });

        let response = self.http.send(request.clone()).await?;
        if response.status != 401 || path == endpoints::REFRESH_TOKEN {
            return check_status(response);
        }

        debug!("{} {} returned 401, attempting token refresh", method, path);
        match self.refresh_access_token().await {
            Ok(Some(token)) => {
                request.bearer = Some(token);
                check_status(self.http.send(request).await?)
            }
            Ok(None) => check_status(response),
            Err(e) => {
                error!("Token refresh failed: {}", e);
                if let Err(e) = self.tokens.clear_tokens().await {
                    warn!("Failed to clear tokens after refresh failure: {}", e);
                }
                check_status(response)
            }
        }
    }

    /// Send an authenticated request and decode the JSON body
    pub(crate) async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        query: &[(&str, String)],
        body: Option<serde_json::Value>,
    ) -> Result<T> {
        let response = self.request(method, path, query, body).await?;
        Ok(serde_json::from_str(&response.body)?)
    }

    /// Exchange the stored refresh token for a new access token
    ///
    /// Returns `Ok(None)` when no refresh token is stored.
    async fn refresh_access_token(&self) -> Result<Option<String>> {
        let Some(refresh_token) = self.tokens.refresh_token().await? else {
            return Ok(None);
        };

        let mut request = HttpRequest::new(Method::Post, self.url(endpoints::REFRESH_TOKEN));
        request.body = Some(serde_json::json!({ "refreshToken": refresh_token }));
        let response = check_status(self.http.send(request).await?)?;
        let RefreshResponse { token } = serde_json::from_str(&response.body)?;

        self.tokens.set_token(&token).await?;
        debug!("Access token refreshed");
        Ok(Some(token))
    }
}

/// Turn a non-2xx response into [`PetCareError::Api`]
fn check_status(response: HttpResponse) -> Result<HttpResponse> {
    if response.is_success() {
        return Ok(response);
    }
    let message = serde_json::from_str::<ErrorBody>(&response.body)
        .ok()
        .and_then(|body| body.message);
    Err(PetCareError::Api {
        status: response.status,
        message,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::MockHttpClient;
    use crate::storage::{KeyValueStore, MemoryStore};

    fn response(status: u16, body: &str) -> HttpResponse {
        HttpResponse {
            status,
            body: body.to_string(),
        }
    }

    async fn client_with(mock: MockHttpClient, token: Option<&str>, refresh: Option<&str>) -> ApiClient {
        let store = Arc::new(MemoryStore::new());
        if let Some(token) = token {
            store.set("userToken", token).await.unwrap();
        }
        if let Some(refresh) = refresh {
            store.set("refreshToken", refresh).await.unwrap();
        }
        let config = ApiConfig {
            base_url: "http://backend/api/".to_string(),
            ..Default::default()
        };
        ApiClient::new(&config, Arc::new(mock), TokenStore::new(store))
    }

    #[tokio::test]
    async fn request_attaches_bearer_and_base_url() {
        let mut mock = MockHttpClient::new();
        mock.expect_send()
            .withf(|req| {
                req.url == "http://backend/api/sensors"
                    && req.bearer.as_deref() == Some("abc")
                    && req.method == Method::Get
            })
            .times(1)
            .returning(|_| Box::pin(async { Ok(response(200, "{}")) }));

        let client = client_with(mock, Some("abc"), None).await;
        client
            .request(Method::Get, endpoints::SENSORS, &[], None)
            .await
            .unwrap();
    }

    #[test]
    fn resource_path_encodes_each_segment() {
        assert_eq!(
            resource_path(endpoints::SCHEDULES, &["s1", "toggle"]).unwrap(),
            "/schedules/s1/toggle"
        );
        assert_eq!(
            resource_path(endpoints::SCHEDULES, &["../auth/logout", "toggle"]).unwrap(),
            "/schedules/..%2Fauth%2Flogout/toggle"
        );
        assert_eq!(
            resource_path(endpoints::NOTIFICATIONS, &["a b?c#d", "read"]).unwrap(),
            "/notifications/a%20b%3Fc%23d/read"
        );
    }

    #[tokio::test]
    async fn request_without_token_sends_no_bearer() {
        let mut mock = MockHttpClient::new();
        mock.expect_send()
            .withf(|req| req.bearer.is_none())
            .times(1)
            .returning(|_| Box::pin(async { Ok(response(200, "{}")) }));

        let client = client_with(mock, None, None).await;
        client
            .request(Method::Post, endpoints::LOGIN, &[], None)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn rejection_carries_server_message() {
        let mut mock = MockHttpClient::new();
        mock.expect_send().returning(|_| {
            Box::pin(async { Ok(response(400, r#"{"message":"Amount out of range"}"#)) })
        });

        let client = client_with(mock, Some("abc"), None).await;
        let err = client
            .request(Method::Post, "/control/dispense-food", &[], None)
            .await
            .unwrap_err();
        assert_eq!(err.user_message("fallback"), "Amount out of range");
    }

    #[tokio::test]
    async fn unauthorized_refreshes_and_retries_once() {
        let mut mock = MockHttpClient::new();
        let mut seq = mockall::Sequence::new();
        mock.expect_send()
            .withf(|req| req.url.ends_with("/schedules") && req.bearer.as_deref() == Some("old"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Box::pin(async { Ok(response(401, r#"{"message":"expired"}"#)) }));
        mock.expect_send()
            .withf(|req| {
                req.url.ends_with("/auth/refresh-token")
                    && req.body == Some(serde_json::json!({"refreshToken": "refresh"}))
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Box::pin(async { Ok(response(200, r#"{"token":"new"}"#)) }));
        mock.expect_send()
            .withf(|req| req.url.ends_with("/schedules") && req.bearer.as_deref() == Some("new"))
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| Box::pin(async { Ok(response(200, r#"{"data":[]}"#)) }));

        let client = client_with(mock, Some("old"), Some("refresh")).await;
        client
            .request(Method::Get, endpoints::SCHEDULES, &[], None)
            .await
            .unwrap();
        assert_eq!(client.tokens().token().await.unwrap(), Some("new".to_string()));
    }

    #[tokio::test]
    async fn failed_refresh_clears_tokens_and_returns_original_error() {
        let mut mock = MockHttpClient::new();
        mock.expect_send()
            .withf(|req| req.url.ends_with("/notifications"))
            .times(1)
            .returning(|_| Box::pin(async { Ok(response(401, r#"{"message":"expired"}"#)) }));
        mock.expect_send()
            .withf(|req| req.url.ends_with("/auth/refresh-token"))
            .times(1)
            .returning(|_| Box::pin(async { Ok(response(403, "")) }));

        let client = client_with(mock, Some("old"), Some("refresh")).await;
        let err = client
            .request(Method::Get, endpoints::NOTIFICATIONS, &[], None)
            .await
            .unwrap_err();

        assert!(matches!(err, PetCareError::Api { status: 401, .. }));
        assert_eq!(client.tokens().token().await.unwrap(), None);
        assert_eq!(client.tokens().refresh_token().await.unwrap(), None);
    }

    #[tokio::test]
    async fn unauthorized_without_refresh_token_is_returned_as_is() {
        let mut mock = MockHttpClient::new();
        mock.expect_send()
            .times(1)
            .returning(|_| Box::pin(async { Ok(response(401, r#"{"message":"Invalid credentials"}"#)) }));

        let client = client_with(mock, None, None).await;
        let err = client
            .request(Method::Post, endpoints::LOGIN, &[], None)
            .await
            .unwrap_err();
        assert_eq!(err.user_message("Login failed"), "Invalid credentials");
    }
}
