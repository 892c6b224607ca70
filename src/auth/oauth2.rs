//! OAuth2 handler
//!
//! Resolves a token from the injected storage on every call, refreshing it
//! through the token endpoint when it is inside the expiry margin. Also
//! carries the authorization-code handshake helpers.

use super::handlers::AuthHandler;
use super::storage::OAuth2TokenStorage;
use super::types::{AuthType, OAuth2Config, OAuth2Token, TokenResponse};
use crate::error::{Error, Result};
use crate::types::{payload_str, JsonValue, StringMap};
use async_trait::async_trait;
use reqwest::Client;
use std::fmt;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};
use url::Url;

const DEFAULT_STORAGE_KEY: &str = "default";

/// OAuth2 bearer authentication backed by external token storage
pub struct OAuth2Handler {
    config: OAuth2Config,
    storage: Arc<dyn OAuth2TokenStorage>,
    http_client: Client,
    /// Serialises refreshes so concurrent callers trigger one token request
    refresh_lock: Mutex<()>,
}

impl OAuth2Handler {
    /// Create a handler with its own HTTP client
    pub fn new(config: OAuth2Config, storage: Arc<dyn OAuth2TokenStorage>) -> Self {
        Self::with_client(config, storage, Client::new())
    }

    /// Create a handler with a custom HTTP client
    pub fn with_client(
        config: OAuth2Config,
        storage: Arc<dyn OAuth2TokenStorage>,
        http_client: Client,
    ) -> Self {
        Self {
            config,
            storage,
            http_client,
            refresh_lock: Mutex::new(()),
        }
    }

    /// The client registration
    pub fn config(&self) -> &OAuth2Config {
        &self.config
    }

    fn storage_key(auth: &JsonValue) -> &str {
        payload_str(auth, "storageKey").unwrap_or(DEFAULT_STORAGE_KEY)
    }

    /// Build the authorization URL for the initial handshake
    pub fn authorization_url(&self, state: Option<&str>) -> Result<String> {
        let mut url = Url::parse(&self.config.authorization_url)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.config.client_id)
                .append_pair("redirect_uri", &self.config.redirect_uri);
            if !self.config.scopes.is_empty() {
                query.append_pair("scope", &self.config.scopes.join(" "));
            }
            if let Some(state) = state {
                query.append_pair("state", state);
            }
            let mut extra: Vec<_> = self.config.additional_params.iter().collect();
            extra.sort();
            for (key, value) in extra {
                query.append_pair(key, value);
            }
        }
        Ok(url.into())
    }

    /// Exchange an authorization code for a token. The token is returned,
    /// not stored; the host decides where it lives.
    pub async fn exchange_code_for_token(
        &self,
        code: &str,
        state: Option<&str>,
    ) -> Result<OAuth2Token> {
        let mut form = vec![
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", self.config.redirect_uri.as_str()),
        ];
        if let Some(state) = state {
            form.push(("state", state));
        }

        let response = self.post_token_request(&form).await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::auth(format!(
                "Token exchange failed: {} - {body}",
                status.canonical_reason().unwrap_or(status.as_str())
            )));
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::auth(format!("Invalid token response: {e}")))?;
        Ok(token_response.into_token(None))
    }

    async fn post_token_request(&self, form: &[(&str, &str)]) -> Result<reqwest::Response> {
        self.http_client
            .post(&self.config.token_url)
            .basic_auth(&self.config.client_id, Some(&self.config.client_secret))
            .form(form)
            .send()
            .await
            .map_err(|e| Error::auth(format!("Token endpoint unreachable: {e}")))
    }

    /// Refresh the token stored under `storage_key` and persist the result
    async fn refresh_stored(&self, storage_key: &str) -> Result<OAuth2Token> {
        let stored = self.storage.get_token(storage_key).await?;
        let Some(refresh_token) = stored.and_then(|t| t.refresh_token) else {
            return Err(Error::auth("No refresh token available"));
        };

        debug!("Refreshing OAuth2 token for key '{}'", storage_key);
        let response = self
            .post_token_request(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ])
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            warn!("OAuth2 token refresh failed with status {}", status.as_u16());
            return Err(Error::Auth {
                message: format!(
                    "Token refresh failed: {}",
                    status.canonical_reason().unwrap_or(status.as_str())
                ),
                api_response: response.json().await.ok(),
            });
        }

        let token_response: TokenResponse = response
            .json()
            .await
            .map_err(|e| Error::auth(format!("Invalid token response: {e}")))?;
        let token = token_response.into_token(Some(refresh_token));
        self.storage.save_token(storage_key, token.clone()).await?;
        Ok(token)
    }

    /// Get a valid token, refreshing if necessary
    async fn valid_token(&self, storage_key: &str) -> Result<OAuth2Token> {
        let token = self
            .storage
            .get_token(storage_key)
            .await?
            .ok_or_else(|| Error::auth("No valid OAuth2 token available"))?;
        if !token.is_expired() {
            return Ok(token);
        }

        let _guard = self.refresh_lock.lock().await;

        // Another task may have refreshed while we waited
        let token = self
            .storage
            .get_token(storage_key)
            .await?
            .ok_or_else(|| Error::auth("No valid OAuth2 token available"))?;
        if !token.is_expired() {
            return Ok(token);
        }
        if token.refresh_token.is_none() {
            return Err(Error::auth("OAuth2 token expired and no refresh token is available"));
        }

        self.refresh_stored(storage_key).await
    }
}

impl fmt::Debug for OAuth2Handler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OAuth2Handler")
            .field("client_id", &self.config.client_id)
            .field("token_url", &self.config.token_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl AuthHandler for OAuth2Handler {
    fn auth_type(&self) -> AuthType {
        AuthType::Oauth2
    }

    async fn authenticate(&self, mut headers: StringMap, auth: &JsonValue) -> Result<StringMap> {
        let token = self.valid_token(Self::storage_key(auth)).await?;
        headers.insert("Authorization".to_string(), token.authorization_value());
        Ok(headers)
    }

    fn validate_auth(&self, auth: &JsonValue) -> bool {
        payload_str(auth, "storageKey").is_some() || payload_str(auth, "access_token").is_some()
    }

    async fn refresh_token(&self, auth: &JsonValue) -> Result<OAuth2Token> {
        let _guard = self.refresh_lock.lock().await;
        self.refresh_stored(Self::storage_key(auth)).await
    }
}
