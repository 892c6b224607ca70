//! Credential-applying handlers
//!
//! Every handler either returns augmented headers or fails with
//! [`Error::Auth`]; headers are never returned unchanged on failure.

use super::custom::CustomAuthMethod;
use super::types::{
    ApiKeyPlacement, AuthType, EnhancedApiKeyConfig, OAuth2Token, PlacedApiKey,
};
use crate::error::{Error, Result};
use crate::types::{payload_str, JsonValue, StringMap};
use async_trait::async_trait;
use base64::Engine as _;
use std::fmt;
use std::sync::Arc;

const DEFAULT_KEY_FIELD: &str = "apiKey";
const DEFAULT_KEY_HEADER: &str = "X-API-Key";
const DEFAULT_KEY_PARAM: &str = "api_key";

/// Pluggable credential application for one authentication scheme
#[async_trait]
pub trait AuthHandler: Send + Sync + fmt::Debug {
    /// Scheme implemented by this handler
    fn auth_type(&self) -> AuthType;

    /// Apply credentials from `auth` to `headers`
    async fn authenticate(&self, headers: StringMap, auth: &JsonValue) -> Result<StringMap>;

    /// Shape check of the credential payload; performs no I/O
    fn validate_auth(&self, auth: &JsonValue) -> bool;

    /// Obtain a fresh token for schemes that support it
    async fn refresh_token(&self, _auth: &JsonValue) -> Result<OAuth2Token> {
        Err(Error::auth(format!(
            "{} auth does not support token refresh",
            self.auth_type()
        )))
    }

    /// API key destined for the query string or body rather than a header
    fn api_key_for_placement(&self, _auth: &JsonValue) -> Option<PlacedApiKey> {
        None
    }
}

// ============================================================================
// Basic
// ============================================================================

/// HTTP Basic authentication from `{username, password}`
#[derive(Debug, Clone, Default)]
pub struct BasicAuthHandler;

impl BasicAuthHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuthHandler for BasicAuthHandler {
    fn auth_type(&self) -> AuthType {
        AuthType::BasicAuth
    }

    async fn authenticate(&self, mut headers: StringMap, auth: &JsonValue) -> Result<StringMap> {
        let (Some(username), Some(password)) =
            (payload_str(auth, "username"), payload_str(auth, "password"))
        else {
            return Err(Error::auth(
                "Username and password are required for basic auth",
            ));
        };

        let encoded =
            base64::engine::general_purpose::STANDARD.encode(format!("{username}:{password}"));
        headers.insert("Authorization".to_string(), format!("Basic {encoded}"));
        Ok(headers)
    }

    fn validate_auth(&self, auth: &JsonValue) -> bool {
        auth.get("username").is_some_and(JsonValue::is_string)
            && auth.get("password").is_some_and(JsonValue::is_string)
    }
}

// ============================================================================
// API Key
// ============================================================================

/// API key in a fixed header
#[derive(Debug, Clone)]
pub struct ApiKeyHandler {
    key_field: String,
    header_name: String,
}

impl ApiKeyHandler {
    /// Create a handler reading `key_field` from the payload into `header_name`
    pub fn new(key_field: Option<String>, header_name: Option<String>) -> Self {
        Self {
            key_field: key_field.unwrap_or_else(|| DEFAULT_KEY_FIELD.to_string()),
            header_name: header_name.unwrap_or_else(|| DEFAULT_KEY_HEADER.to_string()),
        }
    }
}

impl Default for ApiKeyHandler {
    fn default() -> Self {
        Self::new(None, None)
    }
}

#[async_trait]
impl AuthHandler for ApiKeyHandler {
    fn auth_type(&self) -> AuthType {
        AuthType::ApiKey
    }

    async fn authenticate(&self, mut headers: StringMap, auth: &JsonValue) -> Result<StringMap> {
        let key = payload_str(auth, &self.key_field).ok_or_else(|| {
            Error::auth(format!("{} is required for API key auth", self.key_field))
        })?;
        headers.insert(self.header_name.clone(), key.to_string());
        Ok(headers)
    }

    fn validate_auth(&self, auth: &JsonValue) -> bool {
        auth.get(&self.key_field).is_some_and(JsonValue::is_string)
    }
}

/// API key with header, query, or body placement and an optional prefix.
///
/// Header placement mutates headers directly. Query and body placement
/// cannot be expressed through headers; the API client asks
/// [`AuthHandler::api_key_for_placement`] and applies the key itself.
#[derive(Debug, Clone, Default)]
pub struct EnhancedApiKeyHandler {
    config: EnhancedApiKeyConfig,
}

impl EnhancedApiKeyHandler {
    pub fn new(config: EnhancedApiKeyConfig) -> Self {
        Self { config }
    }

    fn key_field(&self) -> &str {
        self.config.key_field.as_deref().unwrap_or(DEFAULT_KEY_FIELD)
    }

    fn final_key(&self, auth: &JsonValue) -> Option<String> {
        let key = payload_str(auth, self.key_field())?;
        Some(match &self.config.prefix {
            Some(prefix) => format!("{prefix}{key}"),
            None => key.to_string(),
        })
    }
}

#[async_trait]
impl AuthHandler for EnhancedApiKeyHandler {
    fn auth_type(&self) -> AuthType {
        AuthType::ApiKey
    }

    async fn authenticate(&self, mut headers: StringMap, auth: &JsonValue) -> Result<StringMap> {
        let key = self.final_key(auth).ok_or_else(|| {
            Error::auth(format!("{} is required for API key auth", self.key_field()))
        })?;

        if self.config.placement == ApiKeyPlacement::Header {
            let header = self
                .config
                .header_name
                .clone()
                .unwrap_or_else(|| DEFAULT_KEY_HEADER.to_string());
            headers.insert(header, key);
        }
        Ok(headers)
    }

    fn validate_auth(&self, auth: &JsonValue) -> bool {
        auth.get(self.key_field()).is_some_and(JsonValue::is_string)
    }

    fn api_key_for_placement(&self, auth: &JsonValue) -> Option<PlacedApiKey> {
        let name = match self.config.placement {
            ApiKeyPlacement::Header => return None,
            ApiKeyPlacement::Query => self.config.query_param.as_deref(),
            ApiKeyPlacement::Body => self.config.body_field.as_deref(),
        };
        Some(PlacedApiKey {
            placement: self.config.placement,
            name: name.unwrap_or(DEFAULT_KEY_PARAM).to_string(),
            value: self.final_key(auth)?,
        })
    }
}

// ============================================================================
// Bearer
// ============================================================================

/// Static bearer token from `{token}`
#[derive(Debug, Clone, Default)]
pub struct BearerTokenHandler;

impl BearerTokenHandler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuthHandler for BearerTokenHandler {
    fn auth_type(&self) -> AuthType {
        AuthType::BearerToken
    }

    async fn authenticate(&self, mut headers: StringMap, auth: &JsonValue) -> Result<StringMap> {
        let token =
            payload_str(auth, "token").ok_or_else(|| Error::auth("Bearer token is required"))?;
        headers.insert("Authorization".to_string(), format!("Bearer {token}"));
        Ok(headers)
    }

    fn validate_auth(&self, auth: &JsonValue) -> bool {
        auth.get("token").is_some_and(JsonValue::is_string)
    }
}

// ============================================================================
// Custom
// ============================================================================

/// Delegates to a registered [`CustomAuthMethod`]; the payload is the
/// method's own config and is validated before every call.
#[derive(Debug, Clone)]
pub struct CustomAuthHandler {
    method: Arc<dyn CustomAuthMethod>,
}

impl CustomAuthHandler {
    pub fn new(method: Arc<dyn CustomAuthMethod>) -> Self {
        Self { method }
    }

    /// The wrapped method
    pub fn method(&self) -> &Arc<dyn CustomAuthMethod> {
        &self.method
    }

    /// Sign `data` with the method's signing function
    pub fn sign(&self, data: &str, auth: &JsonValue) -> Result<String> {
        self.method.sign(data, auth)
    }
}

#[async_trait]
impl AuthHandler for CustomAuthHandler {
    fn auth_type(&self) -> AuthType {
        AuthType::Custom
    }

    async fn authenticate(&self, headers: StringMap, auth: &JsonValue) -> Result<StringMap> {
        self.method.validate_config(auth).map_err(|e| {
            Error::auth(format!(
                "Invalid configuration for {} authentication: {e}",
                self.method.name()
            ))
        })?;
        self.method
            .authenticate(headers, auth)
            .map_err(|e| match e {
                Error::Auth { .. } => e,
                other => Error::auth(format!(
                    "{} authentication failed: {other}",
                    self.method.name()
                )),
            })
    }

    fn validate_auth(&self, auth: &JsonValue) -> bool {
        self.method.validate_config(auth).is_ok()
    }
}
