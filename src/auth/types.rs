//! Auth configuration types
//!
//! `AuthConfig` is the declarative, serialisable description of a handler.
//! The per-call credential payload is deliberately not part of it: callers
//! pass that as opaque JSON on each request.

use crate::types::{now_millis, StringMap};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Authentication scheme implemented by a handler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthType {
    Oauth2,
    ApiKey,
    BasicAuth,
    BearerToken,
    Custom,
}

impl fmt::Display for AuthType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AuthType::Oauth2 => "oauth2",
            AuthType::ApiKey => "api_key",
            AuthType::BasicAuth => "basic_auth",
            AuthType::BearerToken => "bearer_token",
            AuthType::Custom => "custom",
        };
        f.write_str(s)
    }
}

/// Location for API key placement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiKeyPlacement {
    /// Place in HTTP header
    #[default]
    Header,
    /// Place in query parameter
    Query,
    /// Place in JSON request body
    Body,
}

/// An API key resolved for query or body placement
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlacedApiKey {
    /// Where the key goes
    pub placement: ApiKeyPlacement,
    /// Query parameter or body field name
    pub name: String,
    /// Key value, prefix included
    pub value: String,
}

/// Settings for the placement-aware API key handler
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancedApiKeyConfig {
    /// Payload field holding the key (default `apiKey`)
    #[serde(default)]
    pub key_field: Option<String>,
    /// Where to place the key
    #[serde(default)]
    pub placement: ApiKeyPlacement,
    /// Header name for header placement (default `X-API-Key`)
    #[serde(default)]
    pub header_name: Option<String>,
    /// Query parameter name for query placement (default `api_key`)
    #[serde(default)]
    pub query_param: Option<String>,
    /// Body field name for body placement (default `api_key`)
    #[serde(default)]
    pub body_field: Option<String>,
    /// Prefix prepended to the key value
    #[serde(default)]
    pub prefix: Option<String>,
}

/// OAuth2 client registration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Config {
    pub client_id: String,
    pub client_secret: String,
    pub authorization_url: String,
    pub token_url: String,
    pub redirect_uri: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    /// Extra parameters appended to the authorization URL
    #[serde(default)]
    pub additional_params: StringMap,
}

/// Scheme-tagged handler description consumed by `AuthFactory`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum AuthConfig {
    /// HTTP Basic authentication
    BasicAuth,

    /// API key in a fixed header
    ApiKey {
        #[serde(default)]
        key_field: Option<String>,
        #[serde(default)]
        header_name: Option<String>,
    },

    /// API key with header, query, or body placement
    EnhancedApiKey(EnhancedApiKeyConfig),

    /// Bearer token authentication
    BearerToken,

    /// OAuth2 with an externally stored token
    Oauth2 {
        #[serde(default)]
        oauth2_config: Option<OAuth2Config>,
    },

    /// A registered custom signing method
    Custom {
        #[serde(default)]
        method_name: Option<String>,
    },
}

/// OAuth2 token as persisted by the token storage collaborator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OAuth2Token {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default = "default_token_type")]
    pub token_type: String,
    /// Lifetime in seconds as reported by the token endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    /// Absolute expiry in epoch milliseconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_at: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

fn default_token_type() -> String {
    "Bearer".to_string()
}

/// Refresh this long before the recorded expiry
pub const TOKEN_REFRESH_MARGIN_MS: i64 = 60_000;

impl OAuth2Token {
    /// Create a bearer token with no expiry information
    pub fn bearer(access_token: impl Into<String>) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: None,
            token_type: default_token_type(),
            expires_in: None,
            expires_at: None,
            scope: None,
        }
    }

    /// Set the refresh token
    #[must_use]
    pub fn with_refresh_token(mut self, refresh_token: impl Into<String>) -> Self {
        self.refresh_token = Some(refresh_token.into());
        self
    }

    /// Set the lifetime, deriving `expires_at` from the current time
    #[must_use]
    pub fn expiring_in(mut self, seconds: i64) -> Self {
        self.expires_in = Some(seconds);
        self.expires_at = Some(now_millis() + seconds * 1000);
        self
    }

    /// Check if the token is expired or inside the refresh margin.
    /// Tokens without expiry information never expire.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(now_millis())
    }

    /// Expiry check against an explicit epoch-millisecond instant
    pub fn is_expired_at(&self, now_ms: i64) -> bool {
        match self.expires_at {
            Some(expires_at) => now_ms >= expires_at - TOKEN_REFRESH_MARGIN_MS,
            None => false,
        }
    }

    /// Value for the `Authorization` header
    pub fn authorization_value(&self) -> String {
        format!("{} {}", self.token_type, self.access_token)
    }
}

/// Token endpoint response body (RFC 6749 section 5.1)
#[derive(Debug, Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub scope: Option<String>,
}

impl TokenResponse {
    /// Convert to a stored token, keeping `fallback_refresh` when the
    /// endpoint did not rotate the refresh token
    pub fn into_token(self, fallback_refresh: Option<String>) -> OAuth2Token {
        OAuth2Token {
            access_token: self.access_token,
            refresh_token: self.refresh_token.or(fallback_refresh),
            token_type: self.token_type.unwrap_or_else(default_token_type),
            expires_in: self.expires_in,
            expires_at: self.expires_in.map(|secs| now_millis() + secs * 1000),
            scope: self.scope,
        }
    }
}
