//! Authentication module
//!
//! Supports: Basic, API Key (header/query/body), Bearer, OAuth2, and custom
//! signing methods (AWS SigV4 style, HMAC, JWT).
//!
//! Handlers implement [`AuthHandler`]: they take the outgoing headers plus an
//! opaque per-call credential payload and return the augmented headers.
//! [`AuthFactory`] builds handlers from a declarative [`AuthConfig`] and owns
//! the custom method registry.

mod custom;
mod factory;
mod handlers;
mod oauth2;
mod storage;
mod types;

pub use custom::{
    hmac_hex, AwsSignatureV4Method, CustomAuthMethod, HashAlgorithm, HmacAuthMethod,
    JwtAuthMethod, JwtHmacAlgorithm,
};
pub use factory::{builtin_methods, AuthFactory};
pub use handlers::{
    ApiKeyHandler, AuthHandler, BasicAuthHandler, BearerTokenHandler, CustomAuthHandler,
    EnhancedApiKeyHandler,
};
pub use oauth2::OAuth2Handler;
pub use storage::{InMemoryTokenStorage, OAuth2TokenStorage};
pub use types::{
    ApiKeyPlacement, AuthConfig, AuthType, EnhancedApiKeyConfig, OAuth2Config, OAuth2Token,
    PlacedApiKey, TOKEN_REFRESH_MARGIN_MS,
};

#[cfg(test)]
mod tests;
