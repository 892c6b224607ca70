//! Handler construction and the custom method registry
//!
//! `AuthFactory` is built once at startup, populated with custom methods,
//! then shared by reference (`Arc<AuthFactory>`). Registration needs
//! `&mut self`, so the registry is read-only once it has been shared.

use super::custom::{AwsSignatureV4Method, CustomAuthMethod, HmacAuthMethod, JwtAuthMethod};
use super::handlers::{
    ApiKeyHandler, AuthHandler, BasicAuthHandler, BearerTokenHandler, CustomAuthHandler,
    EnhancedApiKeyHandler,
};
use super::oauth2::OAuth2Handler;
use super::storage::OAuth2TokenStorage;
use super::types::AuthConfig;
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::debug;

/// Registry of custom auth methods and factory for handlers
#[derive(Debug, Default)]
pub struct AuthFactory {
    custom_methods: BTreeMap<String, Arc<dyn CustomAuthMethod>>,
}

impl AuthFactory {
    /// Create a factory with an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a factory with the built-in methods registered
    pub fn with_builtins() -> Self {
        let mut factory = Self::new();
        for method in builtin_methods() {
            // Built-in names are distinct
            let _ = factory.register_custom_method(method);
        }
        factory
    }

    /// Register a custom method. Names are append-only: registering a name
    /// twice fails.
    pub fn register_custom_method(&mut self, method: Arc<dyn CustomAuthMethod>) -> Result<()> {
        let name = method.name().to_string();
        if self.custom_methods.contains_key(&name) {
            return Err(Error::config(format!(
                "Custom auth method '{name}' is already registered"
            )));
        }
        debug!("Registered custom auth method '{}'", name);
        self.custom_methods.insert(name, method);
        Ok(())
    }

    /// Look up a registered method
    pub fn custom_method(&self, name: &str) -> Option<Arc<dyn CustomAuthMethod>> {
        self.custom_methods.get(name).cloned()
    }

    /// All registered methods, ordered by name
    pub fn available_custom_methods(&self) -> Vec<Arc<dyn CustomAuthMethod>> {
        self.custom_methods.values().cloned().collect()
    }

    /// Create a handler for `config`. OAuth2 handlers need `token_storage`;
    /// other schemes ignore it. Missing pieces fail here rather than at
    /// request time.
    pub fn create_auth_handler(
        &self,
        config: &AuthConfig,
        token_storage: Option<Arc<dyn OAuth2TokenStorage>>,
    ) -> Result<Arc<dyn AuthHandler>> {
        let handler: Arc<dyn AuthHandler> = match config {
            AuthConfig::BasicAuth => Arc::new(BasicAuthHandler::new()),

            AuthConfig::ApiKey {
                key_field,
                header_name,
            } => Arc::new(ApiKeyHandler::new(key_field.clone(), header_name.clone())),

            AuthConfig::EnhancedApiKey(cfg) => Arc::new(EnhancedApiKeyHandler::new(cfg.clone())),

            AuthConfig::BearerToken => Arc::new(BearerTokenHandler::new()),

            AuthConfig::Oauth2 { oauth2_config } => {
                let oauth2_config = oauth2_config
                    .clone()
                    .ok_or_else(|| Error::missing_field("oauth2_config"))?;
                let storage = token_storage.ok_or_else(|| Error::missing_field("token_storage"))?;
                Arc::new(OAuth2Handler::new(oauth2_config, storage))
            }

            AuthConfig::Custom { method_name } => {
                let name = method_name
                    .as_deref()
                    .ok_or_else(|| Error::missing_field("method_name"))?;
                let method = self
                    .custom_method(name)
                    .ok_or_else(|| Error::config(format!("Unknown custom auth method: {name}")))?;
                Arc::new(CustomAuthHandler::new(method))
            }
        };
        Ok(handler)
    }
}

/// The built-in custom methods
pub fn builtin_methods() -> Vec<Arc<dyn CustomAuthMethod>> {
    vec![
        Arc::new(AwsSignatureV4Method),
        Arc::new(HmacAuthMethod),
        Arc::new(JwtAuthMethod),
    ]
}
