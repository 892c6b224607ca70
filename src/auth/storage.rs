//! OAuth2 token storage contract
//!
//! The runtime never owns token lifetime; hosts inject a storage backend.

use super::types::OAuth2Token;
use crate::error::Result;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;

/// Persistence contract for OAuth2 tokens, keyed by an arbitrary string
#[async_trait]
pub trait OAuth2TokenStorage: Send + Sync {
    /// Fetch the token stored under `key`
    async fn get_token(&self, key: &str) -> Result<Option<OAuth2Token>>;

    /// Store or replace the token under `key`
    async fn save_token(&self, key: &str, token: OAuth2Token) -> Result<()>;

    /// Remove the token under `key`, if any
    async fn delete_token(&self, key: &str) -> Result<()>;
}

/// Process-local token storage for tests and demos
#[derive(Debug, Default)]
pub struct InMemoryTokenStorage {
    tokens: RwLock<HashMap<String, OAuth2Token>>,
}

impl InMemoryTokenStorage {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Remove every stored token
    pub fn clear_all(&self) {
        self.tokens.write().clear();
    }

    /// Number of stored tokens
    pub fn len(&self) -> usize {
        self.tokens.read().len()
    }

    /// Whether the store is empty
    pub fn is_empty(&self) -> bool {
        self.tokens.read().is_empty()
    }
}

#[async_trait]
impl OAuth2TokenStorage for InMemoryTokenStorage {
    async fn get_token(&self, key: &str) -> Result<Option<OAuth2Token>> {
        Ok(self.tokens.read().get(key).cloned())
    }

    async fn save_token(&self, key: &str, token: OAuth2Token) -> Result<()> {
        self.tokens.write().insert(key.to_string(), token);
        Ok(())
    }

    async fn delete_token(&self, key: &str) -> Result<()> {
        self.tokens.write().remove(key);
        Ok(())
    }
}
