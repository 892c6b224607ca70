//! Runtime configuration
//!
//! A YAML (or JSON) document describing one external API: where it lives,
//! how to authenticate, and how hard it may be called.
//!
//! ```yaml
//! base_url: https://api.example.com/v1
//! timeout_ms: 10000
//! default_headers:
//!   Accept: application/json
//! rate_limit:
//!   max_requests: 100
//!   window_ms: 60000
//! queue:
//!   max_concurrency: 4
//!   rate_limit: { max_requests: 10, window_ms: 1000, strategy: token_bucket }
//! auth:
//!   type: bearer_token
//! auth_payload:
//!   token: ${EXAMPLE_API_TOKEN}
//! ```
//!
//! `${VAR}` placeholders are replaced from the process environment before
//! parsing; an unset variable is an error.

use crate::auth::{AuthConfig, AuthFactory, OAuth2TokenStorage};
use crate::error::{Error, Result};
use crate::http::{ApiClientConfig, EnhancedApiClient};
use crate::queue::{RequestQueue, RequestQueueConfig};
use crate::rate_limit::{EnhancedRateLimiter, RateLimit, RateLimitConfig};
use crate::types::{JsonValue, StringMap};
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::debug;

/// Regex for matching environment placeholders: ${NAME}
static ENV_VAR_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap());

// ============================================================================
// Config types
// ============================================================================

/// Complete runtime configuration loaded from YAML or JSON
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Base URL relative endpoints are joined onto
    pub base_url: String,

    /// Default request timeout in milliseconds
    #[serde(default)]
    pub timeout_ms: Option<u64>,

    /// Headers sent with every request
    #[serde(default)]
    pub default_headers: StringMap,

    /// User agent override
    #[serde(default)]
    pub user_agent: Option<String>,

    /// Client-side sliding-window limit
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,

    /// Request queue settings
    #[serde(default)]
    pub queue: Option<QueueSettings>,

    /// Auth handler description
    #[serde(default)]
    pub auth: Option<AuthConfig>,

    /// Credentials passed to the auth handler on every call
    #[serde(default)]
    pub auth_payload: Option<JsonValue>,
}

/// Queue section: queue bounds plus the limiter the queue consults
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueSettings {
    #[serde(flatten)]
    pub config: RequestQueueConfig,

    /// Limiter consulted before every queued attempt
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
}

impl RuntimeConfig {
    /// Load from a file; `.json` files are parsed as JSON, anything else
    /// as YAML
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| {
            Error::config(format!("Failed to read config file '{}': {}", path.display(), e))
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        debug!("Loading runtime config from {}", path.display());
        if is_json {
            Self::from_json_str(&content)
        } else {
            Self::from_yaml_str(&content)
        }
    }

    /// Parse a YAML document
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(&interpolate_env(yaml)?)?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a JSON document
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(&interpolate_env(json)?)?;
        config.validate()?;
        Ok(config)
    }

    /// Check URLs and limits
    pub fn validate(&self) -> Result<()> {
        if self.base_url.is_empty() {
            return Err(Error::missing_field("base_url"));
        }
        url::Url::parse(&self.base_url)?;

        if let Some(limit) = &self.rate_limit {
            limit.validate()?;
        }
        if let Some(queue) = &self.queue {
            queue.config.validate()?;
            if let Some(limit) = &queue.rate_limit {
                limit.validate()?;
            }
        }
        if self.auth_payload.is_some() && self.auth.is_none() {
            return Err(Error::config("auth_payload is set but no auth is configured"));
        }
        Ok(())
    }

    /// Client settings from this config
    pub fn client_config(&self) -> ApiClientConfig {
        let mut builder = ApiClientConfig::builder().base_url(&self.base_url);
        if let Some(ms) = self.timeout_ms {
            builder = builder.timeout(Duration::from_millis(ms));
        }
        if let Some(limit) = self.rate_limit {
            builder = builder.rate_limit(limit);
        }
        if let Some(agent) = &self.user_agent {
            builder = builder.user_agent(agent);
        }
        for (key, value) in &self.default_headers {
            builder = builder.header(key, value);
        }
        builder.build()
    }

    /// Build a client, resolving the auth handler through `factory`
    pub fn build_client(
        &self,
        factory: &AuthFactory,
        token_storage: Option<Arc<dyn OAuth2TokenStorage>>,
    ) -> Result<EnhancedApiClient> {
        let handler = self
            .auth
            .as_ref()
            .map(|auth| factory.create_auth_handler(auth, token_storage))
            .transpose()?;
        EnhancedApiClient::new(self.client_config(), handler)
    }

    /// Build the request queue, if one is configured. Needs a Tokio runtime.
    pub fn build_queue(&self) -> Result<Option<RequestQueue>> {
        let Some(settings) = &self.queue else {
            return Ok(None);
        };
        let limiter = settings
            .rate_limit
            .map(|limit| EnhancedRateLimiter::new(limit).map(|l| Arc::new(l) as Arc<dyn RateLimit>))
            .transpose()?;
        RequestQueue::new(settings.config, limiter).map(Some)
    }
}

// ============================================================================
// Environment interpolation
// ============================================================================

/// Replace `${VAR}` placeholders from the process environment
pub fn interpolate_env(text: &str) -> Result<String> {
    interpolate_env_with(text, |name| std::env::var(name).ok())
}

/// Replace `${VAR}` placeholders using `lookup`
pub fn interpolate_env_with<F>(text: &str, lookup: F) -> Result<String>
where
    F: Fn(&str) -> Option<String>,
{
    let mut missing: Option<String> = None;
    let replaced = ENV_VAR_REGEX.replace_all(text, |caps: &Captures<'_>| {
        let name = &caps[1];
        lookup(name).unwrap_or_else(|| {
            missing.get_or_insert_with(|| name.to_string());
            String::new()
        })
    });

    match missing {
        Some(name) => Err(Error::config(format!(
            "Environment variable '{name}' is not set"
        ))),
        None => Ok(replaced.into_owned()),
    }
}
