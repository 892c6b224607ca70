//! Error types for the integration runtime
//!
//! Every public API returns `Result<T, Error>`. The three variants callers
//! usually branch on are the external-API taxonomy:
//!
//! - [`Error::Auth`]: credential or token refresh failure, never retried
//! - [`Error::RateLimited`]: quota exceeded, retried after a delay
//! - [`Error::Api`]: everything else coming back from (or failing to reach)
//!   the remote API, retried only when `retryable` is set
//!
//! The remaining variants cover construction, configuration, and queue
//! lifecycle failures.

use serde_json::Value;
use thiserror::Error;

/// The main error type for the integration runtime
#[derive(Error, Debug)]
pub enum Error {
    // ============================================================================
    // External API Errors
    // ============================================================================
    #[error("Authentication failed: {message}")]
    Auth {
        message: String,
        api_response: Option<Value>,
    },

    #[error("{message}")]
    RateLimited {
        message: String,
        retry_after_seconds: Option<u64>,
    },

    #[error("{message}")]
    Api {
        message: String,
        status_code: Option<u16>,
        api_response: Option<Value>,
        retryable: bool,
    },

    // ============================================================================
    // Configuration Errors
    // ============================================================================
    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Missing required config field: {field}")]
    MissingConfigField { field: String },

    #[error("Invalid config value for '{field}': {message}")]
    InvalidConfigValue { field: String, message: String },

    #[error("Failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("Failed to parse JSON: {0}")]
    JsonParse(#[from] serde_json::Error),

    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Signing failed: {message}")]
    Signing { message: String },

    // ============================================================================
    // Queue Errors
    // ============================================================================
    #[error("Request queue is full (max {max_queue_size})")]
    QueueFull { max_queue_size: usize },

    #[error("Queue cleared")]
    QueueCleared,

    #[error("Request queue shut down before the request completed")]
    QueueClosed,

    // ============================================================================
    // I/O and Generic Errors
    // ============================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Coarse classification of an [`Error`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Credential or refresh failure
    Auth,
    /// Quota exceeded, locally or upstream
    RateLimit,
    /// Any other remote API or transport failure
    Api,
    /// Configuration, queue, or local failures
    Other,
}

impl Error {
    /// Create an authentication error
    pub fn auth(message: impl Into<String>) -> Self {
        Self::Auth {
            message: message.into(),
            api_response: None,
        }
    }

    /// Create a rate limit error
    pub fn rate_limited(message: impl Into<String>, retry_after_seconds: Option<u64>) -> Self {
        Self::RateLimited {
            message: message.into(),
            retry_after_seconds,
        }
    }

    /// Create a non-retryable API error without a status code
    pub fn api(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
            status_code: None,
            api_response: None,
            retryable: false,
        }
    }

    /// Create an API error for an HTTP status; 5xx is retryable
    pub fn http_status(status: u16, message: impl Into<String>, api_response: Option<Value>) -> Self {
        Self::Api {
            message: message.into(),
            status_code: Some(status),
            api_response,
            retryable: status >= 500,
        }
    }

    /// Create a retryable transport error (connection failure, timeout)
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Api {
            message: message.into(),
            status_code: None,
            api_response: None,
            retryable: true,
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create a missing field error
    pub fn missing_field(field: impl Into<String>) -> Self {
        Self::MissingConfigField {
            field: field.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidConfigValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create a signing error
    pub fn signing(message: impl Into<String>) -> Self {
        Self::Signing {
            message: message.into(),
        }
    }

    /// Tag of this error within the external API taxonomy
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::Auth { .. } => ErrorKind::Auth,
            Error::RateLimited { .. } => ErrorKind::RateLimit,
            Error::Api { .. } => ErrorKind::Api,
            _ => ErrorKind::Other,
        }
    }

    /// HTTP status associated with the error, if any
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Error::Auth { .. } => Some(401),
            Error::RateLimited { .. } => Some(429),
            Error::Api { status_code, .. } => *status_code,
            _ => None,
        }
    }

    /// Parsed upstream response body, if one was captured
    pub fn api_response(&self) -> Option<&Value> {
        match self {
            Error::Auth { api_response, .. } | Error::Api { api_response, .. } => {
                api_response.as_ref()
            }
            _ => None,
        }
    }

    /// Seconds to wait before retrying a rate-limited call
    pub fn retry_after_seconds(&self) -> Option<u64> {
        match self {
            Error::RateLimited {
                retry_after_seconds,
                ..
            } => *retry_after_seconds,
            _ => None,
        }
    }

    /// Check if this error may be retried automatically
    pub fn is_retryable(&self) -> bool {
        match self {
            Error::RateLimited { .. } => true,
            Error::Api { retryable, .. } => *retryable,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return Error::transport("Request timeout");
        }
        if err.is_decode() {
            return Error::Api {
                message: format!("Failed to decode response: {err}"),
                status_code: err.status().map(|s| s.as_u16()),
                api_response: None,
                retryable: false,
            };
        }
        Error::transport(err.to_string())
    }
}

/// Result type alias for the integration runtime
pub type Result<T> = std::result::Result<T, Error>;

/// Extension trait for adding context to errors
pub trait ResultExt<T> {
    /// Add context to an error
    fn context(self, message: impl Into<String>) -> Result<T>;

    /// Add context with a closure (lazy evaluation)
    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T>;
}

impl<T, E: Into<Error>> ResultExt<T> for std::result::Result<T, E> {
    fn context(self, message: impl Into<String>) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", message.into(), inner))
        })
    }

    fn with_context<F: FnOnce() -> String>(self, f: F) -> Result<T> {
        self.map_err(|e| {
            let inner = e.into();
            Error::Other(format!("{}: {}", f(), inner))
        })
    }
}
