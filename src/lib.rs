// Allow common clippy pedantic lints that aren't critical for this codebase
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_lossless)]
#![allow(clippy::too_many_lines)]
#![allow(clippy::ref_option)]
#![allow(clippy::unused_self)]
#![allow(clippy::struct_excessive_bools)]
#![allow(clippy::must_use_candidate)]
#![allow(clippy::items_after_statements)]
#![allow(clippy::unnecessary_wraps)]
#![allow(clippy::match_same_arms)]
#![allow(clippy::match_wildcard_for_single_variants)]
#![allow(clippy::needless_pass_by_value)]
#![allow(clippy::unused_async)]

//! # Integration Runtime
//!
//! Plumbing for calling third-party HTTP APIs: pluggable authentication,
//! client-side rate limiting, a prioritised retrying request queue, and an
//! API client with pagination, batching, uploads, and streaming.
//!
//! ## Features
//!
//! - **Auth Strategies**: Basic, API key (header/query/body), Bearer, OAuth2,
//!   and registrable custom signing methods (AWS SigV4 style, HMAC, JWT)
//! - **Rate Limiting**: Fixed window, sliding window, and token bucket
//! - **Request Queue**: Bounded concurrency, priorities, retry with backoff
//! - **API Client**: Uniform error classification, pagination, batch, upload,
//!   health checks, streamed bodies
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use integration_runtime::auth::{AuthConfig, AuthFactory};
//! use integration_runtime::http::{ApiClientConfig, EnhancedApiClient, RequestOptions};
//! use integration_runtime::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let factory = AuthFactory::with_builtins();
//!     let handler = factory.create_auth_handler(&AuthConfig::BearerToken, None)?;
//!
//!     let config = ApiClientConfig::builder()
//!         .base_url("https://api.example.com/v1")
//!         .build();
//!     let client = EnhancedApiClient::new(config, Some(handler))?;
//!
//!     let auth = serde_json::json!({ "token": "secret" });
//!     let user = client.get("/me", RequestOptions::new().auth(auth)).await?;
//!     println!("{user}");
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────┐
//! │                      RequestQueue                         │
//! │   priority order · concurrency cap · retry with backoff   │
//! └─────────────────────────────┬─────────────────────────────┘
//!                               │
//! ┌─────────────────────────────┴─────────────────────────────┐
//! │              EnhancedApiClient → ApiClient                │
//! │   paginate · batch · upload · health · stream             │
//! └──────────────┬──────────────────────────────┬─────────────┘
//!                │                              │
//! ┌──────────────┴──────────────┐ ┌─────────────┴─────────────┐
//! │   AuthHandler (AuthFactory) │ │        RateLimit          │
//! │ Basic · API key · Bearer    │ │ fixed · sliding · bucket  │
//! │ OAuth2 · Custom methods     │ │                           │
//! └─────────────────────────────┘ └───────────────────────────┘
//! ```

#![warn(clippy::all)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]
#![allow(clippy::doc_markdown)]

// ============================================================================
// Module declarations
// ============================================================================

/// Error types
pub mod error;

/// Common types and type aliases
pub mod types;

/// Authentication handlers, custom methods, and OAuth2
pub mod auth;

/// Client-side rate limiting
pub mod rate_limit;

/// Prioritised request queue with retries
pub mod queue;

/// API clients
pub mod http;

/// Page-number pagination
pub mod pagination;

/// Runtime configuration files
pub mod config;

/// Command-line interface
pub mod cli;

// ============================================================================
// Re-exports
// ============================================================================

pub use error::{Error, ErrorKind, Result};
pub use types::*;

// Re-export commonly used types
pub use config::RuntimeConfig;
pub use http::{ApiClient, ApiClientConfig, EnhancedApiClient};
pub use queue::RequestQueue;

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Crate name
pub const NAME: &str = env!("CARGO_PKG_NAME");
