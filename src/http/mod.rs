//! HTTP client module
//!
//! [`ApiClient`] issues single requests under the configured auth handler
//! and client-side rate limit, classifying failures:
//!
//! - **401** → `Error::Auth`
//! - **429** → `Error::RateLimited`, with `Retry-After` seconds when sent
//! - **other non-2xx** → `Error::Api`, retryable for 5xx
//! - **transport failure or timeout** → retryable `Error::Api`
//!
//! [`EnhancedApiClient`] adds pagination, batching, uploads, health checks,
//! and streaming on top.

mod client;
mod enhanced;
mod types;

pub use client::{ApiClient, ApiClientConfig, ApiClientConfigBuilder};
pub use enhanced::{EnhancedApiClient, DEFAULT_HEALTH_ENDPOINT, HEALTH_CHECK_TIMEOUT};
pub use types::{
    BatchOptions, BatchRequest, FileUpload, HealthStatus, RequestBody, RequestOptions,
    StreamCallbacks, StreamChunk,
};
