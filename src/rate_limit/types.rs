//! Rate limiter configuration and status types

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Counting strategy for a limiter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RateLimitStrategy {
    /// Clock-aligned, non-overlapping windows
    Fixed,
    /// Trailing window that moves with "now"
    #[default]
    Sliding,
    /// Bucket of `max_requests` tokens refilled once per window
    TokenBucket,
}

impl fmt::Display for RateLimitStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            RateLimitStrategy::Fixed => "fixed",
            RateLimitStrategy::Sliding => "sliding",
            RateLimitStrategy::TokenBucket => "token_bucket",
        };
        f.write_str(s)
    }
}

/// Limiter configuration; immutable once a limiter is built
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Requests admitted per window
    pub max_requests: u32,
    /// Window length in milliseconds
    pub window_ms: u64,
    /// Counting strategy
    #[serde(default)]
    pub strategy: RateLimitStrategy,
}

impl RateLimitConfig {
    /// Create a new config
    pub fn new(max_requests: u32, window_ms: u64, strategy: RateLimitStrategy) -> Self {
        Self {
            max_requests,
            window_ms,
            strategy,
        }
    }

    /// Sliding-window config
    pub fn sliding(max_requests: u32, window_ms: u64) -> Self {
        Self::new(max_requests, window_ms, RateLimitStrategy::Sliding)
    }

    /// Fixed-window config
    pub fn fixed(max_requests: u32, window_ms: u64) -> Self {
        Self::new(max_requests, window_ms, RateLimitStrategy::Fixed)
    }

    /// Token-bucket config
    pub fn token_bucket(max_requests: u32, window_ms: u64) -> Self {
        Self::new(max_requests, window_ms, RateLimitStrategy::TokenBucket)
    }

    /// Check that both bounds are positive
    pub fn validate(&self) -> Result<()> {
        if self.max_requests == 0 {
            return Err(Error::invalid_value("max_requests", "must be greater than 0"));
        }
        if self.window_ms == 0 {
            return Err(Error::invalid_value("window_ms", "must be greater than 0"));
        }
        Ok(())
    }
}

/// Point-in-time limiter report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RateLimitStatus {
    pub strategy: RateLimitStrategy,
    /// Requests that would be admitted right now
    pub remaining_requests: u32,
    pub window_ms: u64,
    /// Milliseconds until capacity is next replenished, where defined
    #[serde(skip_serializing_if = "Option::is_none")]
    pub next_refill_ms: Option<u64>,
}
