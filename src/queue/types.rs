//! Queue configuration, per-request options, and status

use crate::error::{Error, Result};
use crate::rate_limit::RateLimitStatus;
use serde::{Deserialize, Serialize};

/// Queue configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RequestQueueConfig {
    /// Maximum requests executing at once
    pub max_concurrency: usize,
    /// Retries allowed when the caller does not set one
    pub default_max_retries: u32,
    /// Base retry delay in milliseconds
    pub retry_delay_ms: u64,
    /// Maximum waiting (not yet active) requests
    pub max_queue_size: usize,
    /// Order waiting requests by descending priority
    pub priority_enabled: bool,
}

impl Default for RequestQueueConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 5,
            default_max_retries: 3,
            retry_delay_ms: 1000,
            max_queue_size: 1000,
            priority_enabled: true,
        }
    }
}

impl RequestQueueConfig {
    /// Set the concurrency cap
    pub fn with_max_concurrency(mut self, max_concurrency: usize) -> Self {
        self.max_concurrency = max_concurrency;
        self
    }

    /// Set the default retry count
    pub fn with_default_max_retries(mut self, retries: u32) -> Self {
        self.default_max_retries = retries;
        self
    }

    /// Set the base retry delay
    pub fn with_retry_delay_ms(mut self, delay_ms: u64) -> Self {
        self.retry_delay_ms = delay_ms;
        self
    }

    /// Set the waiting-request bound
    pub fn with_max_queue_size(mut self, size: usize) -> Self {
        self.max_queue_size = size;
        self
    }

    /// Enable or disable priority ordering
    pub fn with_priority(mut self, enabled: bool) -> Self {
        self.priority_enabled = enabled;
        self
    }

    /// Check that the bounds are positive
    pub fn validate(&self) -> Result<()> {
        if self.max_concurrency == 0 {
            return Err(Error::invalid_value("max_concurrency", "must be greater than 0"));
        }
        if self.max_queue_size == 0 {
            return Err(Error::invalid_value("max_queue_size", "must be greater than 0"));
        }
        Ok(())
    }
}

/// Per-request options for [`RequestQueue::enqueue`](super::RequestQueue::enqueue)
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EnqueueOptions {
    /// Higher runs first when priority is enabled
    pub priority: i64,
    /// Overrides the queue's default retry count; `Some(0)` disables retries
    pub max_retries: Option<u32>,
    /// Caller-chosen id; generated when absent
    pub id: Option<String>,
}

impl EnqueueOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }
}

/// Point-in-time queue report
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueueStatus {
    /// Requests waiting for a slot
    pub queue_length: usize,
    /// Requests currently executing
    pub active_requests: usize,
    pub max_concurrency: usize,
    pub paused: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rate_limit_status: Option<RateLimitStatus>,
}
