//! Request queue
//!
//! Bounded, priority-ordered, in-memory queue that admits work under a
//! concurrency cap and an optional [`RateLimit`](crate::rate_limit::RateLimit),
//! retrying failures with backoff.
//!
//! # Retry policy
//!
//! - `Error::RateLimited`: retried after `retry_after_seconds` when given,
//!   else after `retry_delay_ms`
//! - other retryable errors: retried after `retry_delay_ms * 2^n`, where `n`
//!   is the retry number (1, 2, ...)
//! - everything else fails the caller immediately
//!
//! Retries go back to the front of the waiting list.
//!
//! # Example
//!
//! ```ignore
//! let queue = RequestQueue::new(RequestQueueConfig::default(), None)?;
//! let ticket = queue.enqueue(|| async { Ok(42) }, EnqueueOptions::new().with_priority(5))?;
//! assert_eq!(ticket.await?, 42);
//! ```

mod request_queue;
mod types;

pub use request_queue::{QueueTicket, RequestQueue};
pub use types::{EnqueueOptions, QueueStatus, RequestQueueConfig};

#[cfg(test)]
mod tests;
