//! Rate limiting
//!
//! In-process admission control for outgoing calls. A limiter either admits
//! a call (recording it) or fails with `Error::RateLimited` carrying the
//! number of seconds to wait.
//!
//! # Strategies
//!
//! - **Sliding**: counts calls in the trailing `window_ms`
//! - **Fixed**: counts calls since the last clock-aligned window boundary
//! - **Token bucket**: `max_requests` tokens, refilled in whole windows
//!
//! Limiters read time from a [`Clock`]; tests drive a [`ManualClock`].

mod clock;
mod limiter;
mod types;

pub use clock::{Clock, ManualClock, SystemClock};
pub use limiter::{EnhancedRateLimiter, RateLimit, SimpleRateLimiter};
pub use types::{RateLimitConfig, RateLimitStatus, RateLimitStrategy};
