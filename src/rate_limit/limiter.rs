//! Limiter implementations
//!
//! All state lives behind a short, synchronous critical section, so a check
//! and the recording of the admitted attempt are atomic with respect to
//! other tasks.

use super::clock::{Clock, SystemClock};
use super::types::{RateLimitConfig, RateLimitStatus, RateLimitStrategy};
use crate::error::{Error, Result};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;
use tracing::debug;

/// Admission contract shared by all limiters
pub trait RateLimit: Send + Sync + fmt::Debug {
    /// Admit and record one request, or fail with [`Error::RateLimited`]
    fn check_limit(&self) -> Result<()>;

    /// Report current capacity without recording anything
    fn status(&self) -> RateLimitStatus;
}

fn retry_after_secs(wait_ms: u64) -> u64 {
    wait_ms.div_ceil(1000)
}

/// Drop timestamps at or before `window_start` from a sorted window
fn prune_sliding(requests: &mut VecDeque<u64>, window_start: u64) {
    while requests.front().is_some_and(|&t| t <= window_start) {
        requests.pop_front();
    }
}

fn prune_fixed(requests: &mut VecDeque<u64>, boundary: u64) {
    while requests.front().is_some_and(|&t| t < boundary) {
        requests.pop_front();
    }
}

fn remaining(config: &RateLimitConfig, used: usize) -> u32 {
    config.max_requests.saturating_sub(used as u32)
}

// ============================================================================
// Simple limiter
// ============================================================================

/// Single sliding-window limiter
pub struct SimpleRateLimiter {
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    requests: Mutex<VecDeque<u64>>,
}

impl SimpleRateLimiter {
    /// Create a limiter on the system clock. The config's strategy is
    /// ignored; this limiter always slides.
    pub fn new(config: RateLimitConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Create a limiter on a custom clock
    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            clock,
            requests: Mutex::new(VecDeque::with_capacity(config.max_requests as usize)),
        })
    }
}

impl RateLimit for SimpleRateLimiter {
    fn check_limit(&self) -> Result<()> {
        let now = self.clock.now_millis();
        let mut requests = self.requests.lock();
        prune_sliding(&mut requests, now.saturating_sub(self.config.window_ms));

        if requests.len() >= self.config.max_requests as usize {
            let oldest = requests.front().copied().unwrap_or(now);
            let retry_after = retry_after_secs((oldest + self.config.window_ms).saturating_sub(now));
            debug!("Rate limit exceeded, retry after {}s", retry_after);
            return Err(Error::rate_limited(
                format!("Rate limit exceeded. Retry after {retry_after} seconds."),
                Some(retry_after),
            ));
        }

        requests.push_back(now);
        Ok(())
    }

    fn status(&self) -> RateLimitStatus {
        let now = self.clock.now_millis();
        let window_start = now.saturating_sub(self.config.window_ms);
        let used = self
            .requests
            .lock()
            .iter()
            .filter(|&&t| t > window_start)
            .count();
        RateLimitStatus {
            strategy: RateLimitStrategy::Sliding,
            remaining_requests: remaining(&self.config, used),
            window_ms: self.config.window_ms,
            next_refill_ms: None,
        }
    }
}

impl fmt::Debug for SimpleRateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SimpleRateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Enhanced limiter
// ============================================================================

#[derive(Debug)]
struct LimiterState {
    /// Admitted timestamps for the window strategies, ascending
    requests: VecDeque<u64>,
    tokens: u32,
    last_refill: u64,
}

/// Limiter with fixed, sliding, and token-bucket strategies
pub struct EnhancedRateLimiter {
    config: RateLimitConfig,
    clock: Arc<dyn Clock>,
    state: Mutex<LimiterState>,
}

impl EnhancedRateLimiter {
    /// Create a limiter on the system clock
    pub fn new(config: RateLimitConfig) -> Result<Self> {
        Self::with_clock(config, Arc::new(SystemClock::new()))
    }

    /// Create a limiter on a custom clock
    pub fn with_clock(config: RateLimitConfig, clock: Arc<dyn Clock>) -> Result<Self> {
        config.validate()?;
        let now = clock.now_millis();
        Ok(Self {
            config,
            clock,
            state: Mutex::new(LimiterState {
                requests: VecDeque::new(),
                tokens: config.max_requests,
                last_refill: now,
            }),
        })
    }

    /// The limiter's configuration
    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    fn check_fixed(&self, state: &mut LimiterState, now: u64) -> Result<()> {
        let window = self.config.window_ms;
        let boundary = now / window * window;
        prune_fixed(&mut state.requests, boundary);

        if state.requests.len() >= self.config.max_requests as usize {
            let retry_after = retry_after_secs(boundary + window - now);
            return Err(Error::rate_limited(
                format!("Fixed window rate limit exceeded. Retry after {retry_after} seconds."),
                Some(retry_after),
            ));
        }

        state.requests.push_back(now);
        Ok(())
    }

    fn check_sliding(&self, state: &mut LimiterState, now: u64) -> Result<()> {
        let window = self.config.window_ms;
        prune_sliding(&mut state.requests, now.saturating_sub(window));

        if state.requests.len() >= self.config.max_requests as usize {
            let oldest = state.requests.front().copied().unwrap_or(now);
            let retry_after = retry_after_secs((oldest + window).saturating_sub(now));
            return Err(Error::rate_limited(
                format!("Sliding window rate limit exceeded. Retry after {retry_after} seconds."),
                Some(retry_after),
            ));
        }

        state.requests.push_back(now);
        Ok(())
    }

    fn check_token_bucket(&self, state: &mut LimiterState, now: u64) -> Result<()> {
        let window = self.config.window_ms;
        let elapsed = now.saturating_sub(state.last_refill);
        let refill = (elapsed / window).saturating_mul(u64::from(self.config.max_requests));

        if refill > 0 {
            let tokens = (u64::from(state.tokens) + refill).min(u64::from(self.config.max_requests));
            state.tokens = tokens as u32;
            state.last_refill = now;
        }

        if state.tokens < 1 {
            let retry_after = retry_after_secs(window - elapsed % window);
            return Err(Error::rate_limited(
                format!("Token bucket depleted. Retry after {retry_after} seconds."),
                Some(retry_after),
            ));
        }

        state.tokens -= 1;
        Ok(())
    }
}

impl RateLimit for EnhancedRateLimiter {
    fn check_limit(&self) -> Result<()> {
        let now = self.clock.now_millis();
        let mut state = self.state.lock();
        let result = match self.config.strategy {
            RateLimitStrategy::Fixed => self.check_fixed(&mut state, now),
            RateLimitStrategy::Sliding => self.check_sliding(&mut state, now),
            RateLimitStrategy::TokenBucket => self.check_token_bucket(&mut state, now),
        };
        if let Err(ref e) = result {
            debug!("{} limiter denied request: {}", self.config.strategy, e);
        }
        result
    }

    fn status(&self) -> RateLimitStatus {
        let now = self.clock.now_millis();
        let window = self.config.window_ms;
        let state = self.state.lock();

        let (remaining_requests, next_refill_ms) = match self.config.strategy {
            RateLimitStrategy::Fixed => {
                let boundary = now / window * window;
                let used = state.requests.iter().filter(|&&t| t >= boundary).count();
                (remaining(&self.config, used), Some(boundary + window - now))
            }
            RateLimitStrategy::Sliding => {
                let window_start = now.saturating_sub(window);
                let used = state.requests.iter().filter(|&&t| t > window_start).count();
                (remaining(&self.config, used), None)
            }
            RateLimitStrategy::TokenBucket => {
                let elapsed = now.saturating_sub(state.last_refill);
                let pending = (elapsed / window).saturating_mul(u64::from(self.config.max_requests));
                let tokens =
                    (u64::from(state.tokens) + pending).min(u64::from(self.config.max_requests));
                (tokens as u32, Some(window - elapsed % window))
            }
        };

        RateLimitStatus {
            strategy: self.config.strategy,
            remaining_requests,
            window_ms: window,
            next_refill_ms,
        }
    }
}

impl fmt::Debug for EnhancedRateLimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnhancedRateLimiter")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}
