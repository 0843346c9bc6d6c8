//! Upload rate limiting behind an injectable trait, so the in-process map can
//! be swapped for a shared TTL store without touching handlers.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use tokio::time::Instant;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RateDecision {
    Allowed,
    RetryAfter(Duration),
}

pub trait RateLimiter: Send + Sync {
    /// Records and allows the request if `key` has not been allowed within
    /// `window`; otherwise reports how long until it would be.
    fn check(&self, key: &str, window: Duration) -> RateDecision;
}

/// Last-allowed timestamps per key. Entries older than the window are evicted
/// on every check, so memory is bounded by the keys active within one window.
#[derive(Default)]
pub struct InMemoryRateLimiter {
    last_allowed: Mutex<HashMap<String, Instant>>,
}

impl InMemoryRateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn tracked_keys(&self) -> usize {
        self.last_allowed.lock().map(|m| m.len()).unwrap_or(0)
    }
}

impl RateLimiter for InMemoryRateLimiter {
    fn check(&self, key: &str, window: Duration) -> RateDecision {
        if window.is_zero() {
            return RateDecision::Allowed;
        }

        let now = Instant::now();
        let mut last_allowed = match self.last_allowed.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        last_allowed.retain(|_, at| now.duration_since(*at) < window);

        if let Some(at) = last_allowed.get(key) {
            return RateDecision::RetryAfter(window - now.duration_since(*at));
        }

        last_allowed.insert(key.to_string(), now);
        RateDecision::Allowed
    }
}

/// Whole seconds to report to a client, rounded up so "wait 0s" never happens.
pub fn retry_after_secs(wait: Duration) -> u64 {
    let secs = wait.as_secs();
    if wait.subsec_nanos() > 0 {
        secs + 1
    } else {
        secs
    }
}
