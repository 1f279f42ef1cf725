//! Per-origin request budget for the login endpoint.
//!
//! A sliding-window log keyed by caller identity. The caller supplies the
//! current time, so a decision depends only on the key, the clock reading
//! and what this limiter has already seen.

use crate::config::{MAX_RATE_WINDOW_SECONDS, RateLimitConfig};
use chrono::{DateTime, Duration, Utc};
use std::collections::{HashMap, VecDeque};
use tokio::sync::Mutex;

/// Drop idle keys once the map grows past this many entries.
const PRUNE_THRESHOLD: usize = 10_000;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RateLimitDecision {
    Allowed,
    Limited { retry_after_seconds: i64 },
}

pub struct LoginRateLimiter {
    max_requests: usize,
    window: Duration,
    requests: Mutex<HashMap<String, VecDeque<DateTime<Utc>>>>,
}

impl LoginRateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        let window_seconds = config.window_seconds.clamp(1, MAX_RATE_WINDOW_SECONDS);
        Self {
            max_requests: config.max_requests,
            window: Duration::seconds(window_seconds),
            requests: Mutex::new(HashMap::new()),
        }
    }

    /// Counts a request for `key` at `now`, unless the budget is already spent.
    pub async fn check(&self, key: &str, now: DateTime<Utc>) -> RateLimitDecision {
        let window = self.window;
        let cutoff = now - window;
        let mut requests = self.requests.lock().await;

        if requests.len() > PRUNE_THRESHOLD {
            requests.retain(|_, log| log.back().is_some_and(|last| *last > cutoff));
        }

        let log = requests.entry(key.to_string()).or_default();
        while log.front().is_some_and(|seen| *seen <= cutoff) {
            log.pop_front();
        }

        if log.len() >= self.max_requests {
            let retry_after_seconds = log
                .front()
                .map(|oldest| (*oldest + window - now).num_seconds())
                .unwrap_or(window.num_seconds())
                .max(1);
            return RateLimitDecision::Limited {
                retry_after_seconds,
            };
        }

        log.push_back(now);
        RateLimitDecision::Allowed
    }
}
