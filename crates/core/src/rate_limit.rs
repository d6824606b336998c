//! Client-side rate limiting
//!
//! Token buckets keyed by endpoint group, so one busy resource does not
//! starve the others. A request that cannot get a token is rejected locally
//! instead of being sent and throttled by the server.
//!
//! # Example
//!
//! ```rust
//! use partnersell_core::rate_limit::{RateLimitConfig, RateLimiter};
//!
//! let limiter = RateLimiter::new(RateLimitConfig::per_minute(60));
//!
//! match limiter.acquire("registration") {
//!     Ok(()) => { /* proceed with the call */ }
//!     Err(wait) => println!("try again in {wait:?}"),
//! }
//! ```

use crate::serde_duration;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

/// Rate limiter configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests refilled per window
    pub max_requests: u32,
    /// Refill window
    #[serde(with = "serde_duration::secs")]
    pub window: Duration,
    /// Extra tokens a bucket may hold on top of `max_requests`
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self::per_minute(100)
    }
}

impl RateLimitConfig {
    /// Per-minute rate limit with a quarter of it as burst
    #[must_use]
    pub fn per_minute(max: u32) -> Self {
        Self {
            max_requests: max,
            window: Duration::from_secs(60),
            burst: max / 4,
        }
    }

    /// Per-second rate limit with half of it as burst
    #[must_use]
    pub fn per_second(max: u32) -> Self {
        Self {
            max_requests: max,
            window: Duration::from_secs(1),
            burst: max / 2,
        }
    }

    fn capacity(&self) -> f64 {
        f64::from(self.max_requests.saturating_add(self.burst))
    }

    fn tokens_per_sec(&self) -> f64 {
        let window = self.window.as_secs_f64();
        if window > 0.0 {
            f64::from(self.max_requests) / window
        } else {
            f64::INFINITY
        }
    }
}

#[derive(Debug)]
struct Bucket {
    tokens: f64,
    refilled_at: Instant,
}

impl Bucket {
    fn full(config: &RateLimitConfig) -> Self {
        Self {
            tokens: config.capacity(),
            refilled_at: Instant::now(),
        }
    }

    fn refill(&mut self, config: &RateLimitConfig) {
        let now = Instant::now();
        let earned = now.duration_since(self.refilled_at).as_secs_f64() * config.tokens_per_sec();
        self.tokens = (self.tokens + earned).min(config.capacity());
        self.refilled_at = now;
    }

    /// Time until `tokens` are in the bucket; zero if they already are
    fn wait_for(&self, tokens: f64, config: &RateLimitConfig) -> Duration {
        let missing = tokens - self.tokens;
        if missing <= 0.0 {
            return Duration::ZERO;
        }
        let rate = config.tokens_per_sec();
        if rate > 0.0 {
            Duration::from_secs_f64(missing / rate)
        } else {
            Duration::MAX
        }
    }
}

/// Rate limiter with one bucket per key
#[derive(Debug)]
pub struct RateLimiter {
    buckets: Mutex<HashMap<String, Bucket>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    /// Create a new rate limiter
    #[must_use]
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: Mutex::new(HashMap::new()),
            config,
        }
    }

    /// Take one token for `key`
    ///
    /// # Errors
    ///
    /// When the bucket is empty, returns how long until a token is available.
    pub fn acquire(&self, key: &str) -> Result<(), Duration> {
        self.with_bucket(key, |bucket, config| {
            if bucket.tokens >= 1.0 {
                bucket.tokens -= 1.0;
                Ok(())
            } else {
                Err(bucket.wait_for(1.0, config))
            }
        })
    }

    /// Take one token for `key`, reporting only whether it was granted
    #[must_use]
    pub fn try_acquire(&self, key: &str) -> bool {
        self.acquire(key).is_ok()
    }

    /// Current state of the bucket for `key`
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn status(&self, key: &str) -> RateLimitStatus {
        self.with_bucket(key, |bucket, config| RateLimitStatus {
            available: bucket.tokens as u32,
            max: config.max_requests.saturating_add(config.burst),
            reset_in: bucket.wait_for(config.capacity(), config),
        })
    }

    /// Forget the bucket for `key`; it starts full again
    pub fn reset(&self, key: &str) {
        self.lock().remove(key);
    }

    /// Forget all buckets
    pub fn reset_all(&self) {
        self.lock().clear();
    }

    fn with_bucket<R>(&self, key: &str, f: impl FnOnce(&mut Bucket, &RateLimitConfig) -> R) -> R {
        let mut buckets = self.lock();
        let bucket = buckets
            .entry(key.to_string())
            .or_insert_with(|| Bucket::full(&self.config));
        bucket.refill(&self.config);
        f(bucket, &self.config)
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, HashMap<String, Bucket>> {
        // A panic while holding the lock cannot leave a bucket half-updated
        self.buckets.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

/// Snapshot of one bucket
#[derive(Debug, Clone, Serialize)]
pub struct RateLimitStatus {
    /// Whole tokens available now
    pub available: u32,
    /// Bucket capacity
    pub max: u32,
    /// Time until the bucket is full again
    #[serde(with = "serde_duration::millis")]
    pub reset_in: Duration,
}
