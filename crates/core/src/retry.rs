//! Retry policy and circuit breaker
//!
//! The request pipeline owns the retry loop itself (it needs an async sleep);
//! this module provides the policy it follows:
//! - Exponential backoff with jitter
//! - Presets for quick, default, and patient retrying
//! - A circuit breaker to stop hammering a failing service
//!
//! # Example
//!
//! ```rust
//! use partnersell_core::retry::RetryConfig;
//! use std::time::Duration;
//!
//! let config = RetryConfig { jitter: false, ..RetryConfig::default() };
//! assert_eq!(config.delay_for_attempt(2), Duration::from_millis(200));
//! ```

use crate::serde_duration;
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// Retry configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Maximum number of attempts, including the first
    pub max_attempts: u32,
    /// Initial delay between retries
    #[serde(with = "serde_duration::millis")]
    pub initial_delay: Duration,
    /// Maximum delay between retries
    #[serde(with = "serde_duration::millis")]
    pub max_delay: Duration,
    /// Multiplier for exponential backoff
    pub backoff_multiplier: f64,
    /// Add random jitter to delays
    pub jitter: bool,
    /// Timeout for each attempt
    #[serde(with = "serde_duration::option_secs")]
    pub attempt_timeout: Option<Duration>,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_delay: Duration::from_millis(100),
            max_delay: Duration::from_secs(10),
            backoff_multiplier: 2.0,
            jitter: true,
            attempt_timeout: None,
        }
    }
}

impl RetryConfig {
    /// Short delays and a per-attempt timeout, for interactive use
    #[must_use]
    pub fn quick() -> Self {
        Self {
            initial_delay: Duration::from_millis(50),
            max_delay: Duration::from_millis(500),
            attempt_timeout: Some(Duration::from_secs(5)),
            ..Self::default()
        }
    }

    /// More attempts with longer delays, for batch jobs against production
    #[must_use]
    pub fn patient() -> Self {
        Self {
            max_attempts: 5,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(30),
            attempt_timeout: Some(Duration::from_secs(60)),
            ..Self::default()
        }
    }

    /// A single attempt
    #[must_use]
    pub fn no_retry() -> Self {
        Self {
            max_attempts: 1,
            jitter: false,
            ..Self::default()
        }
    }

    /// Delay before retry number `retry` (1-based); zero for the first attempt
    #[must_use]
    #[allow(clippy::cast_possible_wrap, clippy::cast_possible_truncation)]
    pub fn delay_for_attempt(&self, retry: u32) -> Duration {
        if retry == 0 {
            return Duration::ZERO;
        }

        let exponent = retry.min(64) as i32 - 1;
        let secs = (self.initial_delay.as_secs_f64() * self.backoff_multiplier.powi(exponent))
            .min(self.max_delay.as_secs_f64())
            .max(0.0);

        // Up to 25% on top
        let factor = if self.jitter {
            1.0 + jitter_fraction() * 0.25
        } else {
            1.0
        };

        Duration::try_from_secs_f64(secs * factor).unwrap_or(self.max_delay)
    }

    /// Check that the values make sense together
    ///
    /// # Errors
    ///
    /// A message naming the first offending field.
    pub fn validate(&self) -> Result<(), String> {
        if self.max_attempts == 0 {
            return Err("retry.max_attempts must be at least 1".to_string());
        }
        if !self.backoff_multiplier.is_finite() || self.backoff_multiplier < 1.0 {
            return Err(format!(
                "retry.backoff_multiplier must be a finite number of at least 1.0, got {}",
                self.backoff_multiplier
            ));
        }
        Ok(())
    }

    /// Delays to sleep before each retry, in order
    ///
    /// Yields `max_attempts - 1` items; the first attempt has no delay.
    #[must_use]
    pub fn backoff(&self) -> Backoff<'_> {
        Backoff {
            config: self,
            retry: 0,
        }
    }
}

/// Iterator over retry delays, see [`RetryConfig::backoff`]
#[derive(Debug, Clone)]
pub struct Backoff<'a> {
    config: &'a RetryConfig,
    retry: u32,
}

impl Iterator for Backoff<'_> {
    type Item = Duration;

    fn next(&mut self) -> Option<Duration> {
        if self.retry + 1 >= self.config.max_attempts {
            return None;
        }
        self.retry += 1;
        Some(self.config.delay_for_attempt(self.retry))
    }
}

/// Value in `[0.0, 1.0)` from the std hasher's random keys
#[allow(clippy::cast_precision_loss)]
fn jitter_fraction() -> f64 {
    use std::collections::hash_map::RandomState;
    use std::hash::BuildHasher;

    let bits = RandomState::new().hash_one(Instant::now());
    (bits >> 11) as f64 / (1u64 << 53) as f64
}

/// Circuit breaker state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    /// Requests flow normally
    Closed,
    /// Requests are rejected until the reset timeout elapses
    Open,
    /// One trial request at a time is let through; a failure reopens the
    /// circuit
    HalfOpen,
}

/// Circuit breaker configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Consecutive failures that open the circuit
    pub failure_threshold: u32,
    /// Successes in half-open needed to close it again
    pub success_threshold: u32,
    /// How long the circuit stays open before trial requests, and how long
    /// a trial that never reports back blocks the next one
    #[serde(with = "serde_duration::secs")]
    pub reset_timeout: Duration,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_threshold: 5,
            success_threshold: 2,
            reset_timeout: Duration::from_secs(30),
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Phase {
    Closed { failures: u32 },
    Open { since: Instant },
    HalfOpen {
        successes: u32,
        trial_since: Option<Instant>,
    },
}

impl Phase {
    fn state(self) -> CircuitState {
        match self {
            Phase::Closed { .. } => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }
}

/// Circuit breaker shared by every request of a client
#[derive(Debug)]
pub struct CircuitBreaker {
    config: CircuitBreakerConfig,
    phase: Mutex<Phase>,
}

impl CircuitBreaker {
    /// Create a closed circuit breaker
    #[must_use]
    pub fn new(config: CircuitBreakerConfig) -> Self {
        Self {
            config,
            phase: Mutex::new(Phase::Closed { failures: 0 }),
        }
    }

    fn phase(&self) -> MutexGuard<'_, Phase> {
        // Phase is Copy and always written whole
        self.phase.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get current state
    pub fn state(&self) -> CircuitState {
        self.phase().state()
    }

    /// Whether a request may go out now
    ///
    /// An open circuit whose reset timeout has elapsed moves to half-open
    /// and lets the request through as a trial. While half-open, only one
    /// trial is out at a time; the caller that gets `true` must report back
    /// with [`record_success`](Self::record_success),
    /// [`record_failure`](Self::record_failure) or
    /// [`release`](Self::release). A trial that never reports back stops
    /// blocking others after `reset_timeout`.
    pub fn can_execute(&self) -> bool {
        let mut phase = self.phase();
        let now = Instant::now();
        match *phase {
            Phase::Closed { .. } => true,
            Phase::HalfOpen {
                successes,
                trial_since,
            } => {
                let free = trial_since
                    .is_none_or(|since| now.duration_since(since) >= self.config.reset_timeout);
                if free {
                    *phase = Phase::HalfOpen {
                        successes,
                        trial_since: Some(now),
                    };
                }
                free
            }
            Phase::Open { since } if now.duration_since(since) >= self.config.reset_timeout => {
                *phase = Phase::HalfOpen {
                    successes: 0,
                    trial_since: Some(now),
                };
                true
            }
            Phase::Open { .. } => false,
        }
    }

    /// Record a successful execution
    pub fn record_success(&self) {
        let mut phase = self.phase();
        *phase = match *phase {
            Phase::HalfOpen { successes, .. } if successes + 1 < self.config.success_threshold => {
                Phase::HalfOpen {
                    successes: successes + 1,
                    trial_since: None,
                }
            }
            Phase::Open { since } => Phase::Open { since },
            _ => Phase::Closed { failures: 0 },
        };
    }

    /// Record a failed execution
    pub fn record_failure(&self) {
        let mut phase = self.phase();
        *phase = match *phase {
            Phase::Closed { failures } if failures + 1 < self.config.failure_threshold => {
                Phase::Closed {
                    failures: failures + 1,
                }
            }
            _ => Phase::Open {
                since: Instant::now(),
            },
        };
    }

    /// Hand back a half-open trial without counting it either way
    ///
    /// For requests that ended before the service could answer.
    pub fn release(&self) {
        let mut phase = self.phase();
        if let Phase::HalfOpen { successes, .. } = *phase {
            *phase = Phase::HalfOpen {
                successes,
                trial_since: None,
            };
        }
    }

    /// Close the circuit and forget past failures
    pub fn reset(&self) {
        *self.phase() = Phase::Closed { failures: 0 };
    }
}
