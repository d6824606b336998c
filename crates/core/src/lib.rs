//! Shared HTTP-core utilities for the Partner Sell SDK
//!
//! This crate holds the pieces every request pipeline leans on but that have
//! nothing to do with any particular endpoint:
//!
//! - **Error handling**: Errors with codes, context, and recovery suggestions
//! - **Retry**: Exponential backoff configuration and a circuit breaker
//! - **Rate limiting**: Per-key token buckets
//! - **Configuration**: TOML file discovery and loading
//!
//! # Example
//!
//! ```rust
//! use partnersell_core::retry::{CircuitBreaker, CircuitBreakerConfig, RetryConfig};
//!
//! let retry = RetryConfig::quick();
//! assert_eq!(retry.max_attempts, 3);
//!
//! let breaker = CircuitBreaker::new(CircuitBreakerConfig::default());
//! assert!(breaker.can_execute());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod config;
pub mod error;
pub mod rate_limit;
pub mod retry;
pub mod serde_duration;

pub use error::{Error, ErrorCode, Result, ResultExt};

/// Re-export commonly used types
pub mod prelude {
    pub use crate::config::ConfigFile;
    pub use crate::error::{Error, ErrorCode, Result, ResultExt};
    pub use crate::rate_limit::{RateLimitConfig, RateLimiter};
    pub use crate::retry::{CircuitBreaker, CircuitBreakerConfig, CircuitState, RetryConfig};
}
