//! Middleware components for request/response processing
//!
//! Resilience policy types live in `partnersell-core`; they are re-exported
//! here so client configuration can be written against this crate alone.

pub use crate::auth::{ApiKey, Authenticator, BearerToken, NoAuth};
pub use partnersell_core::rate_limit::{RateLimitConfig, RateLimitStatus, RateLimiter};
pub use partnersell_core::retry::{CircuitBreaker, CircuitBreakerConfig, CircuitState, RetryConfig};
