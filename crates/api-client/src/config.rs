//! Configuration for the Partner Sell API client
//!
//! Sources, lowest precedence first: built-in defaults for the selected
//! environment, a TOML file, then environment variables.

use crate::error::{ApiError, ApiResult};
use partnersell_core::config::ConfigFile;
use partnersell_core::rate_limit::RateLimitConfig;
use partnersell_core::retry::{CircuitBreakerConfig, RetryConfig};
use partnersell_core::serde_duration;
use serde::{Deserialize, Serialize};
use std::env;
use std::fmt;
use std::path::Path;
use std::time::Duration;

/// Default production API URL
const DEFAULT_BASE_URL: &str = "https://product-lifecycle.api.partnersell.dev/openapi/v1";

/// Default staging API URL
const STAGING_BASE_URL: &str = "https://product-lifecycle.staging.partnersell.dev/openapi/v1";

/// Local mock server URL
const DEVELOPMENT_BASE_URL: &str = "http://localhost:8080/openapi/v1";

const DEFAULT_USER_AGENT: &str = concat!("partnersell-client/", env!("CARGO_PKG_VERSION"));

/// Environment types
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    /// Local development (typically a mock server)
    Development,
    /// Staging environment
    Staging,
    /// Production environment
    #[default]
    Production,
}

impl Environment {
    /// Parse from environment variable
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Parse `PARTNERSELL_ENV` from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        match lookup("PARTNERSELL_ENV")
            .unwrap_or_default()
            .to_lowercase()
            .as_str()
        {
            "development" | "dev" | "local" => Self::Development,
            "staging" | "stage" => Self::Staging,
            _ => Self::Production,
        }
    }
}

/// Client configuration
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL every endpoint path is appended to
    pub base_url: String,
    /// API key sent in the `apikey` header
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Bearer token sent in the `Authorization` header (wins over `api_key`)
    #[serde(skip_serializing)]
    pub bearer_token: Option<String>,
    /// Request timeout
    #[serde(with = "serde_duration::secs")]
    pub timeout: Duration,
    /// Retry configuration
    pub retry: RetryConfig,
    /// Rate limit configuration
    pub rate_limit: RateLimitConfig,
    /// Circuit breaker configuration
    pub circuit_breaker: CircuitBreakerConfig,
    /// Current environment
    pub environment: Environment,
    /// `User-Agent` header value
    pub user_agent: String,
}

impl fmt::Debug for ClientConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let redact = |secret: &Option<String>| secret.as_ref().map(|_| "<redacted>");
        f.debug_struct("ClientConfig")
            .field("base_url", &self.base_url)
            .field("api_key", &redact(&self.api_key))
            .field("bearer_token", &redact(&self.bearer_token))
            .field("timeout", &self.timeout)
            .field("retry", &self.retry)
            .field("rate_limit", &self.rate_limit)
            .field("circuit_breaker", &self.circuit_breaker)
            .field("environment", &self.environment)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::production()
    }
}

impl ClientConfig {
    /// Create configuration from environment variables
    ///
    /// Reads the following environment variables:
    /// - `PARTNERSELL_ENV`: Environment (development/staging/production)
    /// - `PARTNERSELL_URL`: Base URL for the API
    /// - `PARTNERSELL_API_KEY`: API key
    /// - `PARTNERSELL_BEARER_TOKEN`: Bearer token
    /// - `PARTNERSELL_TIMEOUT_SECS`: Request timeout in seconds
    pub fn from_env() -> ApiResult<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Create configuration from an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> ApiResult<Self> {
        let environment = Environment::from_lookup(&lookup);
        Self::for_environment(environment).overlay(&lookup)
    }

    /// Load configuration from a TOML file, then apply environment variables
    ///
    /// Without an explicit path the standard locations are searched
    /// (`.partnersell.toml`, `partnersell.toml`, then the user config
    /// directory); if none exists the defaults are used.
    pub fn load(path: Option<&Path>) -> ApiResult<Self> {
        let file = ConfigFile::<Self>::load(path)?;
        if let Some(ref p) = file.path {
            tracing::debug!(path = %p.display(), "Loaded client configuration file");
        }
        file.value.overlay(|key| env::var(key).ok())
    }

    /// Preset for an environment
    #[must_use]
    pub fn for_environment(environment: Environment) -> Self {
        match environment {
            Environment::Development => Self::development(),
            Environment::Staging => Self::staging(),
            Environment::Production => Self::production(),
        }
    }

    /// Create development configuration (local mock server)
    #[must_use]
    pub fn development() -> Self {
        Self {
            base_url: DEVELOPMENT_BASE_URL.to_string(),
            api_key: None,
            bearer_token: None,
            timeout: Duration::from_secs(10),
            retry: RetryConfig::quick(),
            rate_limit: RateLimitConfig::per_minute(1000), // More lenient locally
            circuit_breaker: CircuitBreakerConfig::default(),
            environment: Environment::Development,
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }

    /// Create staging configuration
    #[must_use]
    pub fn staging() -> Self {
        Self {
            base_url: STAGING_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryConfig::default(),
            rate_limit: RateLimitConfig::per_minute(200),
            environment: Environment::Staging,
            ..Self::development()
        }
    }

    /// Create production configuration
    #[must_use]
    pub fn production() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: Duration::from_secs(30),
            retry: RetryConfig::patient(),
            rate_limit: RateLimitConfig::per_minute(100),
            environment: Environment::Production,
            ..Self::development()
        }
    }

    fn overlay(mut self, lookup: impl Fn(&str) -> Option<String>) -> ApiResult<Self> {
        if let Some(env_name) = lookup("PARTNERSELL_ENV") {
            if !env_name.is_empty() {
                self.environment = Environment::from_lookup(&lookup);
            }
        }
        if let Some(url) = lookup("PARTNERSELL_URL") {
            self.base_url = url;
        }
        if let Some(key) = lookup("PARTNERSELL_API_KEY") {
            self.api_key = Some(key);
        }
        if let Some(token) = lookup("PARTNERSELL_BEARER_TOKEN") {
            self.bearer_token = Some(token);
        }
        if let Some(secs) = lookup("PARTNERSELL_TIMEOUT_SECS") {
            let secs: u64 = secs.trim().parse().map_err(|_| {
                ApiError::config(format!("PARTNERSELL_TIMEOUT_SECS is not a number: {secs}"))
            })?;
            self.timeout = Duration::from_secs(secs);
        }
        Ok(self)
    }

    /// Builder-style method to set base URL
    #[must_use]
    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Builder-style method to set API key
    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Builder-style method to set bearer token
    #[must_use]
    pub fn with_bearer_token(mut self, token: impl Into<String>) -> Self {
        self.bearer_token = Some(token.into());
        self
    }

    /// Builder-style method to set timeout
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Builder-style method to set retry config
    #[must_use]
    pub fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }

    /// Builder-style method to set rate limit config
    #[must_use]
    pub fn with_rate_limit(mut self, rate_limit: RateLimitConfig) -> Self {
        self.rate_limit = rate_limit;
        self
    }

    /// Builder-style method to set circuit breaker config
    #[must_use]
    pub fn with_circuit_breaker(mut self, circuit_breaker: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = circuit_breaker;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> ApiResult<()> {
        if self.base_url.is_empty() {
            return Err(ApiError::config("base_url cannot be empty"));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ApiError::config("base_url must start with http:// or https://"));
        }

        if self.timeout.is_zero() {
            return Err(ApiError::config("timeout cannot be zero"));
        }

        self.retry.validate().map_err(ApiError::config)?;

        Ok(())
    }
}
