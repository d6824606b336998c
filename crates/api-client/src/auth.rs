//! Request authentication
//!
//! Authentication is injected per attempt, after the request is built and
//! before it is sent, so refreshed credentials apply to retries too.

use crate::config::ClientConfig;
use crate::error::{ApiError, ApiResult};
use reqwest::Request;
use reqwest::header::{AUTHORIZATION, HeaderName, HeaderValue};
use std::fmt;

/// Header carrying a raw API key
pub const API_KEY_HEADER: &str = "apikey";

/// Adds credentials to an outgoing request
pub trait Authenticator: Send + Sync + fmt::Debug {
    /// Mutate `request` so the service accepts it
    fn authenticate(&self, request: &mut Request) -> ApiResult<()>;
}

/// Sends requests without credentials
#[derive(Debug, Clone, Copy, Default)]
pub struct NoAuth;

impl Authenticator for NoAuth {
    fn authenticate(&self, _request: &mut Request) -> ApiResult<()> {
        Ok(())
    }
}

/// `Authorization: Bearer <token>`
#[derive(Clone)]
pub struct BearerToken(String);

impl BearerToken {
    /// Wrap a bearer token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for BearerToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("BearerToken(<redacted>)")
    }
}

impl Authenticator for BearerToken {
    fn authenticate(&self, request: &mut Request) -> ApiResult<()> {
        let mut value = HeaderValue::from_str(&format!("Bearer {}", self.0))
            .map_err(|_| ApiError::auth("bearer token contains invalid header characters"))?;
        value.set_sensitive(true);
        request.headers_mut().insert(AUTHORIZATION, value);
        Ok(())
    }
}

/// API key in the `apikey` header
#[derive(Clone)]
pub struct ApiKey(String);

impl ApiKey {
    /// Wrap an API key
    pub fn new(key: impl Into<String>) -> Self {
        Self(key.into())
    }
}

impl fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ApiKey(<redacted>)")
    }
}

impl Authenticator for ApiKey {
    fn authenticate(&self, request: &mut Request) -> ApiResult<()> {
        let mut value = HeaderValue::from_str(&self.0)
            .map_err(|_| ApiError::auth("API key contains invalid header characters"))?;
        value.set_sensitive(true);
        request
            .headers_mut()
            .insert(HeaderName::from_static(API_KEY_HEADER), value);
        Ok(())
    }
}

/// Pick the authenticator matching the configured credentials
///
/// A bearer token wins over an API key.
#[must_use]
pub fn from_config(config: &ClientConfig) -> Box<dyn Authenticator> {
    match (&config.bearer_token, &config.api_key) {
        (Some(token), _) => Box::new(BearerToken::new(token.clone())),
        (None, Some(key)) => Box::new(ApiKey::new(key.clone())),
        (None, None) => Box::new(NoAuth),
    }
}
