//! Main API client implementation

use crate::auth::{self, Authenticator};
use crate::config::ClientConfig;
use crate::endpoints::RegistrationsApi;
use crate::error::{ApiError, ApiResult};
use partnersell_core::rate_limit::{RateLimitStatus, RateLimiter};
use partnersell_core::retry::{CircuitBreaker, CircuitState};
use partnersell_patch::{MergePatch, PatchDocument, attach_as_request_body};
use reqwest::header::{ACCEPT, CONTENT_TYPE, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Method, Response, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{Span, debug, instrument, warn};
use uuid::Uuid;

/// Request correlation ID header
const X_REQUEST_ID: &str = "X-Request-ID";

const JSON_CONTENT_TYPE: &str = "application/json";

/// Partner Sell API client with built-in resilience patterns
///
/// This client wraps `reqwest` and adds:
/// - Retry with exponential backoff for idempotent methods
/// - Circuit breaker to prevent cascading failures
/// - Rate limiting to avoid throttling
/// - Request correlation IDs for tracing
#[derive(Clone)]
pub struct PartnerSellClient {
    inner: Client,
    base_url: Url,
    config: Arc<ClientConfig>,
    authenticator: Arc<dyn Authenticator>,
    circuit_breaker: Arc<CircuitBreaker>,
    rate_limiter: Arc<RateLimiter>,
}

/// Body of an outgoing request, kept serialized so retries resend the same bytes
enum RequestBody<'a> {
    Empty,
    Json(Vec<u8>),
    MergePatch(&'a PatchDocument),
}

impl fmt::Debug for PartnerSellClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PartnerSellClient")
            .field("base_url", &self.base_url.as_str())
            .field("authenticator", &self.authenticator)
            .field("circuit_state", &self.circuit_state())
            .finish_non_exhaustive()
    }
}

impl PartnerSellClient {
    /// Create a new client with configuration from file and environment
    pub fn new() -> ApiResult<Self> {
        let config = ClientConfig::load(None)?;
        Self::with_config(config)
    }

    /// Create a new client with specific configuration
    pub fn with_config(config: ClientConfig) -> ApiResult<Self> {
        config.validate()?;

        let base_url = Url::parse(&config.base_url)
            .map_err(|e| ApiError::InvalidUrl(format!("{}: {e}", config.base_url)))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::InvalidUrl(config.base_url.clone()));
        }

        let mut default_headers = HeaderMap::new();
        default_headers.insert(ACCEPT, HeaderValue::from_static(JSON_CONTENT_TYPE));
        default_headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&config.user_agent)
                .map_err(|_| ApiError::config("user_agent is not a valid header value"))?,
        );

        let inner = Client::builder()
            .timeout(config.timeout)
            .default_headers(default_headers)
            .build()
            .map_err(ApiError::Request)?;

        let authenticator: Arc<dyn Authenticator> = Arc::from(auth::from_config(&config));
        let circuit_breaker = Arc::new(CircuitBreaker::new(config.circuit_breaker.clone()));
        let rate_limiter = Arc::new(RateLimiter::new(config.rate_limit.clone()));

        Ok(Self {
            inner,
            base_url,
            config: Arc::new(config),
            authenticator,
            circuit_breaker,
            rate_limiter,
        })
    }

    /// Replace the authenticator picked from the configuration
    #[must_use]
    pub fn with_authenticator(mut self, authenticator: impl Authenticator + 'static) -> Self {
        self.authenticator = Arc::new(authenticator);
        self
    }

    /// Get the current configuration
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Get the base URL
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Get circuit breaker state
    #[must_use]
    pub fn circuit_state(&self) -> CircuitState {
        self.circuit_breaker.state()
    }

    /// Reset the circuit breaker
    pub fn reset_circuit(&self) {
        self.circuit_breaker.reset();
    }

    /// Rate limit state for an endpoint group (first path segment)
    #[must_use]
    pub fn rate_limit_status(&self, group: &str) -> RateLimitStatus {
        self.rate_limiter.status(group)
    }

    /// Reset rate limits for an endpoint group
    pub fn reset_rate_limit(&self, group: &str) {
        self.rate_limiter.reset(group);
    }

    /// Access registration endpoints
    #[must_use]
    pub fn registrations(&self) -> RegistrationsApi {
        RegistrationsApi::new(self.clone())
    }

    // -------------------------------------------------------------------------
    // Low-level HTTP methods with resilience
    // -------------------------------------------------------------------------

    /// Perform a GET request
    ///
    /// `path` is given as segments; each one is percent-encoded on its own.
    #[instrument(skip(self), fields(request_id))]
    pub async fn get<T: DeserializeOwned>(&self, path: &[&str]) -> ApiResult<T> {
        self.request(Method::GET, path, RequestBody::Empty).await
    }

    /// Perform a POST request with a JSON body
    ///
    /// POST is sent once; it is never retried.
    #[instrument(skip(self, body), fields(request_id))]
    pub async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(
        &self,
        path: &[&str],
        body: &B,
    ) -> ApiResult<T> {
        let bytes = serde_json::to_vec(body)?;
        self.request(Method::POST, path, RequestBody::Json(bytes)).await
    }

    /// Perform a PATCH request with a merge patch built from `patch`
    ///
    /// The patch document is constructed before anything else happens; if
    /// that fails no request is made.
    #[instrument(skip(self, patch), fields(request_id))]
    pub async fn patch<T: DeserializeOwned, P: MergePatch + ?Sized>(
        &self,
        path: &[&str],
        patch: &P,
    ) -> ApiResult<T> {
        let document = patch.to_patch_document()?;
        self.request(Method::PATCH, path, RequestBody::MergePatch(&document))
            .await
    }

    /// Perform a PATCH request with an already built merge patch document
    #[instrument(skip(self, document), fields(request_id, fields = document.len()))]
    pub async fn patch_document<T: DeserializeOwned>(
        &self,
        path: &[&str],
        document: &PatchDocument,
    ) -> ApiResult<T> {
        self.request(Method::PATCH, path, RequestBody::MergePatch(document))
            .await
    }

    /// Perform a DELETE request
    #[instrument(skip(self), fields(request_id))]
    pub async fn delete<T: DeserializeOwned>(&self, path: &[&str]) -> ApiResult<T> {
        self.request(Method::DELETE, path, RequestBody::Empty).await
    }

    /// Resolve path segments against the base URL
    ///
    /// Each segment is percent-encoded as a single path segment.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidUrl`] for an empty, `.` or `..` segment. The URL
    /// parser would drop or collapse those and address a different resource.
    pub fn url_for(&self, path: &[&str]) -> ApiResult<Url> {
        if let Some(bad) = path.iter().copied().find(|s| matches!(*s, "" | "." | "..")) {
            return Err(ApiError::InvalidUrl(format!(
                "path segment {bad:?} in /{}",
                path.join("/")
            )));
        }
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| ApiError::InvalidUrl(self.base_url.to_string()))?
            .pop_if_empty()
            .extend(path);
        Ok(url)
    }

    /// Execute a request with full resilience patterns
    async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &[&str],
        body: RequestBody<'_>,
    ) -> ApiResult<T> {
        let url = self.url_for(path)?;
        let request_id = Uuid::new_v4().to_string();
        Span::current().record("request_id", request_id.as_str());

        // Check rate limiter
        let rate_limit_key = path.first().copied().unwrap_or("default");
        if let Err(wait) = self.rate_limiter.acquire(rate_limit_key) {
            warn!(
                url = %url,
                key = rate_limit_key,
                retry_in_ms = wait.as_millis(),
                "Rate limited"
            );
            return Err(ApiError::RateLimited);
        }

        // Last gate: from here on every outcome is reported to the breaker
        if !self.circuit_breaker.can_execute() {
            warn!(url = %url, "Circuit breaker is open, rejecting request");
            return Err(ApiError::CircuitOpen);
        }

        self.execute_with_retry(&request_id, &method, &url, &body)
            .await
    }

    /// Execute request with retry logic
    async fn execute_with_retry<T: DeserializeOwned>(
        &self,
        request_id: &str,
        method: &Method,
        url: &Url,
        body: &RequestBody<'_>,
    ) -> ApiResult<T> {
        let mut delays = self.config.retry.backoff();
        let retry_allowed = is_retry_safe(method);
        let mut attempt: u32 = 0;

        loop {
            attempt += 1;
            let start = Instant::now();

            let error = match self.execute_once(request_id, method, url, body).await {
                Ok(value) => {
                    self.circuit_breaker.record_success();
                    debug!(
                        attempt = attempt,
                        elapsed_ms = start.elapsed().as_millis(),
                        "Request succeeded"
                    );
                    return Ok(value);
                }
                Err(e) => e,
            };

            if !error.is_retryable() {
                // A 4xx or an undecodable body still means the service answered
                if error.status().is_some() || matches!(error, ApiError::Json(_)) {
                    self.circuit_breaker.record_success();
                } else {
                    self.circuit_breaker.release();
                }
                debug!(attempt = attempt, error = %error, "Request failed, not retrying");
                return Err(error);
            }

            self.circuit_breaker.record_failure();

            let next_delay = if retry_allowed { delays.next() } else { None };
            let Some(delay) = next_delay else {
                warn!(attempt = attempt, error = %error, "Request failed, giving up");
                if attempt == 1 {
                    return Err(error);
                }
                return Err(ApiError::RetriesExhausted {
                    attempts: attempt,
                    last_error: error.to_string(),
                });
            };

            if !self.circuit_breaker.can_execute() {
                warn!(attempt = attempt, "Circuit breaker opened during retries");
                return Err(ApiError::CircuitOpen);
            }

            debug!(
                attempt = attempt,
                delay_ms = delay.as_millis(),
                error = %error,
                "Request failed, retrying after delay"
            );
            tokio::time::sleep(delay).await;
        }
    }

    /// Execute a single request without retry
    async fn execute_once<T: DeserializeOwned>(
        &self,
        request_id: &str,
        method: &Method,
        url: &Url,
        body: &RequestBody<'_>,
    ) -> ApiResult<T> {
        let mut request = self
            .inner
            .request(method.clone(), url.clone())
            .header(X_REQUEST_ID, request_id)
            .build()?;

        self.authenticator.authenticate(&mut request)?;

        match body {
            RequestBody::Empty => {}
            RequestBody::Json(bytes) => {
                request
                    .headers_mut()
                    .insert(CONTENT_TYPE, HeaderValue::from_static(JSON_CONTENT_TYPE));
                *request.body_mut() = Some(bytes.clone().into());
            }
            RequestBody::MergePatch(document) => attach_as_request_body(document, &mut request)?,
        }

        let timeout = self.config.retry.attempt_timeout.unwrap_or(self.config.timeout);
        *request.timeout_mut() = Some(timeout);

        let response = self.inner.execute(request).await.map_err(|e| {
            if e.is_timeout() {
                ApiError::Timeout(timeout)
            } else {
                ApiError::Request(e)
            }
        })?;

        Self::handle_response(response).await
    }

    /// Handle HTTP response and deserialize
    ///
    /// An empty success body decodes as JSON `null`, so `()` and `Option<T>`
    /// work for `204 No Content`.
    async fn handle_response<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
        let status = response.status();

        if status.is_success() {
            let bytes = response.bytes().await?;
            let body: &[u8] = if bytes.is_empty() { b"null" } else { &bytes };
            Ok(serde_json::from_slice(body)?)
        } else {
            let message = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            Err(ApiError::api_response(status.as_u16(), message))
        }
    }
}

/// Methods whose requests may be sent more than once
///
/// PATCH qualifies because merge patches are idempotent.
fn is_retry_safe(method: &Method) -> bool {
    matches!(
        *method,
        Method::GET | Method::HEAD | Method::OPTIONS | Method::PUT | Method::DELETE | Method::PATCH
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use partnersell_core::retry::RetryConfig;
    use partnersell_patch::Field;
    use serde::Serializer;
    use std::time::Duration;
    use tokio_test::assert_err;
    use wiremock::matchers::{any, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(base_url: &str) -> PartnerSellClient {
        let config = ClientConfig::development()
            .with_base_url(base_url)
            .with_retry(RetryConfig {
                max_attempts: 2,
                initial_delay: Duration::from_millis(1),
                max_delay: Duration::from_millis(1),
                jitter: false,
                ..RetryConfig::default()
            });
        PartnerSellClient::with_config(config).unwrap()
    }

    struct Unencodable;

    impl Serialize for Unencodable {
        fn serialize<S: Serializer>(&self, _serializer: S) -> Result<S::Ok, S::Error> {
            Err(serde::ser::Error::custom("not representable"))
        }
    }

    impl<'de> serde::Deserialize<'de> for Unencodable {
        fn deserialize<D: serde::Deserializer<'de>>(_deserializer: D) -> Result<Self, D::Error> {
            Ok(Self)
        }
    }

    partnersell_patch::merge_patch! {
        #[derive(Default)]
        struct BrokenPatch {
            name: String,
            payload: Unencodable,
        }
    }

    #[test]
    fn test_client_creation() {
        let client = PartnerSellClient::with_config(ClientConfig::development());
        assert!(client.is_ok());
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let result = PartnerSellClient::with_config(ClientConfig::default().with_base_url(""));
        assert!(matches!(result, Err(ApiError::Config(_))));
    }

    #[test]
    fn test_url_for_encodes_segments() {
        let client = client_for("https://partners.example.com/openapi/v1/");

        let url = client.url_for(&["registration", "a b/c"]).unwrap();

        assert_eq!(
            url.as_str(),
            "https://partners.example.com/openapi/v1/registration/a%20b%2Fc"
        );
    }

    #[test]
    fn test_url_for_without_trailing_slash() {
        let client = client_for("https://partners.example.com/openapi/v1");
        let url = client.url_for(&["registration"]).unwrap();
        assert_eq!(url.path(), "/openapi/v1/registration");
    }

    #[test]
    fn test_url_for_rejects_dot_and_empty_segments() {
        let client = client_for("https://partners.example.com/openapi/v1");

        for id in ["", ".", ".."] {
            let result = client.url_for(&["registration", id]);
            assert!(matches!(result, Err(ApiError::InvalidUrl(_))), "segment {id:?}");
        }
        assert!(client.url_for(&["registration", "..."]).is_ok());
    }

    #[test]
    fn test_retry_safe_methods() {
        assert!(is_retry_safe(&Method::GET));
        assert!(is_retry_safe(&Method::PATCH));
        assert!(!is_retry_safe(&Method::POST));
    }

    #[tokio::test]
    async fn test_patch_serialization_failure_sends_nothing() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let patch = BrokenPatch {
            name: Field::Value("Acme".to_string()),
            payload: Field::Value(Unencodable),
        };

        let err = assert_err!(
            client
                .patch::<serde_json::Value, _>(&["registration", "r-1"], &patch)
                .await
        );
        assert!(matches!(err, ApiError::Serialization(_)));
        assert!(!err.is_retryable());
        assert_eq!(client.circuit_state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_request_id_header_is_sent() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/registration/r-1"))
            .and(header("accept", JSON_CONTENT_TYPE))
            .and(wiremock::matchers::header_exists(X_REQUEST_ID))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server.uri());
        let body: serde_json::Value = client.get(&["registration", "r-1"]).await.unwrap();
        assert_eq!(body["ok"], true);
    }

    #[tokio::test]
    async fn test_open_circuit_rejects_without_request() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let mut config = ClientConfig::development()
            .with_base_url(server.uri())
            .with_retry(RetryConfig::no_retry());
        config.circuit_breaker.failure_threshold = 1;
        let client = PartnerSellClient::with_config(config).unwrap();

        let first = client.get::<serde_json::Value>(&["registration"]).await;
        assert!(matches!(first, Err(ApiError::ApiResponse { status: 503, .. })));
        assert_eq!(client.circuit_state(), CircuitState::Open);

        let second = client.get::<serde_json::Value>(&["registration"]).await;
        assert!(matches!(second, Err(ApiError::CircuitOpen)));
        assert_eq!(server.received_requests().await.map_or(0, |r| r.len()), 1);

        client.reset_circuit();
        assert_eq!(client.circuit_state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_client_error_on_trial_closes_circuit() {
        let server = MockServer::start().await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(503))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let mut config = ClientConfig::development()
            .with_base_url(server.uri())
            .with_retry(RetryConfig::no_retry());
        config.circuit_breaker.failure_threshold = 1;
        config.circuit_breaker.success_threshold = 1;
        config.circuit_breaker.reset_timeout = Duration::from_millis(20);
        let client = PartnerSellClient::with_config(config).unwrap();

        assert_err!(client.get::<serde_json::Value>(&["registration", "r-1"]).await);
        assert_eq!(client.circuit_state(), CircuitState::Open);

        tokio::time::sleep(Duration::from_millis(30)).await;
        let trial = client.get::<serde_json::Value>(&["registration", "r-1"]).await;

        assert!(matches!(trial, Err(ApiError::ApiResponse { status: 404, .. })));
        assert_eq!(client.circuit_state(), CircuitState::Closed);
    }

    #[tokio::test]
    async fn test_patch_document_sends_document_bytes() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/registration/r-1"))
            .and(header("content-type", partnersell_patch::MERGE_PATCH_CONTENT_TYPE))
            .and(wiremock::matchers::body_string(r#"{"name":null}"#))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        let document = BrokenPatch {
            name: Field::Null,
            ..Default::default()
        }
        .to_patch_document()
        .unwrap();

        let client = client_for(&server.uri());
        let result: Option<serde_json::Value> = client
            .patch_document(&["registration", "r-1"], &document)
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
