//! API client
//!
//! Issues one HTTP request per call:
//! - merges default, caller, and auth headers
//! - applies query/body API key placement
//! - consults the client-side rate limiter
//! - classifies failures into the error taxonomy

use super::types::{RequestBody, RequestOptions};
use crate::auth::{ApiKeyPlacement, AuthHandler, PlacedApiKey};
use crate::error::{Error, Result};
use crate::rate_limit::{RateLimit, RateLimitConfig, SimpleRateLimiter};
use crate::types::{JsonValue, Method, StringMap};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE, RETRY_AFTER};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Configuration for the API client
#[derive(Debug, Clone)]
pub struct ApiClientConfig {
    /// Base URL relative endpoints are joined onto
    pub base_url: String,
    /// Default request timeout; none means no client-side limit
    pub timeout: Option<Duration>,
    /// Client-side sliding-window limit
    pub rate_limit: Option<RateLimitConfig>,
    /// Default headers for all requests
    pub default_headers: StringMap,
    /// User agent string
    pub user_agent: String,
}

impl Default for ApiClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: None,
            rate_limit: None,
            default_headers: StringMap::new(),
            user_agent: format!("integration-runtime/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl ApiClientConfig {
    /// Create a new config builder
    pub fn builder() -> ApiClientConfigBuilder {
        ApiClientConfigBuilder::default()
    }
}

/// Builder for API client config
#[derive(Default)]
pub struct ApiClientConfigBuilder {
    config: ApiClientConfig,
}

impl ApiClientConfigBuilder {
    /// Set the base URL
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.config.base_url = url.into();
        self
    }

    /// Set the default request timeout
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = Some(timeout);
        self
    }

    /// Set the client-side rate limit
    pub fn rate_limit(mut self, config: RateLimitConfig) -> Self {
        self.config.rate_limit = Some(config);
        self
    }

    /// Add a default header
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.config.default_headers.insert(key.into(), value.into());
        self
    }

    /// Set user agent
    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.config.user_agent = agent.into();
        self
    }

    /// Build the config
    pub fn build(self) -> ApiClientConfig {
        self.config
    }
}

/// HTTP client for one external API
pub struct ApiClient {
    client: Client,
    config: ApiClientConfig,
    auth_handler: Option<Arc<dyn AuthHandler>>,
    rate_limiter: Option<Arc<dyn RateLimit>>,
}

impl ApiClient {
    /// Create a client. `auth_handler` is used for calls that carry an
    /// auth payload.
    pub fn new(config: ApiClientConfig, auth_handler: Option<Arc<dyn AuthHandler>>) -> Result<Self> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .build()
            .map_err(|e| Error::config(format!("Failed to build HTTP client: {e}")))?;

        let rate_limiter = match config.rate_limit {
            Some(limit) => Some(Arc::new(SimpleRateLimiter::new(limit)?) as Arc<dyn RateLimit>),
            None => None,
        };

        Ok(Self {
            client,
            config,
            auth_handler,
            rate_limiter,
        })
    }

    /// Replace the client-side limiter with any [`RateLimit`]
    #[must_use]
    pub fn with_rate_limiter(mut self, limiter: Arc<dyn RateLimit>) -> Self {
        self.rate_limiter = Some(limiter);
        self
    }

    /// Get the client configuration
    pub fn config(&self) -> &ApiClientConfig {
        &self.config
    }

    /// The configured auth handler, if any
    pub fn auth_handler(&self) -> Option<&Arc<dyn AuthHandler>> {
        self.auth_handler.as_ref()
    }

    /// The client-side limiter, if any
    pub fn rate_limiter(&self) -> Option<&Arc<dyn RateLimit>> {
        self.rate_limiter.as_ref()
    }

    /// Make a GET request
    pub async fn get(&self, endpoint: &str, options: RequestOptions) -> Result<JsonValue> {
        self.request(Method::GET, endpoint, options).await
    }

    /// Make a POST request with a JSON body
    pub async fn post(&self, endpoint: &str, body: JsonValue, options: RequestOptions) -> Result<JsonValue> {
        self.request(Method::POST, endpoint, options.json(body)).await
    }

    /// Make a PUT request with a JSON body
    pub async fn put(&self, endpoint: &str, body: JsonValue, options: RequestOptions) -> Result<JsonValue> {
        self.request(Method::PUT, endpoint, options.json(body)).await
    }

    /// Make a PATCH request with a JSON body
    pub async fn patch(&self, endpoint: &str, body: JsonValue, options: RequestOptions) -> Result<JsonValue> {
        self.request(Method::PATCH, endpoint, options.json(body)).await
    }

    /// Make a DELETE request
    pub async fn delete(&self, endpoint: &str, options: RequestOptions) -> Result<JsonValue> {
        self.request(Method::DELETE, endpoint, options).await
    }

    /// Make a request and decode the response into `T`
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        options: RequestOptions,
    ) -> Result<T> {
        let value = self.request(method, endpoint, options).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Make a request.
    ///
    /// JSON responses are parsed; anything else comes back as
    /// `JsonValue::String`.
    pub async fn request(&self, method: Method, endpoint: &str, options: RequestOptions) -> Result<JsonValue> {
        let response = self.send(method, endpoint, options).await?;
        parse_body(response).await
    }

    /// Build, authenticate, and send a request; non-2xx responses become
    /// errors.
    pub(crate) async fn send(&self, method: Method, endpoint: &str, options: RequestOptions) -> Result<Response> {
        if let Some(limiter) = &self.rate_limiter {
            limiter.check_limit()?;
        }

        let RequestOptions {
            body,
            headers: extra_headers,
            auth,
            timeout,
            query,
        } = options;

        let mut headers = StringMap::new();
        if !matches!(body, Some(RequestBody::Multipart(_))) {
            headers.insert("Content-Type".to_string(), "application/json".to_string());
        }
        merge_headers(&mut headers, self.config.default_headers.clone());
        merge_headers(&mut headers, extra_headers);

        let mut url = self.resolve_url(endpoint)?;
        let mut body = body;

        if let Some(auth) = &auth {
            let handler = self
                .auth_handler
                .as_ref()
                .ok_or_else(|| Error::config("Auth payload given but no auth handler is configured"))?;
            let authed = handler.authenticate(headers.clone(), auth).await?;
            // handler output wins over caller headers regardless of case
            let added: StringMap = authed
                .into_iter()
                .filter(|(key, value)| headers.get(key) != Some(value))
                .collect();
            merge_headers(&mut headers, added);
            if let Some(key) = handler.api_key_for_placement(auth) {
                apply_placed_key(&mut url, &mut body, key)?;
            }
        }

        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }

        let mut req = self
            .client
            .request(method.into(), url.clone())
            .headers(to_header_map(&headers)?);

        if let Some(timeout) = timeout.or(self.config.timeout) {
            req = req.timeout(timeout);
        }

        req = match body {
            Some(RequestBody::Json(value)) => req.body(serde_json::to_vec(&value)?),
            Some(RequestBody::Multipart(form)) => req.multipart(form),
            None => req,
        };

        let response = match req.send().await {
            Ok(response) => response,
            Err(e) => {
                let err = Error::from(e);
                warn!("{} {} failed: {}", method, url, err);
                return Err(err);
            }
        };

        let status = response.status();
        if status.is_success() {
            debug!("Request succeeded: {} {} ({})", method, url, status.as_u16());
            Ok(response)
        } else {
            let err = error_from_response(response).await;
            warn!("{} {} returned {}: {}", method, url, status.as_u16(), err);
            Err(err)
        }
    }

    /// Join an endpoint onto the base URL; absolute URLs pass through
    pub fn resolve_url(&self, endpoint: &str) -> Result<Url> {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            return Ok(Url::parse(endpoint)?);
        }
        if self.config.base_url.is_empty() {
            return Err(Error::config(format!(
                "Relative endpoint '{endpoint}' needs a base URL"
            )));
        }

        let base = self.config.base_url.trim_end_matches('/');
        let path = endpoint.trim_start_matches('/');
        Ok(Url::parse(&format!("{base}/{path}"))?)
    }
}

impl std::fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiClient")
            .field("config", &self.config)
            .field("auth_handler", &self.auth_handler)
            .field("has_rate_limiter", &self.rate_limiter.is_some())
            .finish_non_exhaustive()
    }
}

/// Insert headers, replacing existing entries whose names differ only in case
fn merge_headers(headers: &mut StringMap, extra: StringMap) {
    for (key, value) in extra {
        headers.retain(|existing, _| !existing.eq_ignore_ascii_case(&key));
        headers.insert(key, value);
    }
}

fn to_header_map(headers: &StringMap) -> Result<HeaderMap> {
    let mut map = HeaderMap::with_capacity(headers.len());
    for (key, value) in headers {
        let name = HeaderName::from_bytes(key.as_bytes())
            .map_err(|e| Error::invalid_value(format!("headers.{key}"), e.to_string()))?;
        let value = HeaderValue::from_str(value)
            .map_err(|e| Error::invalid_value(format!("headers.{key}"), e.to_string()))?;
        map.insert(name, value);
    }
    Ok(map)
}

fn apply_placed_key(url: &mut Url, body: &mut Option<RequestBody>, key: PlacedApiKey) -> Result<()> {
    match key.placement {
        ApiKeyPlacement::Header => Ok(()),
        ApiKeyPlacement::Query => {
            url.query_pairs_mut().append_pair(&key.name, &key.value);
            Ok(())
        }
        ApiKeyPlacement::Body => {
            let body = body.get_or_insert_with(|| RequestBody::Json(JsonValue::Object(Default::default())));
            match body {
                RequestBody::Json(JsonValue::Object(map)) => {
                    map.insert(key.name, JsonValue::String(key.value));
                    Ok(())
                }
                _ => Err(Error::config(
                    "API key body placement needs a JSON object body",
                )),
            }
        }
    }
}

/// Read `Retry-After` as whole seconds
fn retry_after(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.trim().parse().ok())
}

/// Classify a non-2xx response
async fn error_from_response(response: Response) -> Error {
    let status = response.status();
    let retry_after = retry_after(&response);
    let text = response.text().await.unwrap_or_default();
    let api_response: Option<JsonValue> = serde_json::from_str(&text).ok();

    let message = api_response
        .as_ref()
        .and_then(error_message)
        .unwrap_or_else(|| status_text(status));

    match status.as_u16() {
        401 => Error::Auth {
            message,
            api_response,
        },
        429 => Error::rate_limited(message, retry_after),
        code => Error::http_status(code, message, api_response),
    }
}

/// `message` or `error` from an error body
fn error_message(body: &JsonValue) -> Option<String> {
    let field = |name: &str| match body.get(name)? {
        JsonValue::String(s) if !s.is_empty() => Some(s.clone()),
        JsonValue::Object(inner) => inner
            .get("message")
            .and_then(JsonValue::as_str)
            .map(str::to_string),
        _ => None,
    };
    field("message").or_else(|| field("error"))
}

fn status_text(status: StatusCode) -> String {
    format!(
        "HTTP {}: {}",
        status.as_u16(),
        status.canonical_reason().unwrap_or("Unknown Status")
    )
}

/// Parse a successful response: JSON when the content type says so,
/// otherwise text
pub(crate) async fn parse_body(response: Response) -> Result<JsonValue> {
    let is_json = response
        .headers()
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|ct| ct.contains("json"));

    let status = response.status();
    let text = response.text().await?;
    if !is_json {
        return Ok(JsonValue::String(text));
    }
    if text.trim().is_empty() {
        return Ok(JsonValue::Null);
    }
    serde_json::from_str(&text).map_err(|e| Error::Api {
        message: format!("Failed to decode response: {e}"),
        status_code: Some(status.as_u16()),
        api_response: None,
        retryable: false,
    })
}
