//! Request, batch, upload, health, and stream types

use crate::error::Error;
use crate::types::{JsonValue, Method, QueryParams, StringMap};
use serde::Serialize;
use std::fmt;
use std::time::Duration;

/// Outgoing request body
#[derive(Debug)]
pub enum RequestBody {
    /// Serialised as JSON; `Content-Type: application/json`
    Json(JsonValue),
    /// Multipart form; the transport sets `Content-Type` with the boundary
    Multipart(reqwest::multipart::Form),
}

impl From<JsonValue> for RequestBody {
    fn from(value: JsonValue) -> Self {
        Self::Json(value)
    }
}

/// Configuration for a single request
#[derive(Debug, Default)]
pub struct RequestOptions {
    /// Request body
    pub body: Option<RequestBody>,
    /// Extra headers; override client defaults
    pub headers: StringMap,
    /// Per-call auth payload passed to the client's auth handler
    pub auth: Option<JsonValue>,
    /// Abort the request after this long
    pub timeout: Option<Duration>,
    /// Query parameters appended to the URL
    pub query: QueryParams,
}

impl RequestOptions {
    /// Create a new request config
    pub fn new() -> Self {
        Self::default()
    }

    /// Set JSON body
    #[must_use]
    pub fn json(mut self, body: JsonValue) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    /// Set a multipart body
    #[must_use]
    pub fn multipart(mut self, form: reqwest::multipart::Form) -> Self {
        self.body = Some(RequestBody::Multipart(form));
        self
    }

    /// Add a header
    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Set the auth payload
    #[must_use]
    pub fn auth(mut self, auth: JsonValue) -> Self {
        self.auth = Some(auth);
        self
    }

    /// Set auth payload when one is given
    #[must_use]
    pub fn maybe_auth(mut self, auth: Option<JsonValue>) -> Self {
        self.auth = auth;
        self
    }

    /// Set timeout
    #[must_use]
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Add a query parameter
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }
}

/// File part for [`EnhancedApiClient::upload_file`](super::EnhancedApiClient::upload_file)
#[derive(Debug, Clone)]
pub struct FileUpload {
    /// Form field name
    pub field_name: String,
    pub file_name: String,
    pub content: Vec<u8>,
    /// Defaults to `application/octet-stream`
    pub content_type: Option<String>,
}

impl FileUpload {
    pub fn new(
        field_name: impl Into<String>,
        file_name: impl Into<String>,
        content: impl Into<Vec<u8>>,
    ) -> Self {
        Self {
            field_name: field_name.into(),
            file_name: file_name.into(),
            content: content.into(),
            content_type: None,
        }
    }

    #[must_use]
    pub fn content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }
}

/// One entry of a batch
#[derive(Debug, Clone, PartialEq)]
pub struct BatchRequest {
    pub method: Method,
    pub endpoint: String,
    pub body: Option<JsonValue>,
    pub headers: StringMap,
}

impl BatchRequest {
    pub fn new(method: Method, endpoint: impl Into<String>) -> Self {
        Self {
            method,
            endpoint: endpoint.into(),
            body: None,
            headers: StringMap::new(),
        }
    }

    #[must_use]
    pub fn body(mut self, body: JsonValue) -> Self {
        self.body = Some(body);
        self
    }

    #[must_use]
    pub fn header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// Batch execution options
#[derive(Debug, Clone, PartialEq)]
pub struct BatchOptions {
    /// Auth payload applied to every request
    pub auth: Option<JsonValue>,
    /// Requests run together per chunk
    pub concurrency: usize,
    /// Abort after the first chunk containing a failure
    pub fail_fast: bool,
}

impl Default for BatchOptions {
    fn default() -> Self {
        Self {
            auth: None,
            concurrency: 5,
            fail_fast: false,
        }
    }
}

/// Result of a health probe
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthStatus {
    pub healthy: bool,
    /// Round-trip time in milliseconds
    pub response_time_ms: u64,
    /// Response body on success; the error's API response on failure
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<JsonValue>,
}

/// A chunk of a streamed response body
#[derive(Debug, Clone, PartialEq)]
pub enum StreamChunk {
    /// Chunk that parsed as a JSON document
    Json(JsonValue),
    /// Anything else, decoded lossily as UTF-8
    Text(String),
}

impl StreamChunk {
    /// Parse a raw chunk, falling back to text
    pub fn parse(bytes: &[u8]) -> Self {
        match serde_json::from_slice(bytes) {
            Ok(value) => Self::Json(value),
            Err(_) => Self::Text(String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

type DataCallback = Box<dyn FnMut(StreamChunk) + Send>;
type ErrorCallback = Box<dyn FnOnce(Error) + Send>;
type EndCallback = Box<dyn FnOnce() + Send>;

/// Callbacks for [`EnhancedApiClient::stream`](super::EnhancedApiClient::stream)
///
/// Without an `on_error` callback, failures are returned to the caller.
#[derive(Default)]
pub struct StreamCallbacks {
    pub on_data: Option<DataCallback>,
    pub on_error: Option<ErrorCallback>,
    pub on_end: Option<EndCallback>,
}

impl StreamCallbacks {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn on_data(mut self, f: impl FnMut(StreamChunk) + Send + 'static) -> Self {
        self.on_data = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_error(mut self, f: impl FnOnce(Error) + Send + 'static) -> Self {
        self.on_error = Some(Box::new(f));
        self
    }

    #[must_use]
    pub fn on_end(mut self, f: impl FnOnce() + Send + 'static) -> Self {
        self.on_end = Some(Box::new(f));
        self
    }
}

impl fmt::Debug for StreamCallbacks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StreamCallbacks")
            .field("on_data", &self.on_data.is_some())
            .field("on_error", &self.on_error.is_some())
            .field("on_end", &self.on_end.is_some())
            .finish()
    }
}
