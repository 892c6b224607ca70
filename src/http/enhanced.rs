//! Convenience layer over [`ApiClient`]
//!
//! Query-string construction, pagination, multipart upload, chunked
//! batches, health probes, and streamed bodies. Every call goes through
//! [`ApiClient::request`] (or its send path), so auth, rate limiting, and
//! error classification behave identically.

use super::client::{ApiClient, ApiClientConfig};
use super::types::{
    BatchOptions, BatchRequest, FileUpload, HealthStatus, RequestBody, RequestOptions,
    StreamCallbacks, StreamChunk,
};
use crate::auth::AuthHandler;
use crate::error::{Error, Result};
use crate::pagination::{
    extract_page, PageNumberPaginator, PaginateOptions, PaginatedResult, PaginationState,
};
use crate::types::{JsonValue, Method, QueryParams};
use futures::StreamExt;
use reqwest::multipart::{Form, Part};
use serde::de::DeserializeOwned;
use std::ops::Deref;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

/// Endpoint probed by [`EnhancedApiClient::health_check`] by default
pub const DEFAULT_HEALTH_ENDPOINT: &str = "/health";

/// Timeout applied to health probes
pub const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// [`ApiClient`] plus higher-level helpers
#[derive(Debug)]
pub struct EnhancedApiClient {
    inner: ApiClient,
}

impl EnhancedApiClient {
    /// Create a client
    pub fn new(config: ApiClientConfig, auth_handler: Option<Arc<dyn AuthHandler>>) -> Result<Self> {
        Ok(Self {
            inner: ApiClient::new(config, auth_handler)?,
        })
    }

    /// Wrap an existing client
    pub fn from_client(inner: ApiClient) -> Self {
        Self { inner }
    }

    /// Unwrap the underlying client
    pub fn into_inner(self) -> ApiClient {
        self.inner
    }

    /// Resolve `endpoint` and append `params` to its query string
    pub fn build_url(&self, endpoint: &str, params: &QueryParams) -> Result<Url> {
        let mut url = self.inner.resolve_url(endpoint)?;
        if !params.is_empty() {
            url.query_pairs_mut().extend_pairs(params);
        }
        Ok(url)
    }

    /// GET with query parameters
    pub async fn get_with_params(
        &self,
        endpoint: &str,
        params: &QueryParams,
        options: RequestOptions,
    ) -> Result<JsonValue> {
        let url = self.build_url(endpoint, params)?;
        self.inner.request(Method::GET, url.as_str(), options).await
    }

    /// Fetch pages sequentially and collect their records
    pub async fn paginate<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        options: PaginateOptions,
    ) -> Result<PaginatedResult<T>> {
        let paginator = PageNumberPaginator::new(&options);
        let mut state = PaginationState::new();
        let mut data = Vec::new();

        while paginator.should_fetch(&state) {
            let params = paginator.page_params(&options.query, &state);
            let body = self
                .get_with_params(
                    endpoint,
                    &params,
                    RequestOptions::new().maybe_auth(options.auth.clone()),
                )
                .await?;

            let page = extract_page(body)?;
            let next = paginator.process_page(&page, &mut state);
            debug!(
                "Fetched page {} of {} ({} records)",
                state.page - 1,
                endpoint,
                page.items.len()
            );

            for item in page.items {
                let record = serde_json::from_value(item)
                    .map_err(|e| Error::api(format!("Pagination failed: {e}")))?;
                data.push(record);
            }

            if next.is_done() {
                break;
            }
        }

        Ok(PaginatedResult {
            data,
            total_pages: state.total_pages,
            current_page: state.page - 1,
            has_more: state.has_more,
        })
    }

    /// POST a multipart form holding `file` plus any extra text fields
    pub async fn upload_file(
        &self,
        endpoint: &str,
        file: FileUpload,
        fields: impl IntoIterator<Item = (String, String)>,
        mut options: RequestOptions,
    ) -> Result<JsonValue> {
        let content_type = file
            .content_type
            .as_deref()
            .unwrap_or("application/octet-stream");
        let part = Part::bytes(file.content)
            .file_name(file.file_name)
            .mime_str(content_type)
            .map_err(|e| Error::invalid_value("content_type", e.to_string()))?;

        let mut form = Form::new().part(file.field_name, part);
        for (key, value) in fields {
            form = form.text(key, value);
        }

        // the transport must set the multipart boundary itself
        options
            .headers
            .retain(|key, _| !key.eq_ignore_ascii_case("content-type"));
        options.body = Some(RequestBody::Multipart(form));

        self.inner.request(Method::POST, endpoint, options).await
    }

    /// Run requests in chunks of `options.concurrency`, collecting one
    /// result per request in input order.
    ///
    /// With `fail_fast`, the first failure is returned once its chunk has
    /// settled and later chunks are not started.
    pub async fn batch(
        &self,
        requests: Vec<BatchRequest>,
        options: BatchOptions,
    ) -> Result<Vec<Result<JsonValue>>> {
        let chunk_size = options.concurrency.max(1);
        let mut results = Vec::with_capacity(requests.len());

        for chunk in requests.chunks(chunk_size) {
            let calls = chunk.iter().map(|req| {
                let request_options = RequestOptions {
                    body: req.body.clone().map(RequestBody::Json),
                    headers: req.headers.clone(),
                    auth: options.auth.clone(),
                    ..RequestOptions::default()
                };
                self.inner.request(req.method, &req.endpoint, request_options)
            });
            let mut chunk_results = futures::future::join_all(calls).await;

            if options.fail_fast {
                if let Some(pos) = chunk_results.iter().position(Result::is_err) {
                    if let Err(err) = chunk_results.swap_remove(pos) {
                        debug!("Batch aborted after {} results", results.len());
                        return Err(err);
                    }
                }
            }
            results.extend(chunk_results);
        }

        Ok(results)
    }

    /// Time a GET against `endpoint`. Never fails; errors are reported as
    /// unhealthy.
    pub async fn health_check(&self, endpoint: &str, auth: Option<JsonValue>) -> HealthStatus {
        let start = Instant::now();
        let result = self
            .inner
            .get(
                endpoint,
                RequestOptions::new()
                    .maybe_auth(auth)
                    .timeout(HEALTH_CHECK_TIMEOUT),
            )
            .await;
        let response_time_ms = start.elapsed().as_millis() as u64;

        match result {
            Ok(details) => HealthStatus {
                healthy: true,
                response_time_ms,
                details: Some(details),
            },
            Err(e) => {
                info!("Health check against {} failed: {}", endpoint, e);
                HealthStatus {
                    healthy: false,
                    response_time_ms,
                    details: e.api_response().cloned(),
                }
            }
        }
    }

    /// GET `endpoint` and hand each body chunk to `callbacks.on_data`,
    /// parsed as JSON when possible.
    ///
    /// Errors go to `on_error` when set (and the call returns `Ok`),
    /// otherwise they are returned.
    pub async fn stream(
        &self,
        endpoint: &str,
        auth: Option<JsonValue>,
        callbacks: StreamCallbacks,
    ) -> Result<()> {
        let StreamCallbacks {
            mut on_data,
            on_error,
            on_end,
        } = callbacks;

        let result = async {
            let response = self
                .inner
                .send(
                    Method::GET,
                    endpoint,
                    RequestOptions::new()
                        .header("Accept", "application/json")
                        .maybe_auth(auth),
                )
                .await?;

            let mut body = std::pin::pin!(response.bytes_stream());
            while let Some(chunk) = body.next().await {
                let bytes = chunk?;
                if bytes.is_empty() {
                    continue;
                }
                if let Some(on_data) = on_data.as_mut() {
                    on_data(StreamChunk::parse(&bytes));
                }
            }
            Ok::<(), Error>(())
        }
        .await;

        match result {
            Ok(()) => {
                if let Some(on_end) = on_end {
                    on_end();
                }
                Ok(())
            }
            Err(e) => match on_error {
                Some(on_error) => {
                    on_error(e);
                    Ok(())
                }
                None => Err(e),
            },
        }
    }
}

impl Deref for EnhancedApiClient {
    type Target = ApiClient;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl From<ApiClient> for EnhancedApiClient {
    fn from(inner: ApiClient) -> Self {
        Self::from_client(inner)
    }
}
