//! Pagination types
//!
//! Options for a paginated fetch, the per-run state, and the collected
//! result.

use crate::types::{JsonValue, QueryParams};
use serde::Serialize;

/// Outcome of processing one page
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NextPage {
    /// Request this page next
    Continue(u32),
    /// No more pages
    Done,
}

impl NextPage {
    /// Check if this is a done result
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Options for [`EnhancedApiClient::paginate`](crate::http::EnhancedApiClient::paginate)
#[derive(Debug, Clone, PartialEq)]
pub struct PaginateOptions {
    /// Extra query parameters sent with every page
    pub query: QueryParams,
    /// Page number parameter name
    pub page_param: String,
    /// Page size parameter name
    pub limit_param: String,
    /// Page size
    pub limit: u32,
    /// Upper bound on pages fetched
    pub max_pages: u32,
    /// Per-call auth payload
    pub auth: Option<JsonValue>,
}

impl Default for PaginateOptions {
    fn default() -> Self {
        Self {
            query: QueryParams::new(),
            page_param: "page".to_string(),
            limit_param: "limit".to_string(),
            limit: 50,
            max_pages: 10,
            auth: None,
        }
    }
}

impl PaginateOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a query parameter sent with every page
    #[must_use]
    pub fn query(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.query.push((key.into(), value.into()));
        self
    }

    /// Rename the page and page size parameters
    #[must_use]
    pub fn params(mut self, page_param: impl Into<String>, limit_param: impl Into<String>) -> Self {
        self.page_param = page_param.into();
        self.limit_param = limit_param.into();
        self
    }

    #[must_use]
    pub fn limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    #[must_use]
    pub fn max_pages(mut self, max_pages: u32) -> Self {
        self.max_pages = max_pages;
        self
    }

    #[must_use]
    pub fn auth(mut self, auth: JsonValue) -> Self {
        self.auth = Some(auth);
        self
    }
}

/// Pagination metadata read from a response envelope
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PageMeta {
    /// Explicit `hasNext` / `has_next` flag
    pub has_next: Option<bool>,
    /// Page number the server says it returned
    pub page: Option<u64>,
    /// `totalPages` / `total_pages`
    pub total_pages: Option<u64>,
}

impl PageMeta {
    /// Read the known fields from a metadata object
    pub fn from_value(value: &JsonValue) -> Self {
        let field = |camel: &str, snake: &str| value.get(camel).or_else(|| value.get(snake));
        Self {
            has_next: field("hasNext", "has_next").and_then(JsonValue::as_bool),
            page: value.get("page").and_then(JsonValue::as_u64),
            total_pages: field("totalPages", "total_pages").and_then(JsonValue::as_u64),
        }
    }
}

/// Records of one page plus whatever metadata came with them
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<JsonValue>,
    pub meta: Option<PageMeta>,
}

/// Tracks pagination state during iteration
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationState {
    /// Page to request next, starting at 1
    pub page: u32,
    /// Last known total page count
    pub total_pages: u32,
    /// Whether the last page indicated more data
    pub has_more: bool,
    /// Records collected so far
    pub total_fetched: u64,
}

impl Default for PaginationState {
    fn default() -> Self {
        Self {
            page: 1,
            total_pages: 1,
            has_more: true,
            total_fetched: 0,
        }
    }
}

impl PaginationState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Records collected by a paginated fetch
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PaginatedResult<T> {
    pub data: Vec<T>,
    pub total_pages: u32,
    /// Last page fetched (0 when none were)
    pub current_page: u32,
    /// Whether the server reported more pages after the last one fetched.
    ///
    /// A fetch cut short by `max_pages` reports `true` here, so callers can
    /// resume from `current_page + 1`. It is `false` only when the server
    /// signalled the end (empty page, `hasNext: false`, last of
    /// `totalPages`, or a short page).
    pub has_more: bool,
}
