//! Page-number pagination over the common response envelopes
//!
//! Recognised shapes:
//! - `{"data": [...], "pagination": {...}}` (or `"meta"` instead of `"pagination"`)
//! - a bare JSON array
//! - `{"items": [...], ...}` with the metadata at the top level

use super::types::{NextPage, Page, PageMeta, PaginateOptions, PaginationState};
use crate::error::{Error, Result};
use crate::types::{JsonValue, QueryParams};

/// Split a response body into records and metadata
pub fn extract_page(body: JsonValue) -> Result<Page> {
    match body {
        JsonValue::Array(items) => Ok(Page { items, meta: None }),
        JsonValue::Object(mut map) => {
            if let Some(JsonValue::Array(items)) = map.remove("data") {
                let meta = map
                    .get("pagination")
                    .or_else(|| map.get("meta"))
                    .map(PageMeta::from_value);
                return Ok(Page { items, meta });
            }
            if let Some(JsonValue::Array(items)) = map.remove("items") {
                let meta = PageMeta::from_value(&JsonValue::Object(map));
                return Ok(Page {
                    items,
                    meta: Some(meta),
                });
            }
            Err(Error::api("Unexpected pagination response format"))
        }
        _ => Err(Error::api("Unexpected pagination response format")),
    }
}

/// Page-number paginator
#[derive(Debug, Clone)]
pub struct PageNumberPaginator {
    pub page_param: String,
    pub limit_param: String,
    pub limit: u32,
    pub max_pages: u32,
}

impl PageNumberPaginator {
    pub fn new(options: &PaginateOptions) -> Self {
        Self {
            page_param: options.page_param.clone(),
            limit_param: options.limit_param.clone(),
            limit: options.limit,
            max_pages: options.max_pages,
        }
    }

    /// Check whether another request should be made
    pub fn should_fetch(&self, state: &PaginationState) -> bool {
        state.has_more && state.page <= self.max_pages
    }

    /// Query parameters for the page in `state`, appended after `base`
    pub fn page_params(&self, base: &QueryParams, state: &PaginationState) -> QueryParams {
        let mut params: QueryParams = base
            .iter()
            .filter(|(k, _)| *k != self.page_param && *k != self.limit_param)
            .cloned()
            .collect();
        params.push((self.page_param.clone(), state.page.to_string()));
        params.push((self.limit_param.clone(), self.limit.to_string()));
        params
    }

    /// Record a fetched page and decide whether to continue
    pub fn process_page(&self, page: &Page, state: &mut PaginationState) -> NextPage {
        let count = page.items.len();
        state.total_fetched += count as u64;

        let page_full = count == self.limit as usize;
        state.has_more = count > 0
            && match page.meta {
                Some(meta) => {
                    if let Some(total) = meta.total_pages {
                        state.total_pages = total as u32;
                    }
                    match (meta.has_next, meta.page) {
                        (Some(flag), _) => flag,
                        (None, Some(current)) if meta.total_pages.is_some() => {
                            current < u64::from(state.total_pages)
                        }
                        _ => page_full,
                    }
                }
                None => page_full,
            };

        state.page += 1;
        if self.should_fetch(state) {
            NextPage::Continue(state.page)
        } else {
            NextPage::Done
        }
    }
}
