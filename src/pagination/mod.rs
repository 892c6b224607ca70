//! Pagination module
//!
//! Page-number pagination across the common list-response envelopes.
//!
//! # Overview
//!
//! [`extract_page`] pulls the records and any metadata out of a response
//! body; [`PageNumberPaginator`] turns that into the next page to request.
//! A page continues when:
//!
//! 1. an explicit `hasNext` / `has_next` flag says so, otherwise
//! 2. `page < totalPages` when both are reported, otherwise
//! 3. the page came back full (`len == limit`).
//!
//! An empty page always stops.

mod paginator;
mod types;

pub use paginator::{extract_page, PageNumberPaginator};
pub use types::{
    NextPage, Page, PageMeta, PaginateOptions, PaginatedResult, PaginationState,
};
