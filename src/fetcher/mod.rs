//! Data fetching from the recruiting API

use crate::{PageResponse, Record};
use async_trait::async_trait;
use serde::Deserialize;

pub mod http;
pub mod pagination;
pub mod retry;
pub mod shared_resources;

/// Fetcher errors
#[derive(Debug, thiserror::Error)]
pub enum FetcherError {
    /// Transport-level failure (timeout, connection, TLS)
    #[error("network failure: {0}")]
    Network(String),

    /// Non-success HTTP status after retries, or an endless pagination chain
    #[error("API error: failed to fetch {path}{}", .status.map(|s| format!(" (status {s})")).unwrap_or_default())]
    InvalidResponse {
        /// Requested path or URL
        path: String,
        /// HTTP status; `None` when the pagination bound was exceeded
        status: Option<u16>,
    },

    /// Response body is not a valid JSON:API document, or its continuation link is malformed
    #[error("parse error: {0}")]
    Parse(String),
}

/// Result type for fetcher operations
pub type FetcherResult<T> = Result<T, FetcherError>;

/// Headers attached to every request
pub type RequestHeaders = [(&'static str, String)];

/// Fetches one page of the JSON:API collection
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// GET `path` (relative to the base URL, or absolute) and parse the page
    async fn fetch(&self, path: &str, headers: &RequestHeaders) -> FetcherResult<PageResponse>;
}

#[derive(Debug, Deserialize)]
struct Document {
    #[serde(default)]
    data: Option<Vec<Record>>,
    #[serde(default)]
    included: Option<Vec<Record>>,
    #[serde(default)]
    links: Option<Links>,
}

#[derive(Debug, Deserialize)]
struct Links {
    #[serde(default)]
    next: Option<String>,
}

/// Parse a JSON:API response body into a page.
///
/// Missing or `null` `data`/`included` become empty; an empty `links.next`
/// is treated as the end of the collection.
pub fn parse_page(body: &[u8]) -> FetcherResult<PageResponse> {
    let document: Document = serde_json::from_slice(body)
        .map_err(|e| FetcherError::Parse(format!("Invalid JSON in API response body: {e}")))?;

    Ok(PageResponse {
        primary_records: document.data.unwrap_or_default(),
        included_records: document.included.unwrap_or_default(),
        next_page_ref: document
            .links
            .and_then(|links| links.next)
            .filter(|next| !next.is_empty()),
    })
}
