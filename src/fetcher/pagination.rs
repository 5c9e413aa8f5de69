//! Pagination over the `links.next` chain
//!
//! Pages are fetched strictly in sequence: each continuation link comes from
//! the previous response. The walk ends when a page carries no next link.
//! An optional page bound guards against an upstream that never stops linking.

use tracing::{debug, info};

use crate::fetcher::{FetcherError, FetcherResult, PageFetcher, RequestHeaders};
use crate::{AggregatedDataset, PageResponse};

/// Cursor over the continuation links of a paginated collection
pub struct PageCursor<'a> {
    fetcher: &'a dyn PageFetcher,
    headers: &'a RequestHeaders,
    next_path: Option<String>,
    pages_fetched: usize,
    max_pages: Option<usize>,
}

impl<'a> PageCursor<'a> {
    /// Start a cursor at `start_path`
    pub fn new(
        fetcher: &'a dyn PageFetcher,
        start_path: impl Into<String>,
        headers: &'a RequestHeaders,
        max_pages: Option<usize>,
    ) -> Self {
        Self {
            fetcher,
            headers,
            next_path: Some(start_path.into()),
            pages_fetched: 0,
            max_pages,
        }
    }

    /// Number of pages fetched so far
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }

    /// Fetch the next page.
    ///
    /// Returns `None` once the previous page had no next link or a fetch failed.
    pub async fn next_page(&mut self) -> Option<FetcherResult<PageResponse>> {
        let path = self.next_path.take()?;

        if let Some(max_pages) = self.max_pages {
            if self.pages_fetched >= max_pages {
                return Some(Err(FetcherError::InvalidResponse { path, status: None }));
            }
        }

        debug!(page = self.pages_fetched + 1, path = %path, "Fetching page");

        let page = match self.fetcher.fetch(&path, self.headers).await {
            Ok(page) => page,
            Err(e) => return Some(Err(e)),
        };

        self.pages_fetched += 1;
        self.next_path = page.next_page_ref.clone();
        Some(Ok(page))
    }
}

/// Collects every page of a collection into one dataset
pub struct PaginatedCollector<'a> {
    fetcher: &'a dyn PageFetcher,
    max_pages: Option<usize>,
}

impl<'a> PaginatedCollector<'a> {
    /// Create an unbounded collector
    pub fn new(fetcher: &'a dyn PageFetcher) -> Self {
        Self {
            fetcher,
            max_pages: None,
        }
    }

    /// Fail with `InvalidResponse` instead of fetching more than `max_pages` pages
    pub fn with_max_pages(mut self, max_pages: Option<usize>) -> Self {
        self.max_pages = max_pages;
        self
    }

    /// Follow `links.next` from `start_path` until exhausted, appending each
    /// page's primary and included records in fetch order.
    ///
    /// Fetch failures propagate unchanged.
    pub async fn collect_all(
        &self,
        start_path: &str,
        headers: &RequestHeaders,
    ) -> FetcherResult<AggregatedDataset> {
        let mut dataset = AggregatedDataset::default();
        let mut cursor = PageCursor::new(self.fetcher, start_path, headers, self.max_pages);

        while let Some(page) = cursor.next_page().await {
            dataset.append_page(page?);
        }

        info!(
            pages = cursor.pages_fetched(),
            primary = dataset.primary_records.len(),
            included = dataset.included_records.len(),
            "Pagination complete"
        );

        Ok(dataset)
    }
}
