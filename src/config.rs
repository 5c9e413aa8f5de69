//! API configuration and export constants

use std::time::Duration;

/// API version header value sent with every request.
pub const DEFAULT_API_VERSION: &str = "20240404";

/// Page size requested from the job applications endpoint.
pub const DEFAULT_PAGE_SIZE: u32 = 30;

/// Cache key identifying the candidates-and-applications dataset.
pub const CACHE_KEY: &str = "teamtailor/candidates_and_applications";

/// How long an aggregated dataset stays fresh in the cache.
pub const CACHE_TTL: Duration = Duration::from_secs(60 * 60);

/// Media type of the JSON:API backend.
pub const JSON_API_CONTENT_TYPE: &str = "application/vnd.api+json";

/// Connection settings for the recruiting API
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    /// Base URL every request path is resolved against (e.g. "https://api.teamtailor.com/v1/")
    pub base_url: String,
    /// API token
    pub api_key: String,
    /// Value of the `X-Api-Version` header
    pub api_version: String,
    /// Records requested per page
    pub page_size: u32,
}

impl ApiConfig {
    /// Create a configuration with default API version and page size
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            api_version: DEFAULT_API_VERSION.to_string(),
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    /// Override the page size
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size;
        self
    }

    /// Headers sent with every request
    pub fn request_headers(&self) -> Vec<(&'static str, String)> {
        vec![
            ("Authorization", format!("Token token={}", self.api_key)),
            ("X-Api-Version", self.api_version.clone()),
            ("Content-Type", JSON_API_CONTENT_TYPE.to_string()),
        ]
    }

    /// First page of job applications with their candidates side-loaded
    pub fn start_path(&self) -> String {
        format!("job-applications?page[size]={}&include=candidate", self.page_size)
    }
}
