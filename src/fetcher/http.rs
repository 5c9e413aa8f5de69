//! HTTP client for the recruiting API
//!
//! Issues one logical GET per page with:
//! - Automatic retry on timeouts, connection/TLS failures and 429/5xx responses
//! - Exponential backoff with jitter, or the rate-limit-reset header on 429
//! - JSON:API body parsing

use async_trait::async_trait;
use reqwest::header::HeaderMap;
use reqwest::{Client, StatusCode, Url};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::config::ApiConfig;
use crate::fetcher::retry::{self, RetryErrorType, RetryPolicy};
use crate::fetcher::shared_resources::global_http_client;
use crate::fetcher::{parse_page, FetcherError, FetcherResult, PageFetcher, RequestHeaders};
use crate::PageResponse;

/// Retrying HTTP client bound to one API base URL
pub struct ApiHttpClient {
    client: Arc<Client>,
    base_url: String,
    policy: RetryPolicy,
}

enum AttemptFailure {
    Transport(reqwest::Error),
    Status(StatusCode, HeaderMap),
}

impl ApiHttpClient {
    /// Create a client
    ///
    /// # Arguments
    /// * `client` - Shared reqwest client (carries the timeouts)
    /// * `base_url` - Base URL relative paths are resolved against
    /// * `policy` - Retry policy
    pub fn new(client: Arc<Client>, base_url: impl Into<String>, policy: RetryPolicy) -> Self {
        Self {
            client,
            base_url: base_url.into(),
            policy,
        }
    }

    /// Client on the global connection pool with the default retry policy
    pub fn from_config(config: &ApiConfig) -> Self {
        Self::new(global_http_client(), config.base_url.clone(), RetryPolicy::default())
    }

    /// Base URL of this client
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Retry policy of this client
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Resolve a request path against the base URL.
    ///
    /// Absolute URLs (as returned in `links.next`) are used unchanged. A path
    /// that cannot be joined came from the upstream document and is a
    /// [`FetcherError::Parse`].
    pub fn resolve_url(&self, path: &str) -> FetcherResult<Url> {
        let mut base = self.base_url.clone();
        if !base.ends_with('/') {
            base.push('/');
        }

        let base = Url::parse(&base)
            .map_err(|e| FetcherError::Network(format!("invalid base URL {base}: {e}")))?;
        base.join(path)
            .map_err(|e| FetcherError::Parse(format!("invalid continuation link {path}: {e}")))
    }

    async fn get_with_retry(&self, path: &str, headers: &RequestHeaders) -> FetcherResult<PageResponse> {
        let url = self.resolve_url(path)?;
        let max_attempts = self.policy.max_attempts();
        let mut attempt = 0;

        loop {
            attempt += 1;
            debug!(url = %url, attempt, "GET request");

            let mut request = self.client.get(url.clone());
            for (name, value) in headers {
                request = request.header(*name, value.as_str());
            }

            let failure = match request.send().await {
                Ok(response) => {
                    let status = response.status();
                    if status.is_success() {
                        match response.bytes().await {
                            Ok(body) => {
                                debug!(url = %url, attempt, bytes = body.len(), "Request succeeded");
                                return parse_page(&body);
                            }
                            Err(e) => AttemptFailure::Transport(e),
                        }
                    } else if self.policy.is_retryable_status(status) {
                        AttemptFailure::Status(status, response.headers().clone())
                    } else {
                        warn!(url = %url, status = status.as_u16(), "Request failed with non-retryable status");
                        return Err(FetcherError::InvalidResponse {
                            path: path.to_string(),
                            status: Some(status.as_u16()),
                        });
                    }
                }
                Err(e) => AttemptFailure::Transport(e),
            };

            let (error_type, wait) = match failure {
                AttemptFailure::Transport(e) => {
                    if attempt >= max_attempts || !retry::is_retryable_transport_error(&e) {
                        warn!(url = %url, attempt, "Giving up after transport error: {}", e);
                        return Err(FetcherError::Network(error_chain(&e)));
                    }
                    (RetryErrorType::from_transport(&e), self.policy.backoff(attempt))
                }
                AttemptFailure::Status(status, response_headers) => {
                    if attempt >= max_attempts {
                        warn!(url = %url, attempt, status = status.as_u16(), "Retries exhausted");
                        return Err(FetcherError::InvalidResponse {
                            path: path.to_string(),
                            status: Some(status.as_u16()),
                        });
                    }
                    (
                        RetryErrorType::from_status(status),
                        self.policy.wait_for_status(status, &response_headers, attempt),
                    )
                }
            };

            warn!("{}", retry::format_retry(attempt, max_attempts, error_type, wait, path));
            tokio::time::sleep(wait).await;
        }
    }
}

#[async_trait]
impl PageFetcher for ApiHttpClient {
    async fn fetch(&self, path: &str, headers: &RequestHeaders) -> FetcherResult<PageResponse> {
        self.get_with_retry(path, headers).await
    }
}

/// Render an error with its source chain, e.g. "error sending request: connection refused"
fn error_chain(err: &(dyn std::error::Error + 'static)) -> String {
    let mut message = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
