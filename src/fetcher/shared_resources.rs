//! Process-wide HTTP client
//!
//! Every [`ApiHttpClient`](super::http::ApiHttpClient) built from configuration shares one
//! `reqwest::Client`, so connections to the recruiting API are pooled and reused
//! across exports.

use once_cell::sync::Lazy;
use reqwest::Client;
use std::sync::Arc;
use std::time::Duration;

/// Time allowed to establish a connection
pub const HTTP_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
/// Time allowed for the whole request, body included
pub const HTTP_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Global HTTP client shared by all API clients
pub static GLOBAL_HTTP_CLIENT: Lazy<Arc<Client>> = Lazy::new(|| Arc::new(build_http_client()));

/// Build a client with the export's connect and request timeouts
pub fn build_http_client() -> Client {
    Client::builder()
        .connect_timeout(HTTP_CONNECT_TIMEOUT)
        .timeout(HTTP_REQUEST_TIMEOUT)
        .build()
        .unwrap_or_else(|e| {
            panic!("FATAL: Failed to build HTTP client: {}. Check system TLS configuration.", e);
        })
}

/// Get the global HTTP client
pub fn global_http_client() -> Arc<Client> {
    GLOBAL_HTTP_CLIENT.clone()
}
