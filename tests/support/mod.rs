//! Shared helpers for the HTTP-backed tests

use recruiting_export::config::ApiConfig;
use recruiting_export::fetcher::http::ApiHttpClient;
use recruiting_export::fetcher::retry::RetryPolicy;
use reqwest::Client;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use wiremock::MockServer;

/// API prefix the mock server serves under
pub const API_PREFIX: &str = "/v1";

/// Path of the job applications collection on the mock server
pub const JOB_APPLICATIONS_PATH: &str = "/v1/job-applications";

/// Token used by every test client
pub const API_KEY: &str = "test-token";

/// CSV produced for [`scenario_page`]
pub const SCENARIO_CSV: &str = "Candidate ID,First Name,Last Name,Email,Job Application ID,Job Application Created At\n\
                                CAND_1,John,Doe,john.doe@example.com,29305118,22.03.2022 15:59:12\n";

/// Base URL of the mock API
pub fn base_url(server: &MockServer) -> String {
    format!("{}{}/", server.uri(), API_PREFIX)
}

/// Configuration pointing at the mock API
pub fn api_config(server: &MockServer) -> ApiConfig {
    ApiConfig::new(base_url(server), API_KEY)
}

/// Same schedule as the default policy, with millisecond waits and no jitter
pub fn fast_policy() -> RetryPolicy {
    RetryPolicy::new(5, Duration::from_millis(1), 0.0, 2)
}

/// Client against the mock API with [`fast_policy`]
pub fn fast_client(base_url: impl Into<String>) -> ApiHttpClient {
    ApiHttpClient::new(Arc::new(Client::new()), base_url, fast_policy())
}

/// [`fast_client`] on a dedicated reqwest client with a short overall timeout
pub fn fast_client_with_timeout(base_url: impl Into<String>, timeout: Duration) -> ApiHttpClient {
    let client = Client::builder()
        .timeout(timeout)
        .build()
        .expect("reqwest client");
    ApiHttpClient::new(Arc::new(client), base_url, fast_policy())
}

/// A job application linked to `candidate_id` (or with a null candidate)
pub fn application(id: &str, candidate_id: Option<&str>, created_at: &str) -> Value {
    let data = candidate_id.map_or(Value::Null, |cid| json!({ "id": cid, "type": "candidates" }));
    json!({
        "id": id,
        "type": "job-applications",
        "attributes": { "created-at": created_at },
        "relationships": { "candidate": { "data": data } }
    })
}

/// An included candidate
pub fn candidate(id: &str, first_name: &str, last_name: &str, email: &str) -> Value {
    json!({
        "id": id,
        "type": "candidates",
        "attributes": { "first-name": first_name, "last-name": last_name, "email": email }
    })
}

/// A JSON:API page body
pub fn page_body(data: Vec<Value>, included: Vec<Value>, next: Option<&str>) -> Value {
    json!({
        "data": data,
        "included": included,
        "links": { "next": next }
    })
}

/// Single-page response: one resolvable application, one without a candidate
pub fn scenario_page() -> Value {
    page_body(
        vec![
            application("29305118", Some("CAND_1"), "2022-03-22T15:59:12.658+01:00"),
            application("29305121", None, "2022-03-22T16:00:00.000+01:00"),
        ],
        vec![candidate("CAND_1", "John", "Doe", "john.doe@example.com")],
        None,
    )
}
