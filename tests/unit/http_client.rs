//! Unit tests for ApiHttpClient against a mock API

use recruiting_export::fetcher::{FetcherError, PageFetcher};
use std::net::TcpListener;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::{
    api_config, base_url, fast_client, fast_client_with_timeout, scenario_page, API_KEY, JOB_APPLICATIONS_PATH,
};

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map_or(0, |requests| requests.len())
}

#[tokio::test]
async fn test_fetch_sends_api_headers() {
    let server = MockServer::start().await;
    let config = api_config(&server);

    Mock::given(method("GET"))
        .and(path(JOB_APPLICATIONS_PATH))
        .and(header("Authorization", format!("Token token={API_KEY}").as_str()))
        .and(header("X-Api-Version", "20240404"))
        .and(header("Content-Type", "application/vnd.api+json"))
        .respond_with(ResponseTemplate::new(200).set_body_json(scenario_page()))
        .expect(1)
        .mount(&server)
        .await;

    let client = fast_client(config.base_url.clone());
    let page = client
        .fetch(&config.start_path(), &config.request_headers())
        .await
        .unwrap();

    assert_eq!(page.primary_records.len(), 2);
    assert_eq!(page.included_records.len(), 1);
    assert_eq!(page.next_page_ref, None);
}

#[tokio::test]
async fn test_fetch_sends_page_size_and_include() {
    let server = MockServer::start().await;
    let config = api_config(&server);

    Mock::given(method("GET"))
        .and(path(JOB_APPLICATIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(scenario_page()))
        .mount(&server)
        .await;

    fast_client(base_url(&server))
        .fetch(&config.start_path(), &config.request_headers())
        .await
        .unwrap();

    let requests = server.received_requests().await.unwrap();
    let query: Vec<(String, String)> = requests[0]
        .url
        .query_pairs()
        .map(|(k, v)| (k.into_owned(), v.into_owned()))
        .collect();

    assert_eq!(
        query,
        vec![
            ("page[size]".to_string(), "30".to_string()),
            ("include".to_string(), "candidate".to_string()),
        ]
    );
}

#[tokio::test]
async fn test_retry_on_503_then_success() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(JOB_APPLICATIONS_PATH))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(JOB_APPLICATIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(scenario_page()))
        .mount(&server)
        .await;

    let page = fast_client(base_url(&server))
        .fetch("job-applications", &[])
        .await
        .unwrap();

    assert_eq!(page.primary_records.len(), 2);
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn test_429_waits_for_rate_limit_reset() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(JOB_APPLICATIONS_PATH))
        .respond_with(ResponseTemplate::new(429).insert_header("x-rate-limit-reset", "0"))
        .up_to_n_times(2)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(JOB_APPLICATIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(scenario_page()))
        .mount(&server)
        .await;

    let result = fast_client(base_url(&server)).fetch("job-applications", &[]).await;

    assert!(result.is_ok());
    assert_eq!(request_count(&server).await, 3);
}

#[tokio::test]
async fn test_non_retryable_status_fails_immediately() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(JOB_APPLICATIONS_PATH))
        .respond_with(ResponseTemplate::new(403))
        .mount(&server)
        .await;

    let err = fast_client(base_url(&server))
        .fetch("job-applications", &[])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FetcherError::InvalidResponse { status: Some(403), .. }
    ));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_persistent_500_exhausts_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(JOB_APPLICATIONS_PATH))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let err = fast_client(base_url(&server))
        .fetch("job-applications", &[])
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        FetcherError::InvalidResponse { ref path, status: Some(500) } if path == "job-applications"
    ));
    assert_eq!(request_count(&server).await, 5);
}

#[tokio::test]
async fn test_invalid_json_is_parse_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(JOB_APPLICATIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html>maintenance</html>"))
        .mount(&server)
        .await;

    let err = fast_client(base_url(&server))
        .fetch("job-applications", &[])
        .await
        .unwrap_err();

    match err {
        FetcherError::Parse(message) => {
            assert!(message.starts_with("Invalid JSON in API response body"));
        }
        other => panic!("expected parse error, got {other:?}"),
    }
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_connection_refused_is_network_error() {
    let addr = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let err = fast_client(format!("http://{addr}/v1/"))
        .fetch("job-applications", &[])
        .await
        .unwrap_err();

    assert!(matches!(err, FetcherError::Network(_)), "got {err:?}");
}

#[tokio::test]
async fn test_retry_after_request_timeout() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(JOB_APPLICATIONS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(scenario_page())
                .set_delay(Duration::from_millis(500)),
        )
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path(JOB_APPLICATIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(scenario_page()))
        .mount(&server)
        .await;

    let page = fast_client_with_timeout(base_url(&server), Duration::from_millis(100))
        .fetch("job-applications", &[])
        .await
        .unwrap();

    assert_eq!(page.primary_records.len(), 2);
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn test_persistent_timeout_exhausts_attempts() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path(JOB_APPLICATIONS_PATH))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(scenario_page())
                .set_delay(Duration::from_millis(500)),
        )
        .mount(&server)
        .await;

    let client = fast_client_with_timeout(base_url(&server), Duration::from_millis(100));
    let err = client.fetch("job-applications", &[]).await.unwrap_err();

    assert!(matches!(err, FetcherError::Network(_)), "got {err:?}");
    assert_eq!(request_count(&server).await, client.policy().max_attempts() as usize);
}
