//! Cache behavior of the export pipeline: one aggregation per TTL window

use recruiting_export::cache::{DatasetCache, ManualClock};
use recruiting_export::config::{CACHE_KEY, CACHE_TTL};
use recruiting_export::exporter::{ExportArtifact, ExportMode, Exporter};
use std::sync::Arc;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::support::{api_config, base_url, fast_client, scenario_page, JOB_APPLICATIONS_PATH, SCENARIO_CSV};

async fn request_count(server: &MockServer) -> usize {
    server.received_requests().await.map_or(0, |requests| requests.len())
}

fn exporter(server: &MockServer, cache: Arc<DatasetCache>) -> Exporter {
    Exporter::new(
        api_config(server),
        Arc::new(fast_client(base_url(server))),
        cache,
        ExportMode::InMemory,
    )
}

async fn mount_scenario(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path(JOB_APPLICATIONS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(scenario_page()))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_repeated_exports_aggregate_once() {
    let server = MockServer::start().await;
    mount_scenario(&server).await;
    let exporter = exporter(&server, Arc::new(DatasetCache::new()));

    let first = exporter.run_export().await.unwrap();
    let second = exporter.run_export().await.unwrap();

    assert_eq!(first, second);
    assert_eq!(first, ExportArtifact::Bytes(SCENARIO_CSV.as_bytes().to_vec()));
    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_cache_is_shared_between_exporters() {
    let server = MockServer::start().await;
    mount_scenario(&server).await;
    let cache = Arc::new(DatasetCache::new());

    exporter(&server, cache.clone()).run_export().await.unwrap();
    exporter(&server, cache.clone()).run_export().await.unwrap();

    assert_eq!(request_count(&server).await, 1);
}

#[tokio::test]
async fn test_invalidate_forces_new_aggregation() {
    let server = MockServer::start().await;
    mount_scenario(&server).await;
    let cache = Arc::new(DatasetCache::new());
    let exporter = exporter(&server, cache.clone());

    exporter.run_export().await.unwrap();
    assert!(cache.invalidate(CACHE_KEY));
    exporter.run_export().await.unwrap();

    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn test_expiry_forces_new_aggregation() {
    let server = MockServer::start().await;
    mount_scenario(&server).await;
    let clock = Arc::new(ManualClock::new());
    let cache = Arc::new(DatasetCache::with_clock(clock.clone()));
    let exporter = exporter(&server, cache);

    exporter.run_export().await.unwrap();
    clock.advance(CACHE_TTL - Duration::from_secs(1));
    exporter.run_export().await.unwrap();
    assert_eq!(request_count(&server).await, 1);

    clock.advance(Duration::from_secs(1));
    exporter.run_export().await.unwrap();
    assert_eq!(request_count(&server).await, 2);
}

#[tokio::test]
async fn test_failed_aggregation_is_not_cached() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(JOB_APPLICATIONS_PATH))
        .respond_with(ResponseTemplate::new(403))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_scenario(&server).await;
    let exporter = exporter(&server, Arc::new(DatasetCache::new()));

    assert!(exporter.run_export().await.is_err());
    assert!(exporter.run_export().await.is_ok());
    assert_eq!(request_count(&server).await, 2);
}
