//! Tests for HTTP module functionality.

use shardload::chunk::plan_chunks;
use shardload::http::{create_http_client, ConnectionLimiter, HttpClientConfig, Transport};
use shardload::TransferError;

use reqwest::{StatusCode, Url};
use std::time::Duration;

mod common;
use common::helpers::*;

fn file_url(server: &wiremock::MockServer) -> Url {
    Url::parse(&format!("{}{}", server.uri(), TEST_FILE_PATH)).unwrap()
}

fn transport() -> Transport {
    Transport::new(create_test_http_config()).expect("Failed to build transport")
}

#[test]
fn test_default_config() {
    let config = HttpClientConfig::default();
    assert_eq!(config.retries, 3);
    assert!(config.proxy.is_none());
    assert!(config.headers.is_none());
}

#[test]
fn test_create_http_client_with_headers() {
    let config = create_test_http_config_with_retries(5);
    assert!(create_http_client(config).is_ok());
}

#[tokio::test]
async fn test_probe_with_head_request() {
    let server = start_range_server(RangeResponder::new(create_test_content(1500))).await;

    let probe = transport().probe(&file_url(&server), false).await.unwrap();
    assert_eq!(probe.total_size, Some(1500));
    assert!(probe.accepts_ranges);
}

#[tokio::test]
async fn test_probe_with_range_request() {
    let server = start_range_server(RangeResponder::new(create_test_content(1500))).await;

    let probe = transport().probe(&file_url(&server), true).await.unwrap();
    assert_eq!(probe.total_size, Some(1500));
    assert!(probe.accepts_ranges);
    assert_eq!(received_ranges(&server).await, vec!["bytes=0-0"]);
}

#[tokio::test]
async fn test_probe_server_without_ranges() {
    let server =
        start_range_server(RangeResponder::new(create_test_content(1500)).ignore_ranges()).await;

    let probe = transport().probe(&file_url(&server), true).await.unwrap();
    assert_eq!(probe.total_size, Some(1500));
    assert!(!probe.accepts_ranges);
}

#[tokio::test]
async fn test_fetch_range_streams_chunk() {
    let content = create_test_content(1000);
    let server = start_range_server(RangeResponder::new(content.clone())).await;
    let chunks = plan_chunks(1000, 300).unwrap();

    let mut response = transport()
        .fetch_range(&file_url(&server), &chunks[1], 1000)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::PARTIAL_CONTENT);

    let mut body = Vec::new();
    while let Some(bytes) = response.next_bytes().await.unwrap() {
        body.extend_from_slice(&bytes);
    }
    assert_eq!(body, &content[300..600]);
    assert_eq!(received_ranges(&server).await, vec!["bytes=300-599"]);
}

#[tokio::test]
async fn test_fetch_range_rejects_full_body_for_partial_chunk() {
    let server =
        start_range_server(RangeResponder::new(create_test_content(1000)).ignore_ranges()).await;
    let chunks = plan_chunks(1000, 300).unwrap();

    let result = transport()
        .fetch_range(&file_url(&server), &chunks[2], 1000)
        .await;
    assert!(matches!(
        result,
        Err(TransferError::RangeIgnored { start: 600, end: 900, .. })
    ));
}

#[tokio::test]
async fn test_fetch_range_accepts_full_body_for_whole_resource() {
    let server =
        start_range_server(RangeResponder::new(create_test_content(1000)).ignore_ranges()).await;
    let chunks = plan_chunks(1000, 1000).unwrap();

    let response = transport()
        .fetch_range(&file_url(&server), &chunks[0], 1000)
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_fetch_range_rejects_unbounded_content_range() {
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path(TEST_FILE_PATH))
        .respond_with(
            ResponseTemplate::new(206)
                .insert_header("Content-Range", format!("bytes 0-{}/*", u64::MAX))
                .set_body_bytes(create_test_content(10)),
        )
        .mount(&server)
        .await;
    let chunks = plan_chunks(1000, 500).unwrap();

    let result = transport()
        .fetch_range(&file_url(&server), &chunks[0], 1000)
        .await;
    assert!(matches!(
        result,
        Err(TransferError::RangeIgnored { start: 0, end: 500, .. })
    ));
}

#[tokio::test]
async fn test_fetch_range_reports_server_error() {
    let server =
        start_range_server(RangeResponder::new(create_test_content(1000)).failing(0)).await;
    let chunks = plan_chunks(1000, 500).unwrap();

    let result = transport()
        .fetch_range(&file_url(&server), &chunks[0], 1000)
        .await;
    assert!(matches!(
        result,
        Err(TransferError::Status(StatusCode::INTERNAL_SERVER_ERROR))
    ));
}

#[tokio::test]
async fn test_connection_limiter_times_out() {
    let limiter = ConnectionLimiter::new(1);
    let held = limiter.acquire(Duration::from_millis(10)).await.unwrap();
    assert_eq!(limiter.available(), 0);

    let result = limiter.acquire(Duration::from_millis(20)).await;
    assert!(matches!(result, Err(TransferError::PoolTimeout(_))));

    drop(held);
    assert_eq!(limiter.available(), 1);
    assert_eq!(limiter.capacity(), 1);
}
