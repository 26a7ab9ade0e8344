//! Integration tests for the storage service client

use chrono::DateTime;
use onion_scout::config::ApiConfig;
use onion_scout::crawler::PageResult;
use onion_scout::output::{ApiClient, CrawlSummary, ResultSink, SinkError};
use onion_scout::url::RawLink;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(&ApiConfig {
        base_url: server.uri(),
        api_key: "secret-key".to_string(),
        response_endpoint: "/api/process-response/".to_string(),
        summary_endpoint: "/api/process-summary/".to_string(),
        max_retries: 3,
        timeout_secs: 5,
    })
    .expect("Failed to build API client")
}

fn sample_page() -> PageResult {
    PageResult {
        requested_url: "http://a.onion/".to_string(),
        responded_url: Some("http://a.onion/".to_string()),
        status: Some("200".to_string()),
        elapsed: 0.5,
        visited: DateTime::from_timestamp(1_700_000_000, 0),
        page_title: Some("Welcome".to_string()),
        on_page_urls: vec![RawLink::new("/about", "About")],
        ..Default::default()
    }
}

#[tokio::test]
async fn test_page_result_is_posted_with_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/process-response/"))
        .and(header("authorization", "Token secret-key"))
        .and(body_partial_json(json!({
            "requested_url": "http://a.onion/",
            "status": "200",
            "visited": 1_700_000_000,
            "on_page_urls": [{"url": "/about", "anchor": "About"}]
        })))
        .respond_with(ResponseTemplate::new(201))
        .expect(1)
        .mount(&mock_server)
        .await;

    client_for(&mock_server)
        .post_page_result(&sample_page())
        .await
        .expect("Post should succeed");
}

#[tokio::test]
async fn test_summary_goes_to_summary_endpoint() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/process-summary/"))
        .and(body_partial_json(json!({
            "domain": "a.onion",
            "pages_crawled": 2,
            "external_domains_found": 1,
            "external_domains": ["b.onion"]
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let summary = CrawlSummary {
        domain: "a.onion".to_string(),
        pages_crawled: 2,
        external_domains_found: 1,
        external_domains: vec!["b.onion".to_string()],
        elapsed_seconds: 3.0,
        completion_timestamp: chrono::Utc::now(),
        truncated: false,
    };

    client_for(&mock_server)
        .post_summary(&summary)
        .await
        .expect("Post should succeed");
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/process-response/"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let result = client_for(&mock_server).post_page_result(&sample_page()).await;

    assert!(matches!(result, Err(SinkError::Exhausted { attempts: 3, .. })));
}

#[tokio::test]
async fn test_client_errors_are_not_retried() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/api/process-response/"))
        .respond_with(ResponseTemplate::new(400))
        .expect(1)
        .mount(&mock_server)
        .await;

    let result = client_for(&mock_server).post_page_result(&sample_page()).await;

    assert!(matches!(result, Err(SinkError::Status { status: 400, .. })));
}
