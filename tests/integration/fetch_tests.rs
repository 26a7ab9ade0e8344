//! Integration tests for the fetch engine
//!
//! These tests run the engine against wiremock servers over plain HTTP,
//! without a proxy.

use onion_scout::config::CrawlerConfig;
use onion_scout::crawler::{run_request, FetchEngine, PageFetcher};
use onion_scout::url::CrawlUrl;
use std::time::Duration;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config() -> CrawlerConfig {
    CrawlerConfig {
        timeout_secs: 5,
        timeout_step_secs: 5,
        timeout_ceiling_secs: 20,
        retry_pause_ms: 0,
        ..Default::default()
    }
}

fn engine() -> FetchEngine {
    FetchEngine::new(&test_config(), "TestAgent/1.0", None).expect("Failed to build engine")
}

fn page_url(server: &MockServer, page: &str) -> CrawlUrl {
    CrawlUrl::new(format!("{}{}", server.uri(), page)).expect("Invalid test URL")
}

#[tokio::test]
async fn test_successful_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(
                    r#"<html><head><title>Market</title>
                    <meta name="description" content="Listings"></head>
                    <body><h1>Welcome</h1>
                    <a href="/about">About us</a>
                    <a href="http://other.onion/">Elsewhere</a>
                    </body></html>"#,
                )
                .insert_header("content-type", "text/html")
                .insert_header("server", "nginx"),
        )
        .mount(&mock_server)
        .await;

    let mut url = page_url(&mock_server, "/");
    let page = engine().get(&mut url, false).await.expect("Expected a response");

    assert_eq!(url.attempts(), 1);
    assert_eq!(page.status.as_deref(), Some("200"));
    assert_eq!(page.server.as_deref(), Some("nginx"));
    assert_eq!(page.page_title.as_deref(), Some("Welcome"));
    assert_eq!(page.meta_title.as_deref(), Some("Market"));
    assert_eq!(page.meta_description.as_deref(), Some("Listings"));
    assert_eq!(page.on_page_urls.len(), 2);
    assert_eq!(page.on_page_urls[0].url, "/about");
    assert_eq!(page.on_page_urls[0].anchor, "About us");
    assert!(page.visited.is_some());
    assert!(page.favicon_base64.is_none());
}

#[tokio::test]
async fn test_error_status_is_a_response_without_visit() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(
            ResponseTemplate::new(404).set_body_string(r#"<html><body><a href="/x">x</a></body></html>"#),
        )
        .mount(&mock_server)
        .await;

    let mut url = page_url(&mock_server, "/missing");
    let page = engine().get(&mut url, false).await.expect("Expected a response");

    assert_eq!(page.status.as_deref(), Some("404"));
    assert!(page.visited.is_none());
    assert!(page.on_page_urls.is_empty());
}

#[tokio::test]
async fn test_redirect_records_final_url() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/new"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/new"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>moved</body></html>"))
        .mount(&mock_server)
        .await;

    let mut url = page_url(&mock_server, "/old");
    let page = engine().get(&mut url, false).await.expect("Expected a response");

    assert_eq!(page.status.as_deref(), Some("200"));
    assert_eq!(page.requested_url, format!("{}/old", mock_server.uri()));
    assert_eq!(
        page.responded_url,
        Some(format!("{}/new", mock_server.uri()))
    );
    assert_eq!(page.text.as_deref(), Some("moved"));
}

#[tokio::test]
async fn test_browser_headers_are_sent() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .and(header("user-agent", "TestAgent/1.0"))
        .and(header("accept-language", "en-US,en;q=0.5"))
        .and(header("sec-fetch-mode", "navigate"))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&mock_server)
        .await;

    let mut url = page_url(&mock_server, "/");
    let page = engine().get(&mut url, false).await.expect("Expected a response");

    assert_eq!(page.status.as_deref(), Some("200"));
}

#[tokio::test]
async fn test_probe_captures_favicon() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><link rel="icon" href="/favicon.ico"></head><body></body></html>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/favicon.ico"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let engine = engine();

    let mut url = page_url(&mock_server, "/");
    let page = engine.get(&mut url, true).await.expect("Expected a response");
    assert_eq!(
        page.favicon_url,
        Some(format!("{}/favicon.ico", mock_server.uri()))
    );
    assert_eq!(page.favicon_base64.as_deref(), Some("AQID"));
}

#[tokio::test]
async fn test_non_probe_skips_favicon() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"<html><head><link rel="icon" href="/favicon.ico"></head><body></body></html>"#,
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/favicon.ico"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![1u8, 2, 3]))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut url = page_url(&mock_server, "/");
    let page = engine().get(&mut url, false).await.expect("Expected a response");
    assert!(page.favicon_url.is_none());
    assert!(page.favicon_base64.is_none());
}

#[tokio::test]
async fn test_slow_answer_keeps_timeout() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/slow"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(2)))
        .mount(&mock_server)
        .await;

    let config = CrawlerConfig {
        timeout_secs: 1,
        timeout_step_secs: 4,
        timeout_ceiling_secs: 20,
        ..test_config()
    };
    let engine = FetchEngine::new(&config, "TestAgent/1.0", None).expect("Failed to build engine");

    // The connection comes up at once; only the answer is late
    let mut url = page_url(&mock_server, "/slow");
    assert!(engine.get(&mut url, false).await.is_none());
    assert_eq!(url.attempts(), 1);
    assert_eq!(engine.timeout(), Duration::from_secs(1));
}

#[tokio::test]
async fn test_run_request_retries_until_answer() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(3)))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/flaky"))
        .respond_with(ResponseTemplate::new(200))
        .mount(&mock_server)
        .await;

    let config = CrawlerConfig {
        timeout_secs: 1,
        ..test_config()
    };
    let engine = FetchEngine::new(&config, "TestAgent/1.0", None).expect("Failed to build engine");

    let mut url = page_url(&mock_server, "/flaky");
    let page = run_request(&engine, &mut url, 4, Duration::ZERO, false).await;

    assert!(page.is_some());
    assert_eq!(url.attempts(), 2);
    assert_eq!(engine.timeout(), Duration::from_secs(1));
}
