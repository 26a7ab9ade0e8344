//! Integration tests for the frontier loop over real HTTP

use async_trait::async_trait;
use onion_scout::config::CrawlerConfig;
use onion_scout::crawler::{Crawler, FetchEngine, PageResult};
use onion_scout::output::{CrawlSummary, ResultSink, SinkResult};
use onion_scout::storage::SqliteStorage;
use onion_scout::tasks::CrawlTaskAdapter;
use onion_scout::url::CrawlUrl;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Sink that takes longer per page than the request timeout allows
struct SlowSink {
    delay: Duration,
    pages: Mutex<Vec<String>>,
}

#[async_trait]
impl ResultSink for SlowSink {
    async fn post_page_result(&self, page: &PageResult) -> SinkResult<()> {
        tokio::time::sleep(self.delay).await;
        self.pages.lock().unwrap().push(page.requested_url.clone());
        Ok(())
    }

    async fn post_summary(&self, _summary: &CrawlSummary) -> SinkResult<()> {
        Ok(())
    }
}

#[tokio::test]
async fn test_slow_sink_does_not_fail_answered_requests() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_string("<html><body>ok</body></html>"))
        .mount(&mock_server)
        .await;

    let config = CrawlerConfig {
        timeout_secs: 2,
        max_requests: 10,
        max_retries: 3,
        retry_pause_ms: 0,
        probe_favicon: false,
        ..Default::default()
    };
    let engine = FetchEngine::new(&config, "TestAgent/1.0", None).expect("Failed to build engine");

    let dir = tempfile::tempdir().unwrap();
    let store = SqliteStorage::new(&dir.path().join("tasks.db")).expect("Failed to open database");
    let tasks = CrawlTaskAdapter::new(Arc::new(Mutex::new(store)));

    let sink = Arc::new(SlowSink {
        delay: Duration::from_secs(3),
        pages: Mutex::new(Vec::new()),
    });
    let crawler = Crawler::new(engine, sink.clone(), tasks, config);

    let seeds = vec![
        CrawlUrl::new(format!("{}/a", mock_server.uri())).unwrap(),
        CrawlUrl::new(format!("{}/b", mock_server.uri())).unwrap(),
    ];
    let summary = crawler.start(seeds).await.unwrap();

    let requests = mock_server.received_requests().await.unwrap();
    let mut paths: Vec<String> = requests.iter().map(|r| r.url.path().to_string()).collect();
    paths.sort();
    assert_eq!(paths, vec!["/a".to_string(), "/b".to_string()]);

    assert_eq!(summary.pages_crawled, 2);
    assert_eq!(sink.pages.lock().unwrap().len(), 2);
}
