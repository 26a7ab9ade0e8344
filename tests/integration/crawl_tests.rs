//! Integration tests for the task lifecycle
//!
//! These tests drive claims, crawls and sweeps against a file-backed
//! database shared by several handles, the way a fleet of workers shares
//! one task table.

use async_trait::async_trait;
use chrono::{Duration as ChronoDuration, Utc};
use onion_scout::config::{Config, CrawlerConfig, NetworkConfig, StorageConfig, WorkerConfig};
use onion_scout::crawler::{PageFetcher, PageResult};
use onion_scout::output::TracingSink;
use onion_scout::storage::{JobRegistry, SqliteStorage, TaskStore};
use onion_scout::tasks::{CrawlTaskAdapter, Launcher, Sweeper, TaskStatus};
use onion_scout::url::{CrawlUrl, RawLink};
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

/// Serves a fixed set of onion pages
struct OnionSites {
    pages: HashMap<&'static str, Vec<RawLink>>,
}

impl OnionSites {
    fn new() -> Self {
        let mut pages = HashMap::new();
        pages.insert(
            "http://alpha.onion/",
            vec![
                RawLink::new("/forum", "Forum"),
                RawLink::new("http://beta.onion/index.php?ref=alpha", "Beta"),
                RawLink::new("/files/dump.zip", "Dump"),
            ],
        );
        pages.insert(
            "http://alpha.onion/forum",
            vec![RawLink::new("http://gamma.onion", "Gamma")],
        );
        pages.insert("http://beta.onion/", vec![RawLink::new("http://alpha.onion/", "Back")]);
        Self { pages }
    }
}

#[async_trait]
impl PageFetcher for OnionSites {
    async fn get(&self, url: &mut CrawlUrl, _probe: bool) -> Option<PageResult> {
        url.record_attempt();
        let links = self.pages.get(url.value())?;
        Some(PageResult {
            requested_url: url.value().to_string(),
            responded_url: Some(url.value().to_string()),
            status: Some("200".to_string()),
            on_page_urls: links.clone(),
            ..Default::default()
        })
    }
}

fn create_test_config(db_path: &Path) -> Config {
    Config {
        crawler: CrawlerConfig {
            max_requests: 4,
            max_retries: 2,
            retry_pause_ms: 0,
            ..Default::default()
        },
        network: NetworkConfig {
            user_agents: vec!["TestAgent/1.0".to_string()],
            proxies: vec![],
            allow_direct: true,
        },
        api: None,
        storage: StorageConfig {
            database_path: db_path.to_string_lossy().into_owned(),
        },
        worker: WorkerConfig::default(),
        seed: vec![],
    }
}

fn open(db_path: &Path) -> Arc<Mutex<SqliteStorage>> {
    Arc::new(Mutex::new(
        SqliteStorage::new(db_path).expect("Failed to open database"),
    ))
}

#[tokio::test]
async fn test_crawl_discovers_new_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("tasks.db");
    let config = create_test_config(&db_path);

    let store = open(&db_path);
    CrawlTaskAdapter::new(Arc::clone(&store))
        .ensure_task("alpha.onion", 5, 2)
        .unwrap();

    let launcher = Launcher::new(Arc::clone(&store), Arc::new(TracingSink), &config);
    let summary = launcher.launch_with(OnionSites::new()).await.unwrap();

    assert_eq!(summary.domain, "alpha.onion");
    assert_eq!(summary.pages_crawled, 2);
    assert_eq!(
        summary.external_domains,
        vec!["beta.onion".to_string(), "gamma.onion".to_string()]
    );

    // A second worker with its own connection sees the new tasks
    let other = SqliteStorage::new(&db_path).unwrap();
    let alpha = other.get_task("alpha.onion").unwrap().unwrap();
    assert_eq!(alpha.status, TaskStatus::Finished);
    assert_eq!(alpha.importance, 5);
    assert_eq!(alpha.frequency, 2);

    let active = other.list_tasks_by_status(TaskStatus::Active).unwrap();
    let domains: Vec<&str> = active.iter().map(|t| t.domain.as_str()).collect();
    assert_eq!(domains, vec!["beta.onion", "gamma.onion"]);
}

#[tokio::test]
async fn test_workers_share_the_backlog() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("tasks.db");
    let config = create_test_config(&db_path);

    let first = open(&db_path);
    let second = open(&db_path);
    CrawlTaskAdapter::new(Arc::clone(&first))
        .ensure_task("alpha.onion", 0, 1)
        .unwrap();

    let worker_a = Launcher::new(Arc::clone(&first), Arc::new(TracingSink), &config);
    let worker_b = Launcher::new(Arc::clone(&second), Arc::new(TracingSink), &config);

    assert_eq!(
        worker_a.launch_with(OnionSites::new()).await.unwrap().domain,
        "alpha.onion"
    );
    // Worker B picks up a domain discovered by worker A
    assert_eq!(
        worker_b.launch_with(OnionSites::new()).await.unwrap().domain,
        "beta.onion"
    );
}

#[tokio::test]
async fn test_sweeps_restore_tasks() {
    let dir = tempfile::tempdir().unwrap();
    let db_path = dir.path().join("tasks.db");
    let config = create_test_config(&db_path);

    let store = open(&db_path);
    let adapter = CrawlTaskAdapter::new(Arc::clone(&store));
    adapter.ensure_task("alpha.onion", 0, 1).unwrap();
    adapter.ensure_task("crashed.onion", 0, 1).unwrap();

    let launcher = Launcher::new(Arc::clone(&store), Arc::new(TracingSink), &config);
    launcher.launch_with(OnionSites::new()).await.unwrap();

    // A worker claims a task and dies without reporting
    let now = Utc::now();
    {
        let mut s = store.lock().unwrap();
        assert!(s.claim_task("crashed.onion", "lost-job", now).unwrap());
        s.register_job("lost-job", "crashed.onion", now - ChronoDuration::hours(2))
            .unwrap();
    }

    let stale_after = ChronoDuration::seconds(config.worker.job_stale_secs as i64);
    let sweeper = Sweeper::new(Arc::clone(&store), stale_after);

    let report = sweeper.run(now).unwrap();
    assert_eq!(report.reclaimed, 1);
    assert_eq!(report.reactivated, 0);
    assert_eq!(report.pruned_jobs, 1);
    assert_eq!(
        adapter.get_task("crashed.onion").unwrap().status,
        TaskStatus::Active
    );
    assert_eq!(
        adapter.get_task("alpha.onion").unwrap().status,
        TaskStatus::Finished
    );

    // One day later alpha's cooldown has elapsed
    let report = sweeper.run(now + ChronoDuration::days(1)).unwrap();
    assert_eq!(report.reactivated, 1);
    assert_eq!(
        adapter.get_task("alpha.onion").unwrap().status,
        TaskStatus::Active
    );
}
