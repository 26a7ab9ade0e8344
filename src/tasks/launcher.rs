//! Crawl launcher
//!
//! Claims the next eligible task, runs a crawl of its domain and records
//! the outcome. This is the boundary where crawl failures, including
//! panics, are turned into FAILED tasks.

use crate::config::{Config, CrawlerConfig};
use crate::crawler::{Crawler, FetchEngine, NetworkPool, PageFetcher};
use crate::output::{CrawlSummary, ResultSink};
use crate::storage::{JobRegistry, StorageError, TaskStore};
use crate::tasks::{CrawlTask, CrawlTaskAdapter};
use crate::url::CrawlUrl;
use crate::ScoutError;
use chrono::Utc;
use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use uuid::Uuid;

pub struct Launcher<S> {
    store: Arc<Mutex<S>>,
    adapter: CrawlTaskAdapter<S>,
    sink: Arc<dyn ResultSink>,
    crawler: CrawlerConfig,
    pool: NetworkPool,
    heartbeat: Duration,
}

impl<S> Launcher<S>
where
    S: TaskStore + JobRegistry + Send + 'static,
{
    pub fn new(store: Arc<Mutex<S>>, sink: Arc<dyn ResultSink>, config: &Config) -> Self {
        Self {
            adapter: CrawlTaskAdapter::new(Arc::clone(&store)),
            store,
            sink,
            crawler: config.crawler.clone(),
            pool: NetworkPool::new(&config.network),
            heartbeat: Duration::from_secs(config.worker.heartbeat_secs.max(1)),
        }
    }

    /// Claims a task and crawls it through a fresh fetch engine
    ///
    /// The user agent and proxy are chosen before anything is claimed, so
    /// an exhausted pool leaves the task table untouched.
    ///
    /// # Errors
    ///
    /// * `ScoutError::NoUserAgents` / `ScoutError::NoProxies` - Empty pools
    /// * `ScoutError::Task(TaskError::NoActiveTasks)` - Nothing to claim
    /// * Any error of the crawl itself, after the task was marked FAILED
    pub async fn launch(&self) -> Result<CrawlSummary, ScoutError> {
        let user_agent = self.pool.pick_user_agent()?;
        let proxy = self.pool.pick_proxy()?;
        let engine = FetchEngine::new(&self.crawler, &user_agent, proxy.as_deref())?;

        tracing::debug!(
            "Using proxy {} for next run",
            proxy.as_deref().unwrap_or("(direct)")
        );
        self.launch_with(engine).await
    }

    /// Claims a task and crawls it with `fetcher`
    pub async fn launch_with<F: PageFetcher>(&self, fetcher: F) -> Result<CrawlSummary, ScoutError> {
        let job_id = Uuid::new_v4().to_string();
        let task = self.adapter.get_and_prepare(&job_id, Utc::now())?;

        let registered = self.lock()?.register_job(&job_id, &task.domain, Utc::now());
        if let Err(e) = registered {
            self.adapter.mark_failed(&task)?;
            return Err(e.into());
        }
        let heartbeat = self.spawn_heartbeat(job_id.clone());

        let started = Instant::now();
        let outcome = AssertUnwindSafe(self.crawl(&task, fetcher))
            .catch_unwind()
            .await;
        heartbeat.abort();

        let result = match outcome {
            Ok(Ok(summary)) => self
                .adapter
                .mark_finished(&task, Some(Utc::now()), Some(started.elapsed().as_secs_f64()))
                .map(|_| summary)
                .map_err(ScoutError::from),
            Ok(Err(e)) => {
                tracing::error!("Crawl of {} (job {}) failed: {}", task.domain, job_id, e);
                self.adapter.mark_failed(&task)?;
                Err(e)
            }
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                tracing::error!(
                    "Crawl of {} (job {}) panicked: {}",
                    task.domain,
                    job_id,
                    message
                );
                self.adapter.mark_failed(&task)?;
                Err(ScoutError::Panicked {
                    domain: task.domain.clone(),
                    message,
                })
            }
        };

        if let Err(e) = self.lock().and_then(|mut store| store.remove_job(&job_id)) {
            tracing::warn!("Could not remove job {}: {}", job_id, e);
        }
        result
    }

    async fn crawl<F: PageFetcher>(&self, task: &CrawlTask, fetcher: F) -> Result<CrawlSummary, ScoutError> {
        let seed = CrawlUrl::from_domain(&task.domain)?;
        let crawler = Crawler::new(
            fetcher,
            Arc::clone(&self.sink),
            self.adapter.clone(),
            self.crawler.clone(),
        );
        crawler.start(vec![seed]).await
    }

    /// Refreshes the job's heartbeat until aborted
    fn spawn_heartbeat(&self, job_id: String) -> tokio::task::JoinHandle<()> {
        let store = Arc::clone(&self.store);
        let period = self.heartbeat;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let beat = match store.lock() {
                    Ok(mut store) => store.heartbeat_job(&job_id, Utc::now()),
                    Err(_) => Err(StorageError::LockPoisoned),
                };
                match beat {
                    Ok(true) => tracing::trace!("Heartbeat for job {}", job_id),
                    Ok(false) => tracing::warn!("Job {} is no longer registered", job_id),
                    Err(e) => tracing::warn!("Heartbeat for job {} failed: {}", job_id, e),
                }
            }
        })
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, S>, StorageError> {
        self.store.lock().map_err(|_| StorageError::LockPoisoned)
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
