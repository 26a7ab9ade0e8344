//! Crawler coordinator - main crawl orchestration logic
//!
//! This module contains the frontier loop that turns a domain's seed URLs
//! into a bounded traversal of that domain:
//! - Probing the first seed (favicon capture)
//! - Draining the frontier in bounded concurrent batches
//! - Merging discovered links back into the frontier
//! - Registering crawl tasks for external domains
//! - Reporting page results and the final summary

use crate::config::CrawlerConfig;
use crate::crawler::fetcher::{run_request, PageFetcher, PageResult};
use crate::crawler::frontier::Frontier;
use crate::output::{CrawlSummary, ResultSink};
use crate::storage::TaskStore;
use crate::tasks::CrawlTaskAdapter;
use crate::url::{CrawlUrl, UrlExtractor};
use crate::{ScoutError, TaskError, UrlError};
use chrono::Utc;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Crawls one domain per call to [`Crawler::start`]
pub struct Crawler<F, S> {
    fetcher: F,
    sink: Arc<dyn ResultSink>,
    tasks: CrawlTaskAdapter<S>,
    config: CrawlerConfig,
    max_run: Option<Duration>,
}

impl<F, S> Crawler<F, S>
where
    F: PageFetcher,
    S: TaskStore + Send + 'static,
{
    /// Creates a new crawler
    ///
    /// # Arguments
    ///
    /// * `fetcher` - Page fetcher used for every request of the run
    /// * `sink` - Receiver of page results and the summary
    /// * `tasks` - Task adapter used to register external domains
    /// * `config` - Batch size, retry ceiling, probe and deadline settings
    pub fn new(
        fetcher: F,
        sink: Arc<dyn ResultSink>,
        tasks: CrawlTaskAdapter<S>,
        config: CrawlerConfig,
    ) -> Self {
        let max_run = config.max_run();
        Self {
            fetcher,
            sink,
            tasks,
            config,
            max_run,
        }
    }

    /// Overrides the wall-clock cap for a run
    pub fn with_max_run(mut self, max_run: Option<Duration>) -> Self {
        self.max_run = max_run;
        self
    }

    /// Crawls the domain of the first seed until the frontier is exhausted
    ///
    /// All seeds are expected to belong to the same domain; seeds on other
    /// domains are fetched but their links classify as external.
    ///
    /// # Returns
    ///
    /// * `Ok(CrawlSummary)` - The run completed (or hit its deadline)
    /// * `Err(ScoutError)` - No usable seed, or the task store failed
    pub async fn start(&self, seeds: Vec<CrawlUrl>) -> Result<CrawlSummary, ScoutError> {
        let first = seeds.first().ok_or(UrlError::Empty)?;
        let extractor = UrlExtractor::new(first)?;
        let started = Instant::now();
        let deadline = self.max_run.map(|limit| started + limit);

        tracing::info!("Starting crawl of {}", extractor.root_domain());

        let mut frontier = Frontier::seeded(seeds.iter().cloned());
        if self.config.probe_favicon {
            let mut probe_url = first.clone();
            let page = run_request(
                &self.fetcher,
                &mut probe_url,
                self.config.max_retries,
                self.config.retry_pause(),
                true,
            )
            .await;
            self.settle(&mut frontier, &extractor, probe_url, page).await?;
        }

        let max_requests = self.config.max_requests.max(1) as usize;
        let mut truncated = false;

        while !frontier.is_empty() {
            if deadline.map_or(false, |at| Instant::now() >= at) {
                tracing::warn!(
                    "Crawl of {} hit its deadline with {} URLs pending",
                    extractor.root_domain(),
                    frontier.pending_len()
                );
                truncated = true;
                break;
            }

            let batch = frontier.next_batch(max_requests);
            tracing::debug!(
                "Fetching batch of {} ({} pending, {} done)",
                batch.len(),
                frontier.pending_len(),
                frontier.requested().len()
            );

            // Settle only once every request of the batch is done, so a
            // slow sink never stalls responses that are still in flight
            let outcomes: Vec<(CrawlUrl, Option<PageResult>)> = batch
                .into_iter()
                .map(|mut url| async move {
                    let page = self.fetcher.get(&mut url, false).await;
                    (url, page)
                })
                .collect::<FuturesUnordered<_>>()
                .collect()
                .await;

            for (url, page) in outcomes {
                self.settle(&mut frontier, &extractor, url, page).await?;
            }
        }

        let mut external_domains: Vec<String> =
            frontier.external_domains().iter().cloned().collect();
        external_domains.sort();

        let summary = CrawlSummary {
            domain: extractor.root_domain().to_string(),
            pages_crawled: frontier.requested().len(),
            external_domains_found: external_domains.len(),
            external_domains,
            elapsed_seconds: started.elapsed().as_secs_f64(),
            completion_timestamp: Utc::now(),
            truncated,
        };

        tracing::info!(
            "Crawl of {} complete: {} pages, {} external domains in {:.1}s",
            summary.domain,
            summary.pages_crawled,
            summary.external_domains_found,
            summary.elapsed_seconds
        );
        if let Err(e) = self.sink.post_summary(&summary).await {
            tracing::error!("Failed to report summary for {}: {}", summary.domain, e);
        }

        Ok(summary)
    }

    /// Merges the outcome of one request into the frontier
    async fn settle(
        &self,
        frontier: &mut Frontier,
        extractor: &UrlExtractor,
        url: CrawlUrl,
        page: Option<PageResult>,
    ) -> Result<(), ScoutError> {
        let Some(page) = page else {
            if url.attempts() < self.config.max_retries {
                frontier.retain_for_retry(url);
            } else {
                tracing::warn!("Dropping {} after {} attempts", url, url.attempts());
                frontier.complete(url);
            }
            return Ok(());
        };

        frontier.complete(url);
        if let Err(e) = self.sink.post_page_result(&page).await {
            tracing::error!("Failed to report result for {}: {}", page.requested_url, e);
        }

        let Some(base) = page.base_url() else {
            return Ok(());
        };
        let links = extractor.parse(Some(&page.on_page_urls), &base);

        let discovered: Vec<String> = links
            .external
            .iter()
            .filter(|external| frontier.add_external(external.value()))
            .map(|external| external.value().to_string())
            .collect();
        for internal in links.internal {
            frontier.add_internal(internal);
        }

        self.register_external(extractor.root_domain(), discovered)
            .await
    }

    /// Creates crawl tasks for newly seen external domains
    ///
    /// Store calls can block on the database lock, so they run on the
    /// blocking pool.
    async fn register_external(&self, root: &str, domains: Vec<String>) -> Result<(), ScoutError> {
        if domains.is_empty() {
            return Ok(());
        }

        let tasks = self.tasks.clone();
        let registered = tokio::task::spawn_blocking(move || {
            for domain in &domains {
                tasks.get_or_create_task(domain)?;
                tracing::debug!("Registered external domain {}", domain);
            }
            Ok::<_, TaskError>(())
        })
        .await;

        match registered {
            Ok(result) => Ok(result?),
            Err(e) => Err(ScoutError::Panicked {
                domain: root.to_string(),
                message: e.to_string(),
            }),
        }
    }
}
