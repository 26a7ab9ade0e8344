//! Per-run crawl frontier
//!
//! Three sets scoped to one crawl run: URLs still pending, URLs done, and
//! external domains already handed to task creation. Nothing here is
//! persisted.

use crate::url::CrawlUrl;
use std::collections::HashSet;

#[derive(Debug, Default)]
pub struct Frontier {
    found: HashSet<CrawlUrl>,
    requested: HashSet<CrawlUrl>,
    external_domains: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a frontier whose pending set holds the seeds
    pub fn seeded(seeds: impl IntoIterator<Item = CrawlUrl>) -> Self {
        Self {
            found: seeds.into_iter().collect(),
            ..Default::default()
        }
    }

    /// Clones up to `max` pending URLs into a work batch
    ///
    /// The URLs stay in `found` until their outcome is merged back.
    pub fn next_batch(&self, max: usize) -> Vec<CrawlUrl> {
        self.found.iter().take(max).cloned().collect()
    }

    /// Keeps a failed URL pending, carrying its updated attempt count
    pub fn retain_for_retry(&mut self, url: CrawlUrl) {
        self.found.replace(url);
    }

    /// Moves a URL from pending to done
    pub fn complete(&mut self, url: CrawlUrl) {
        self.found.remove(url.value());
        self.requested.insert(url);
    }

    /// Adds an internal URL unless it is already pending or done
    ///
    /// Returns true if the URL is new to this run.
    pub fn add_internal(&mut self, url: CrawlUrl) -> bool {
        if self.requested.contains(url.value()) || self.found.contains(url.value()) {
            return false;
        }
        self.found.insert(url)
    }

    /// Records an external domain; returns true on first sighting
    pub fn add_external(&mut self, domain: &str) -> bool {
        if self.external_domains.contains(domain) {
            return false;
        }
        self.external_domains.insert(domain.to_string())
    }

    pub fn is_empty(&self) -> bool {
        self.found.is_empty()
    }

    pub fn pending_len(&self) -> usize {
        self.found.len()
    }

    pub fn requested(&self) -> &HashSet<CrawlUrl> {
        &self.requested
    }

    pub fn external_domains(&self) -> &HashSet<String> {
        &self.external_domains
    }
}
