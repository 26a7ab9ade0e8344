//! Result sink trait and types
//!
//! This module defines the interface crawl runs report through and the
//! end-of-run summary record.

use crate::crawler::PageResult;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// Errors that can occur while reporting results
#[derive(Debug, Error)]
pub enum SinkError {
    #[error("HTTP error posting to {endpoint}: {source}")]
    Http {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint} answered with status {status}")]
    Status { endpoint: String, status: u16 },

    #[error("Gave up posting to {endpoint} after {attempts} attempts")]
    Exhausted { endpoint: String, attempts: u32 },

    #[error("Invalid endpoint URL: {0}")]
    Endpoint(#[from] url::ParseError),

    #[error("Failed to encode record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Result type for sink operations
pub type SinkResult<T> = Result<T, SinkError>;

/// Summary of one finished crawl run
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct CrawlSummary {
    /// Root domain of the run
    pub domain: String,

    /// URLs moved to the requested set
    pub pages_crawled: usize,

    /// Number of distinct external domains seen
    pub external_domains_found: usize,

    /// The external domains themselves, sorted
    pub external_domains: Vec<String>,

    pub elapsed_seconds: f64,

    #[serde(with = "chrono::serde::ts_seconds")]
    pub completion_timestamp: DateTime<Utc>,

    /// The run stopped at its deadline with URLs still pending
    pub truncated: bool,
}

/// Receiver of crawl results
///
/// Implementations must be thread-safe; a crawl run posts page results
/// from concurrent fetches.
#[async_trait]
pub trait ResultSink: Send + Sync {
    /// Reports one answered request
    ///
    /// # Arguments
    ///
    /// * `page` - The page record, including the probe favicon if captured
    async fn post_page_result(&self, page: &PageResult) -> SinkResult<()>;

    /// Reports the end of a crawl run
    async fn post_summary(&self, summary: &CrawlSummary) -> SinkResult<()>;
}
