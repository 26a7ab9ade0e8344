//! Output module for reporting crawl results
//!
//! This module handles:
//! - Posting page results and run summaries to the storage service
//! - Logging results when no service is configured
//! - Task statistics for the `--stats` report

mod api;
mod log;
pub mod stats;
mod traits;

pub use api::ApiClient;
pub use log::TracingSink;
pub use stats::{load_statistics, print_statistics, TaskStatistics};
pub use traits::{CrawlSummary, ResultSink, SinkError, SinkResult};

use crate::config::ApiConfig;
use std::sync::Arc;

/// Builds the sink a worker reports through
///
/// # Arguments
///
/// * `api` - The `[api]` section, if present
///
/// # Returns
///
/// * `Ok(Arc<dyn ResultSink>)` - An `ApiClient`, or a `TracingSink` without API
/// * `Err(SinkError)` - The API section holds an invalid URL
pub fn build_sink(api: Option<&ApiConfig>) -> SinkResult<Arc<dyn ResultSink>> {
    match api {
        Some(config) => Ok(Arc::new(ApiClient::new(config)?)),
        None => {
            tracing::warn!("No [api] section configured, results will only be logged");
            Ok(Arc::new(TracingSink))
        }
    }
}
