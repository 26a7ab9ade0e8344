//! Sink that only logs, used when no storage service is configured

use crate::crawler::PageResult;
use crate::output::traits::{CrawlSummary, ResultSink, SinkResult};
use async_trait::async_trait;

#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

#[async_trait]
impl ResultSink for TracingSink {
    async fn post_page_result(&self, page: &PageResult) -> SinkResult<()> {
        tracing::info!(
            url = %page.requested_url,
            status = page.status.as_deref().unwrap_or("-"),
            elapsed = page.elapsed,
            links = page.on_page_urls.len(),
            favicon = page.favicon_base64.is_some(),
            "Page result"
        );
        Ok(())
    }

    async fn post_summary(&self, summary: &CrawlSummary) -> SinkResult<()> {
        tracing::info!(
            domain = %summary.domain,
            pages = summary.pages_crawled,
            external = summary.external_domains_found,
            elapsed = summary.elapsed_seconds,
            truncated = summary.truncated,
            "Crawl summary"
        );
        Ok(())
    }
}
