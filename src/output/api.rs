//! HTTP client for the storage service
//!
//! Page results and run summaries are posted as JSON with token
//! authentication. Transport errors and 5xx answers are retried a bounded
//! number of times; 4xx answers are not.

use crate::config::ApiConfig;
use crate::crawler::PageResult;
use crate::output::traits::{CrawlSummary, ResultSink, SinkError, SinkResult};
use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use url::Url;

/// Pause before the first retry; doubles with each further attempt
const RETRY_BASE_PAUSE: Duration = Duration::from_millis(250);

pub struct ApiClient {
    client: Client,
    api_key: String,
    response_endpoint: Url,
    summary_endpoint: Url,
    max_retries: u32,
}

impl ApiClient {
    /// Creates a client from the `[api]` configuration section
    ///
    /// # Returns
    ///
    /// * `Ok(ApiClient)` - Endpoints resolved against the base URL
    /// * `Err(SinkError)` - The base URL or an endpoint path is invalid
    pub fn new(config: &ApiConfig) -> SinkResult<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|source| SinkError::Http {
                endpoint: config.base_url.clone(),
                source,
            })?;

        let base = Url::parse(&config.base_url)?;
        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            response_endpoint: base.join(&config.response_endpoint)?,
            summary_endpoint: base.join(&config.summary_endpoint)?,
            max_retries: config.max_retries.max(1),
        })
    }

    async fn post_json<T: Serialize + Sync>(&self, endpoint: &Url, record: &T) -> SinkResult<()> {
        let body = serde_json::to_vec(record)?;
        let mut attempt = 0;

        loop {
            attempt += 1;
            let mut request = self
                .client
                .post(endpoint.clone())
                .header("Content-Type", "application/json")
                .body(body.clone());
            if !self.api_key.is_empty() {
                request = request.header(AUTHORIZATION, format!("Token {}", self.api_key));
            }

            match request.send().await {
                Ok(response) if response.status().is_success() => return Ok(()),
                Ok(response) if response.status().is_client_error() => {
                    return Err(SinkError::Status {
                        endpoint: endpoint.to_string(),
                        status: response.status().as_u16(),
                    });
                }
                Ok(response) => {
                    tracing::warn!(
                        "Post to {} answered {} (attempt {}/{})",
                        endpoint,
                        response.status(),
                        attempt,
                        self.max_retries
                    );
                }
                Err(e) => {
                    tracing::warn!(
                        "Post to {} failed (attempt {}/{}): {}",
                        endpoint,
                        attempt,
                        self.max_retries,
                        e
                    );
                }
            }

            if attempt >= self.max_retries {
                return Err(SinkError::Exhausted {
                    endpoint: endpoint.to_string(),
                    attempts: attempt,
                });
            }
            tokio::time::sleep(RETRY_BASE_PAUSE * 2u32.pow(attempt - 1)).await;
        }
    }
}

#[async_trait]
impl ResultSink for ApiClient {
    async fn post_page_result(&self, page: &PageResult) -> SinkResult<()> {
        self.post_json(&self.response_endpoint, page).await
    }

    async fn post_summary(&self, summary: &CrawlSummary) -> SinkResult<()> {
        self.post_json(&self.summary_endpoint, summary).await
    }
}
