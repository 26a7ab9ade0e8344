//! HTTP fetcher implementation
//!
//! This module handles every outbound page request, including:
//! - Building HTTP clients bound to one proxy and one user agent
//! - Browser-like request headers
//! - Adaptive per-request timeouts
//! - Page parsing and favicon capture for probe requests
//! - The blocking retry wrapper used for single URLs

use crate::config::CrawlerConfig;
use crate::crawler::parser::parse_html;
use crate::url::{parse_favicon_url, CrawlUrl, RawLink};
use crate::ScoutError;
use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ACCEPT_LANGUAGE, CONNECTION, SERVER, USER_AGENT};
use reqwest::{redirect::Policy, Client, Proxy};
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};
use url::Url;

/// Record of one answered request, as reported to the result sink
#[derive(Debug, Clone, Default, Serialize)]
pub struct PageResult {
    /// Address as scheduled, before redirects
    pub requested_url: String,
    /// Final address after redirects
    pub responded_url: Option<String>,
    /// HTTP status code as text
    pub status: Option<String>,
    /// `Server` response header
    pub server: Option<String>,
    /// Seconds from sending the request to reading the body
    pub elapsed: f64,
    /// Set only for 2xx/3xx responses
    #[serde(with = "chrono::serde::ts_seconds_option")]
    pub visited: Option<DateTime<Utc>>,
    pub page_title: Option<String>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub text: Option<String>,
    pub on_page_urls: Vec<RawLink>,
    pub favicon_url: Option<String>,
    pub favicon_base64: Option<String>,
}

impl PageResult {
    /// Returns the numeric status code, if any
    pub fn status_code(&self) -> Option<u16> {
        self.status.as_deref().and_then(|s| s.parse().ok())
    }

    /// Returns true for 2xx and 3xx responses
    pub fn is_success(&self) -> bool {
        self.status_code()
            .map_or(false, |code| (200..400).contains(&code))
    }

    /// Address links on the page are resolved against
    pub fn base_url(&self) -> Option<Url> {
        self.responded_url
            .as_deref()
            .unwrap_or(&self.requested_url)
            .parse::<Url>()
            .ok()
    }
}

/// One attempt at fetching a page
///
/// Implementations must count the attempt on `url` before sending, whatever
/// the outcome, and must never return an error: transport failures are `None`.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    /// Requests `url` once
    ///
    /// # Arguments
    ///
    /// * `url` - The URL to request; its attempt counter is incremented
    /// * `probe` - Also capture the site's favicon
    async fn get(&self, url: &mut CrawlUrl, probe: bool) -> Option<PageResult>;
}

/// Requests `url` until it answers or its attempts reach `max_retries`
///
/// No other URL is tried meanwhile. Returns `None` when every attempt failed.
pub async fn run_request<F>(
    fetcher: &F,
    url: &mut CrawlUrl,
    max_retries: u32,
    pause: Duration,
    probe: bool,
) -> Option<PageResult>
where
    F: PageFetcher + ?Sized,
{
    while url.attempts() < max_retries {
        if let Some(page) = fetcher.get(url, probe).await {
            return Some(page);
        }

        tracing::debug!(
            "Attempt {}/{} failed for {}",
            url.attempts(),
            max_retries,
            url
        );
        if url.attempts() < max_retries && !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    tracing::warn!("Giving up on {} after {} attempts", url, url.attempts());
    None
}

/// Builds the browser-like headers sent with every page request
pub fn build_headers(user_agent: &str) -> Result<HeaderMap, ScoutError> {
    let mut headers = HeaderMap::new();
    headers.insert(
        ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8",
        ),
    );
    headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.5"));
    headers.insert("Sec-Fetch-Dest", HeaderValue::from_static("document"));
    headers.insert("Sec-Fetch-Mode", HeaderValue::from_static("navigate"));
    headers.insert("Sec-Fetch-Site", HeaderValue::from_static("none"));
    headers.insert("Sec-Fetch-User", HeaderValue::from_static("?1"));
    headers.insert(
        "Upgrade-Insecure-Requests",
        HeaderValue::from_static("1"),
    );
    headers.insert(CONNECTION, HeaderValue::from_static("close"));

    let agent = HeaderValue::from_str(user_agent)
        .map_err(|e| ScoutError::Config(crate::ConfigError::Validation(e.to_string())))?;
    headers.insert(USER_AGENT, agent);

    Ok(headers)
}

/// Builds an HTTP client routed through `proxy`
///
/// Onion services commonly use self-signed certificates, so certificate
/// validation is off. Redirects are followed up to `max_redirects` hops.
///
/// # Arguments
///
/// * `proxy` - Proxy address (e.g. `socks5h://127.0.0.1:9050`); `None` connects directly
/// * `max_redirects` - Redirect hop limit
/// * `connect_timeout` - Limit on establishing the connection, proxy handshake included
///
/// # Example
///
/// ```no_run
/// use onion_scout::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(
///     Some("socks5h://127.0.0.1:9050"),
///     10,
///     Duration::from_secs(60),
/// )
/// .unwrap();
/// ```
pub fn build_http_client(
    proxy: Option<&str>,
    max_redirects: usize,
    connect_timeout: Duration,
) -> Result<Client, ScoutError> {
    let mut builder = Client::builder()
        .danger_accept_invalid_certs(true)
        .connect_timeout(connect_timeout)
        .redirect(Policy::limited(max_redirects))
        .gzip(true)
        .brotli(true);

    builder = match proxy {
        Some(address) => builder.proxy(Proxy::all(address)?),
        None => builder.no_proxy(),
    };

    Ok(builder.build()?)
}

/// Page fetcher bound to one proxy and one user agent for a whole crawl run
///
/// The connect timeout and the per-request timeout are the same value. A
/// connection that does not come up within it raises both for the rest of
/// the run; a server that is merely slow to answer does not.
pub struct FetchEngine {
    client: RwLock<Client>,
    proxy: Option<String>,
    max_redirects: usize,
    headers: HeaderMap,
    timeout_secs: AtomicU64,
    timeout_step_secs: u64,
    timeout_ceiling_secs: u64,
    request_pause: Duration,
}

impl FetchEngine {
    /// Creates an engine for one crawl run
    ///
    /// # Arguments
    ///
    /// * `config` - Crawler settings (timeouts, redirects, pauses)
    /// * `user_agent` - User-agent string sent with every request
    /// * `proxy` - Proxy address, or `None` for direct connections
    pub fn new(config: &CrawlerConfig, user_agent: &str, proxy: Option<&str>) -> Result<Self, ScoutError> {
        let client = build_http_client(
            proxy,
            config.max_redirects,
            Duration::from_secs(config.timeout_secs),
        )?;

        Ok(Self {
            client: RwLock::new(client),
            proxy: proxy.map(str::to_string),
            max_redirects: config.max_redirects,
            headers: build_headers(user_agent)?,
            timeout_secs: AtomicU64::new(config.timeout_secs),
            timeout_step_secs: config.timeout_step_secs,
            timeout_ceiling_secs: config.timeout_ceiling_secs.max(config.timeout_secs),
            request_pause: config.request_pause(),
        })
    }

    /// Current per-request timeout
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.load(Ordering::Relaxed))
    }

    /// Client for the next request
    fn client(&self) -> Client {
        match self.client.read() {
            Ok(client) => client.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Raises the timeout by one step, up to the ceiling
    fn widen_timeout(&self) {
        let step = self.timeout_step_secs;
        let ceiling = self.timeout_ceiling_secs;
        let previous = self
            .timeout_secs
            .fetch_update(Ordering::Relaxed, Ordering::Relaxed, |current| {
                Some(current.saturating_add(step).min(ceiling))
            })
            .unwrap_or(ceiling);

        let now = previous.saturating_add(step).min(ceiling);
        if now == previous {
            return;
        }
        tracing::info!("Connect timeout, raising request timeout to {}s", now);

        match build_http_client(
            self.proxy.as_deref(),
            self.max_redirects,
            Duration::from_secs(now),
        ) {
            Ok(client) => match self.client.write() {
                Ok(mut current) => *current = client,
                Err(poisoned) => *poisoned.into_inner() = client,
            },
            Err(e) => tracing::warn!("Could not rebuild client with wider timeout: {}", e),
        }
    }

    async fn pause(&self) {
        if !self.request_pause.is_zero() {
            tokio::time::sleep(self.request_pause).await;
        }
    }

    /// Downloads a resource and returns its bytes, `None` on any failure
    pub async fn get_bytes(&self, url: &str) -> Option<Vec<u8>> {
        let response = self
            .client()
            .get(url)
            .headers(self.headers.clone())
            .timeout(self.timeout())
            .send()
            .await
            .ok()?;

        if !response.status().is_success() {
            tracing::debug!("Resource {} answered {}", url, response.status());
            return None;
        }

        response.bytes().await.ok().map(|b| b.to_vec())
    }

    /// Fetches the favicon referenced by a probe page and base64-encodes it
    async fn capture_favicon(&self, page: &mut PageResult, favicon_href: &str) {
        let Some(base) = page.base_url() else {
            return;
        };
        let Some(favicon_url) = parse_favicon_url(favicon_href, &base) else {
            return;
        };

        page.favicon_base64 = self
            .get_bytes(&favicon_url)
            .await
            .map(|bytes| STANDARD.encode(bytes));
        if page.favicon_base64.is_none() {
            tracing::debug!("Could not download favicon {}", favicon_url);
        }
        page.favicon_url = Some(favicon_url);
    }
}

#[async_trait]
impl PageFetcher for FetchEngine {
    async fn get(&self, url: &mut CrawlUrl, probe: bool) -> Option<PageResult> {
        url.record_attempt();

        let started = Instant::now();
        let sent = self
            .client()
            .get(url.value())
            .headers(self.headers.clone())
            .timeout(self.timeout())
            .send()
            .await;

        let response = match sent {
            Ok(response) => response,
            Err(e) => {
                // Only a circuit that never came up widens the timeout
                if e.is_connect() && e.is_timeout() {
                    self.widen_timeout();
                }
                tracing::debug!(
                    "Request to {} failed on attempt {}: {}",
                    url,
                    url.attempts(),
                    e
                );
                self.pause().await;
                return None;
            }
        };

        let status = response.status();
        let success = status.is_success() || status.is_redirection();
        let mut page = PageResult {
            requested_url: url.value().to_string(),
            responded_url: Some(response.url().to_string()),
            status: Some(status.as_u16().to_string()),
            server: response
                .headers()
                .get(SERVER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string),
            visited: success.then(Utc::now),
            ..Default::default()
        };

        let mut favicon_href = None;
        if success {
            match response.text().await {
                Ok(body) => {
                    let parsed = parse_html(&body, probe);
                    page.page_title = parsed.page_title;
                    page.meta_title = parsed.meta_title;
                    page.meta_description = parsed.meta_description;
                    page.text = parsed.text;
                    page.on_page_urls = parsed.links;
                    favicon_href = parsed.favicon_href;
                }
                Err(e) => tracing::debug!("Could not read body of {}: {}", url, e),
            }
        }
        page.elapsed = started.elapsed().as_secs_f64();

        tracing::debug!(
            "Response: status={} url={} links={}",
            status.as_u16(),
            url,
            page.on_page_urls.len()
        );

        if probe && status.is_success() {
            if let Some(href) = favicon_href {
                self.capture_favicon(&mut page, &href).await;
            }
        }

        self.pause().await;
        Some(page)
    }
}
