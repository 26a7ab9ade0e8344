use serde::Deserialize;
use std::time::Duration;

/// Main configuration structure for Onion-Scout
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    pub network: NetworkConfig,
    #[serde(default)]
    pub api: Option<ApiConfig>,
    pub storage: StorageConfig,
    #[serde(default)]
    pub worker: WorkerConfig,
    #[serde(default)]
    pub seed: Vec<SeedEntry>,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CrawlerConfig {
    /// Maximum number of fetches in flight per batch
    #[serde(rename = "max-requests")]
    pub max_requests: u32,

    /// Number of send attempts per URL before it is dropped
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Initial per-request timeout (seconds)
    #[serde(rename = "timeout-secs")]
    pub timeout_secs: u64,

    /// Amount added to the timeout after each connect timeout (seconds)
    #[serde(rename = "timeout-step-secs", default = "default_timeout_step")]
    pub timeout_step_secs: u64,

    /// Upper bound for the adaptive timeout (seconds)
    #[serde(rename = "timeout-ceiling-secs", default = "default_timeout_ceiling")]
    pub timeout_ceiling_secs: u64,

    /// Maximum redirect hops followed per request
    #[serde(rename = "max-redirects", default = "default_max_redirects")]
    pub max_redirects: usize,

    /// Pause after every request (milliseconds)
    #[serde(rename = "request-pause-ms", default)]
    pub request_pause_ms: u64,

    /// Pause between attempts of a blocking retry (milliseconds)
    #[serde(rename = "retry-pause-ms", default = "default_retry_pause")]
    pub retry_pause_ms: u64,

    /// Fetch and archive the favicon of the first page of each run
    #[serde(rename = "probe-favicon", default = "default_true")]
    pub probe_favicon: bool,

    /// Hard wall-clock cap for a single domain run (seconds)
    #[serde(rename = "max-run-secs", default)]
    pub max_run_secs: Option<u64>,
}

impl CrawlerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn request_pause(&self) -> Duration {
        Duration::from_millis(self.request_pause_ms)
    }

    pub fn retry_pause(&self) -> Duration {
        Duration::from_millis(self.retry_pause_ms)
    }

    pub fn max_run(&self) -> Option<Duration> {
        self.max_run_secs.map(Duration::from_secs)
    }
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_requests: 10,
            max_retries: 4,
            timeout_secs: 60,
            timeout_step_secs: default_timeout_step(),
            timeout_ceiling_secs: default_timeout_ceiling(),
            max_redirects: default_max_redirects(),
            request_pause_ms: 0,
            retry_pause_ms: default_retry_pause(),
            probe_favicon: true,
            max_run_secs: None,
        }
    }
}

/// Outbound network identity configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NetworkConfig {
    /// User-agent strings; one is picked at random per run
    #[serde(rename = "user-agents", default)]
    pub user_agents: Vec<String>,

    /// Proxy addresses (e.g. "socks5h://127.0.0.1:9050"); one is picked per run
    #[serde(default)]
    pub proxies: Vec<String>,

    /// Allow runs without a proxy when none is configured
    #[serde(rename = "allow-direct", default)]
    pub allow_direct: bool,
}

/// Storage service API configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ApiConfig {
    /// Base URL of the storage service
    #[serde(rename = "base-url")]
    pub base_url: String,

    /// Token sent in the Authorization header
    #[serde(rename = "api-key", default)]
    pub api_key: String,

    /// Path receiving per-page results
    #[serde(rename = "response-endpoint", default = "default_response_endpoint")]
    pub response_endpoint: String,

    /// Path receiving end-of-crawl summaries
    #[serde(rename = "summary-endpoint", default = "default_summary_endpoint")]
    pub summary_endpoint: String,

    /// Attempts per post before giving up
    #[serde(rename = "max-retries", default = "default_api_retries")]
    pub max_retries: u32,

    /// Per-request timeout for API calls (seconds)
    #[serde(rename = "timeout-secs", default = "default_api_timeout")]
    pub timeout_secs: u64,
}

/// Task store configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Path to the SQLite database file shared by the fleet
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Worker loop configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WorkerConfig {
    /// Wait before retrying after the fleet ran out of tasks, agents or proxies
    #[serde(rename = "idle-backoff-secs", default = "default_idle_backoff")]
    pub idle_backoff_secs: u64,

    /// Interval between job heartbeats while a crawl runs
    #[serde(rename = "heartbeat-secs", default = "default_heartbeat")]
    pub heartbeat_secs: u64,

    /// Jobs without a heartbeat for this long are considered dead
    #[serde(rename = "job-stale-secs", default = "default_job_stale")]
    pub job_stale_secs: u64,

    /// Interval between reconciliation and cooldown sweeps
    #[serde(rename = "sweep-interval-secs", default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            idle_backoff_secs: default_idle_backoff(),
            heartbeat_secs: default_heartbeat(),
            job_stale_secs: default_job_stale(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

/// Seed domain registered as a crawl task at startup
#[derive(Debug, Clone, Deserialize)]
pub struct SeedEntry {
    /// Onion domain (e.g. "example.onion")
    pub domain: String,

    /// Priority weight; higher runs first among equally old tasks
    #[serde(default)]
    pub importance: i64,

    /// Re-crawl cooldown in days (1..=7)
    #[serde(default = "default_frequency")]
    pub frequency: u8,
}

fn default_timeout_step() -> u64 {
    20
}

fn default_timeout_ceiling() -> u64 {
    180
}

fn default_max_redirects() -> usize {
    10
}

fn default_retry_pause() -> u64 {
    1000
}

fn default_true() -> bool {
    true
}

fn default_response_endpoint() -> String {
    "/api/process-response/".to_string()
}

fn default_summary_endpoint() -> String {
    "/api/process-summary/".to_string()
}

fn default_api_retries() -> u32 {
    3
}

fn default_api_timeout() -> u64 {
    5
}

fn default_idle_backoff() -> u64 {
    30
}

fn default_heartbeat() -> u64 {
    30
}

fn default_job_stale() -> u64 {
    300
}

fn default_sweep_interval() -> u64 {
    600
}

fn default_frequency() -> u8 {
    1
}
