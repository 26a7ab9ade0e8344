//! Crawler module for page fetching and processing
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with adaptive timeouts and blocking retries
//! - HTML parsing and link extraction
//! - The per-run frontier
//! - User-agent and proxy selection
//! - Overall crawl coordination

mod coordinator;
mod fetcher;
mod frontier;
mod parser;
mod pool;

pub use coordinator::Crawler;
pub use fetcher::{build_headers, build_http_client, run_request, FetchEngine, PageFetcher, PageResult};
pub use frontier::Frontier;
pub use parser::{parse_html, ParsedPage};
pub use pool::NetworkPool;
