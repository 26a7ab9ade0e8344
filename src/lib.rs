//! Onion-Scout: a distributed crawler for onion services
//!
//! This crate walks a single onion domain per run, classifying every link it
//! finds as internal (crawled further) or external (turned into a new crawl
//! task), and reports page data to a separate storage service. Workers
//! coordinate only through persisted crawl tasks.

pub mod config;
pub mod crawler;
pub mod output;
pub mod storage;
pub mod tasks;
pub mod url;

use thiserror::Error;

/// Main error type for Onion-Scout operations
#[derive(Debug, Error)]
pub enum ScoutError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Task error: {0}")]
    Task(#[from] TaskError),

    #[error("Result sink error: {0}")]
    Sink(#[from] output::SinkError),

    #[error("URL error: {0}")]
    UrlError(#[from] UrlError),

    #[error("No user agents configured")]
    NoUserAgents,

    #[error("No proxies available")]
    NoProxies,

    #[error("Crawl of {domain} panicked: {message}")]
    Panicked { domain: String, message: String },
}

impl ScoutError {
    /// Returns true for errors that signal fleet-level resource exhaustion
    ///
    /// The worker loop backs off and retries later on these instead of
    /// treating them as a failed run.
    pub fn is_exhaustion(&self) -> bool {
        matches!(
            self,
            Self::NoUserAgents | Self::NoProxies | Self::Task(TaskError::NoActiveTasks)
        )
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid domain: {0}")]
    InvalidDomain(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("URL value is empty")]
    Empty,

    #[error("URL value '{0}' is too short to be an address")]
    TooShort(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing domain in URL")]
    MissingDomain,

    #[error("Host '{0}' is not an onion address")]
    NotOnion(String),

    #[error("Path '{0}' leads to a non-HTML file")]
    DeniedExtension(String),
}

/// Crawl task state machine errors
#[derive(Debug, Error)]
pub enum TaskError {
    #[error("No active tasks available")]
    NoActiveTasks,

    #[error("Required value '{0}' not provided for task transition")]
    MissingValue(&'static str),

    #[error("Task {domain} could not move to {to}: not in the expected state")]
    TransitionRejected {
        domain: String,
        to: tasks::TaskStatus,
    },

    #[error("Task not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),
}

/// Result type alias for Onion-Scout operations
pub type Result<T> = std::result::Result<T, ScoutError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

/// Result type alias for URL operations
pub type UrlResult<T> = std::result::Result<T, UrlError>;

/// Result type alias for task transitions
pub type TaskResult<T> = std::result::Result<T, TaskError>;

// Re-export commonly used types
pub use config::Config;
pub use tasks::{CrawlTask, TaskStatus};
pub use url::{CrawlUrl, UrlExtractor};
