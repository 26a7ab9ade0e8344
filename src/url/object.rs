use crate::{UrlError, UrlResult};
use serde::{Deserialize, Serialize};
use std::borrow::Borrow;
use std::fmt;
use std::hash::{Hash, Hasher};

/// Shortest value accepted as an address
pub const MIN_URL_LEN: usize = 6;

/// A link as it appears on a page, before classification
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawLink {
    pub url: String,
    #[serde(default)]
    pub anchor: String,
}

impl RawLink {
    pub fn new(url: impl Into<String>, anchor: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            anchor: anchor.into(),
        }
    }
}

/// An address scheduled for crawling
///
/// Equality and hashing look only at `value`, so two `CrawlUrl`s for the same
/// address are interchangeable in sets regardless of anchor text or how many
/// times either was requested.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlUrl {
    value: String,
    #[serde(default)]
    anchor: String,
    #[serde(default)]
    attempts: u32,
}

impl CrawlUrl {
    /// Creates a new URL with empty anchor text
    ///
    /// # Errors
    ///
    /// Returns `UrlError::Empty` for an empty value and `UrlError::TooShort`
    /// for values shorter than [`MIN_URL_LEN`].
    pub fn new(value: impl Into<String>) -> UrlResult<Self> {
        Self::with_anchor(value, String::new())
    }

    /// Creates a new URL carrying the text of the link that pointed at it
    pub fn with_anchor(value: impl Into<String>, anchor: impl Into<String>) -> UrlResult<Self> {
        let value = value.into();
        if value.is_empty() {
            return Err(UrlError::Empty);
        }
        if value.len() < MIN_URL_LEN {
            return Err(UrlError::TooShort(value));
        }

        Ok(Self {
            value,
            anchor: anchor.into(),
            attempts: 0,
        })
    }

    /// Builds the seed URL for a crawl task's domain
    pub fn from_domain(domain: &str) -> UrlResult<Self> {
        Self::new(format!("http://{}/", domain))
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn anchor(&self) -> &str {
        &self.anchor
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Counts one send attempt. Called before every request, whatever its outcome.
    pub fn record_attempt(&mut self) {
        self.attempts = self.attempts.saturating_add(1);
    }
}

impl PartialEq for CrawlUrl {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl Eq for CrawlUrl {}

impl Hash for CrawlUrl {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl Borrow<str> for CrawlUrl {
    fn borrow(&self) -> &str {
        &self.value
    }
}

impl fmt::Display for CrawlUrl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}
