//! URL handling module for Onion-Scout
//!
//! This module provides the crawl URL value type, link resolution and
//! normalization, authority extraction, and the classification of a page's
//! links into internal URLs and external onion domains.

mod domain;
mod extractor;
mod normalize;
mod object;

// Re-export main types and functions
pub use domain::{extract_authority, is_onion_host, ONION_TLD};
pub use extractor::{parse_favicon_url, ParsedLinks, UrlExtractor};
pub use normalize::{is_bare_domain, is_file_path, is_relative_path, normalize_url};
pub use object::{CrawlUrl, RawLink, MIN_URL_LEN};
