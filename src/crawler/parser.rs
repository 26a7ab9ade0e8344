//! HTML parser for extracting page metadata and links
//!
//! This module handles parsing HTML content to extract:
//! - Page title (first `<h1>`) and meta title (`<title>`)
//! - Meta description
//! - Readable body text
//! - On-page links with their anchor text
//! - The favicon reference, when asked for

use crate::url::RawLink;
use scraper::{ElementRef, Html, Selector};

/// Elements whose text is never part of the readable page content
const NON_CONTENT_TAGS: &[&str] = &["script", "style", "noscript", "template"];

/// Extracted information from an HTML page
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedPage {
    /// Text of the first `<h1>`
    pub page_title: Option<String>,

    /// Text of `<title>`
    pub meta_title: Option<String>,

    /// Content of `<meta name="description">`
    pub meta_description: Option<String>,

    /// Body text with scripts and styles removed, whitespace collapsed
    pub text: Option<String>,

    /// Every `<a href>` in the body with a non-blank href
    pub links: Vec<RawLink>,

    /// Raw href of the favicon `<link>`, unresolved
    pub favicon_href: Option<String>,
}

/// Parses HTML content and extracts metadata and links
///
/// # Link Extraction Rules
///
/// - Only `<a>` elements inside `<body>` are considered
/// - The href is kept as written; resolution happens during classification
/// - Empty and whitespace-only hrefs are skipped
/// - Anchor text is the element's full text content, trimmed
///
/// # Arguments
///
/// * `html` - The HTML content to parse
/// * `with_favicon` - Whether to look for a favicon reference in `<head>`
///
/// # Example
///
/// ```
/// use onion_scout::crawler::parse_html;
///
/// let html = r#"<html><head><title>Test</title></head><body><a href="/page">Link</a></body></html>"#;
/// let parsed = parse_html(html, false);
/// assert_eq!(parsed.meta_title, Some("Test".to_string()));
/// assert_eq!(parsed.links[0].url, "/page");
/// ```
pub fn parse_html(html: &str, with_favicon: bool) -> ParsedPage {
    let document = Html::parse_document(html);

    ParsedPage {
        page_title: extract_page_title(&document),
        meta_title: extract_meta_title(&document),
        meta_description: extract_meta_description(&document),
        text: extract_text(&document),
        links: extract_links(&document),
        favicon_href: if with_favicon {
            extract_favicon_href(&document)
        } else {
            None
        },
    }
}

fn first_text(document: &Html, selector: &str) -> Option<String> {
    let selector = Selector::parse(selector).ok()?;

    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Extracts the page heading; nested markup inside the `<h1>` is flattened
fn extract_page_title(document: &Html) -> Option<String> {
    first_text(document, "h1")
}

fn extract_meta_title(document: &Html) -> Option<String> {
    first_text(document, "head title")
}

fn extract_meta_description(document: &Html) -> Option<String> {
    let selector = Selector::parse(r#"head meta[name="description"][content]"#).ok()?;

    document
        .select(&selector)
        .next()
        .and_then(|element| element.value().attr("content"))
        .map(|content| content.trim().to_string())
        .filter(|s| !s.is_empty())
}

fn extract_text(document: &Html) -> Option<String> {
    let selector = Selector::parse("body").ok()?;
    let body = document.select(&selector).next()?;

    let mut words: Vec<&str> = Vec::new();
    for node in body.descendants() {
        let Some(text) = node.value().as_text() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |el| NON_CONTENT_TAGS.contains(&el.name()))
        });
        if !hidden {
            words.extend(text.split_whitespace());
        }
    }

    if words.is_empty() {
        None
    } else {
        Some(words.join(" "))
    }
}

fn extract_links(document: &Html) -> Vec<RawLink> {
    let Ok(selector) = Selector::parse("body a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            if href.trim().is_empty() {
                return None;
            }
            Some(RawLink::new(href, anchor_text(element)))
        })
        .collect()
}

fn anchor_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// Finds the favicon reference in `<head>`
///
/// Sites often list several icons for different resolutions; the first one
/// is usually the smallest. Links whose href mentions "favicon" win over
/// generic `rel="icon"` links.
fn extract_favicon_href(document: &Html) -> Option<String> {
    for query in [r#"head link[href*="favicon"]"#, r#"head link[rel~="icon"][href]"#] {
        let Ok(selector) = Selector::parse(query) else {
            continue;
        };

        let found = document
            .select(&selector)
            .filter_map(|element| element.value().attr("href"))
            .map(str::trim)
            .find(|href| !href.is_empty());

        if let Some(href) = found {
            return Some(href.to_string());
        }
    }
    None
}
