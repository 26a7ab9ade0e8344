use crate::url::domain::extract_authority;
use crate::url::normalize::{is_bare_domain, is_relative_path, normalize_url};
use crate::url::object::{CrawlUrl, RawLink};
use crate::{UrlError, UrlResult};
use std::collections::HashSet;
use url::{ParseError, Url};

/// Outcome of classifying the links found on one page
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ParsedLinks {
    /// Links on the crawled domain, with their resolved address and anchor text
    pub internal: HashSet<CrawlUrl>,
    /// Other onion domains, reduced to their bare authority
    pub external: HashSet<CrawlUrl>,
}

impl ParsedLinks {
    pub fn is_empty(&self) -> bool {
        self.internal.is_empty() && self.external.is_empty()
    }
}

/// Classifies raw page links into internal URLs and external domains
///
/// An extractor is bound to the root domain of one crawl run. Links are
/// resolved against the page they were found on, stripped of query and
/// fragment, filtered (scheme, onion host, file extension) and then split by
/// comparing their authority to the root domain.
#[derive(Debug, Clone)]
pub struct UrlExtractor {
    root_domain: String,
}

impl UrlExtractor {
    /// Creates an extractor for the domain of the run's starting URL
    ///
    /// # Errors
    ///
    /// Returns `UrlError::MissingDomain` if the starting URL has no host.
    pub fn new(starting_url: &CrawlUrl) -> UrlResult<Self> {
        let url = Url::parse(starting_url.value()).map_err(|_| UrlError::MissingDomain)?;
        let root_domain = extract_authority(&url).ok_or(UrlError::MissingDomain)?;
        Ok(Self { root_domain })
    }

    /// Creates an extractor for an already known authority
    pub fn for_domain(root_domain: impl Into<String>) -> Self {
        Self {
            root_domain: root_domain.into().to_lowercase(),
        }
    }

    pub fn root_domain(&self) -> &str {
        &self.root_domain
    }

    /// Classifies every raw link found on `current_page`
    ///
    /// # Arguments
    ///
    /// * `raw_links` - Links as extracted from the page, `None` when the page had none
    /// * `current_page` - Final address of the page the links were found on
    ///
    /// # Returns
    ///
    /// Internal URLs (full address plus anchor) and external domains (bare
    /// authority, no anchor). Links that cannot be crawled are dropped.
    pub fn parse(&self, raw_links: Option<&[RawLink]>, current_page: &Url) -> ParsedLinks {
        let mut parsed = ParsedLinks::default();

        let Some(raw_links) = raw_links else {
            return parsed;
        };

        for link in raw_links {
            let Some(url) = resolve_link(&link.url, current_page) else {
                tracing::trace!("Unresolvable link '{}' on {}", link.url, current_page);
                continue;
            };

            let url = match normalize_url(url) {
                Ok(url) => url,
                Err(e) => {
                    tracing::trace!("Dropping link '{}': {}", link.url, e);
                    continue;
                }
            };

            let Some(authority) = extract_authority(&url) else {
                continue;
            };

            let created = if authority == self.root_domain {
                CrawlUrl::with_anchor(url.as_str(), link.anchor.trim())
                    .map(|u| parsed.internal.insert(u))
            } else {
                CrawlUrl::new(authority).map(|u| parsed.external.insert(u))
            };

            if let Err(e) = created {
                tracing::trace!("Skipping link '{}': {}", link.url, e);
            }
        }

        parsed
    }
}

/// Builds the absolute favicon address from a `<link href>` value
///
/// Favicon hrefs are usually paths; they are resolved against the page.
/// Returns `None` for hrefs that do not lead to an http(s) resource.
pub fn parse_favicon_url(href: &str, current_page: &Url) -> Option<String> {
    let mut url = resolve_link(href, current_page)?;
    url.set_fragment(None);

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return None;
    }

    Some(url.to_string())
}

/// Turns a raw href into an absolute URL
///
/// Absolute links are taken as they are. Relative ones are tried as a path on
/// the current page first, then as a bare domain missing its scheme, and
/// finally as any other relative reference.
fn resolve_link(href: &str, current_page: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    match Url::parse(href) {
        Ok(url) => Some(url),
        Err(ParseError::RelativeUrlWithoutBase) => {
            if is_relative_path(href) {
                current_page.join(href).ok()
            } else if is_bare_domain(href) {
                Url::parse(&format!("http://{}", href)).ok()
            } else if !href.contains(char::is_whitespace) {
                current_page.join(href).ok()
            } else {
                None
            }
        }
        Err(_) if is_relative_path(href) => current_page.join(href).ok(),
        Err(_) => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn extractor() -> UrlExtractor {
        UrlExtractor::new(&CrawlUrl::new("http://example.onion").unwrap()).unwrap()
    }

    fn page() -> Url {
        Url::parse("http://example.onion/").unwrap()
    }

    fn links(pairs: &[(&str, &str)]) -> Vec<RawLink> {
        pairs.iter().map(|(u, a)| RawLink::new(*u, *a)).collect()
    }

    fn values(set: &HashSet<CrawlUrl>) -> HashSet<String> {
        set.iter().map(|u| u.value().to_string()).collect()
    }

    #[test]
    fn test_root_domain_from_starting_url() {
        let extractor = UrlExtractor::new(&CrawlUrl::new("http://found.onion/").unwrap()).unwrap();
        assert_eq!(extractor.root_domain(), "found.onion");
    }

    #[test]
    fn test_parse_mixed_collection() {
        let raw = links(&[
            ("http://example.onion/page", "Url 1"),
            ("http://example.onion/path?page=1", "Url 2"),
            ("http://example.onion/path?query=string#fragment", "Url 3"),
            ("http://example.onion/path#fragment", "Url 4"),
            ("http://other.onion", "Url 5"),
            ("http://external.onion", ""),
            ("page.html", "..."),
            ("page.php", "...."),
            ("/path", "Test text"),
            ("ftp://example.onion/baz", ""),
            ("http://example.onion/some.jpeg", "Image 1"),
            ("some-2.jpeg", "Image 2"),
            ("/some-3.jpeg", "Image 3"),
            ("http://example.onion/some.pdf", "Pdf 1"),
            ("example.onion", "malformed url"),
            ("external-2.onion", "malformed url 2"),
            ("https://clearnet.com/", "Clearnet"),
            ("mailto:admin@example.onion", "Mail"),
        ]);

        let parsed = extractor().parse(Some(&raw), &page());

        let expected_internal: HashSet<String> = [
            "http://example.onion/",
            "http://example.onion/page",
            "http://example.onion/path",
            "http://example.onion/page.html",
            "http://example.onion/page.php",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();
        assert_eq!(values(&parsed.internal), expected_internal);

        let expected_external: HashSet<String> = ["other.onion", "external.onion", "external-2.onion"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(values(&parsed.external), expected_external);
    }

    #[test]
    fn test_none_collection_yields_empty_sets() {
        let parsed = extractor().parse(None, &page());
        assert!(parsed.internal.is_empty());
        assert!(parsed.external.is_empty());
    }

    #[test]
    fn test_duplicates_collapse() {
        let unique = links(&[("http://example.onion/a", "A"), ("http://b.onion/", "")]);
        let mut duplicated = unique.clone();
        duplicated.extend(unique.clone());
        duplicated.push(RawLink::new("http://example.onion/a#again", "A again"));

        let extractor = extractor();
        assert_eq!(
            extractor.parse(Some(&unique), &page()),
            extractor.parse(Some(&duplicated), &page())
        );
    }

    #[test]
    fn test_query_and_fragment_stripping() {
        let x = UrlExtractor::for_domain("x.onion");
        let page = Url::parse("http://x.onion/").unwrap();

        let stripped = x.parse(Some(&links(&[("http://x.onion/p?q=1#frag", "")])), &page);
        let plain = x.parse(Some(&links(&[("http://x.onion/p", "")])), &page);
        assert_eq!(stripped, plain);
        assert_eq!(
            values(&plain.internal),
            HashSet::from(["http://x.onion/p".to_string()])
        );
    }

    #[test]
    fn test_relative_page_resolves_against_directory() {
        let current = Url::parse("http://example.onion/dir/").unwrap();
        let parsed = extractor().parse(Some(&links(&[("page.html", "Page")])), &current);

        assert_eq!(
            values(&parsed.internal),
            HashSet::from(["http://example.onion/dir/page.html".to_string()])
        );
        assert!(parsed.external.is_empty());
    }

    #[test]
    fn test_relative_without_leading_slash() {
        let current = Url::parse("http://example.onion/dir/index").unwrap();
        let parsed = extractor().parse(Some(&links(&[("forum/thread", "")])), &current);
        assert!(parsed.internal.contains("http://example.onion/dir/forum/thread"));
    }

    #[test]
    fn test_external_reduced_to_authority() {
        let parsed = extractor().parse(
            Some(&links(&[("http://other.onion/deep/path", "Some anchor")])),
            &page(),
        );

        assert!(parsed.internal.is_empty());
        let external: Vec<&CrawlUrl> = parsed.external.iter().collect();
        assert_eq!(external.len(), 1);
        assert_eq!(external[0].value(), "other.onion");
        assert_eq!(external[0].anchor(), "");
    }

    #[test]
    fn test_port_makes_a_different_authority() {
        let parsed = extractor().parse(
            Some(&links(&[("http://example.onion:8080/", "")])),
            &page(),
        );
        assert!(parsed.external.contains("example.onion:8080"));
    }

    #[test]
    fn test_pdf_never_classified() {
        let raw = links(&[
            ("http://example.onion/doc.pdf", ""),
            ("/files/report.pdf", ""),
            ("http://other.onion/leak.pdf", ""),
        ]);
        let parsed = extractor().parse(Some(&raw), &page());
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_blank_and_anchor_only_links_skipped() {
        let raw = links(&[("", ""), ("   ", ""), ("#top", "Top")]);
        assert!(extractor().parse(Some(&raw), &page()).is_empty());
    }

    #[test]
    fn test_anchor_text_trimmed() {
        let raw = links(&[("/about", "  About us \n")]);
        let parsed = extractor().parse(Some(&raw), &page());
        let url = parsed.internal.iter().next().unwrap();
        assert_eq!(url.anchor(), "About us");
    }

    #[test]
    fn test_parse_favicon_url() {
        let current = Url::parse("http://example.onion/dir/").unwrap();

        assert_eq!(
            parse_favicon_url("/favicon.ico", &current),
            Some("http://example.onion/favicon.ico".to_string())
        );
        assert_eq!(
            parse_favicon_url("http://cdn.onion/favicon.png", &current),
            Some("http://cdn.onion/favicon.png".to_string())
        );
        assert_eq!(parse_favicon_url("data:image/png;base64,AAAA", &current), None);
    }
}
