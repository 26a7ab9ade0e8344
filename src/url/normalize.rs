use crate::url::domain::is_onion_host;
use crate::{UrlError, UrlResult};
use url::Url;

/// Extensions of files that are never crawled (archives, documents, media, binaries)
const DENIED_EXTENSIONS: &[&str] = &[
    ".zip", ".7z", ".rar", ".doc", ".docx", ".docm", ".pdf", ".ods", ".xlsx", ".xls", ".txt",
    ".odt", ".tgz", ".tar.xz", ".tar.z", ".tar.zst", ".tar.gz", ".tar.lz", ".tar.bz2", ".tar",
    ".tlz", ".tbz2", ".txz", ".png", ".jpg", ".jpeg", ".csv", ".bin", ".bat", ".accdb", ".dll",
    ".exe", ".gif", ".mov", ".mp3", ".mp4", ".mpeg", ".mpg", ".ppt", ".pptx", ".xps", ".cbz",
    ".cbr",
];

/// Schemes the crawler follows
const ACCEPTED_SCHEMES: &[&str] = &["http", "https"];

/// Normalizes a resolved link according to Onion-Scout's crawl rules
///
/// # Normalization Steps
///
/// 1. Remove the query string and fragment
/// 2. Reject schemes other than http/https
/// 3. Reject URLs without a host, or whose host is not an onion address
/// 4. Reject paths leading to a known non-HTML file
///
/// # Arguments
///
/// * `url` - An absolute URL, already resolved against its page
///
/// # Returns
///
/// * `Ok(Url)` - The URL as it should be requested
/// * `Err(UrlError)` - The link is not crawlable
///
/// # Examples
///
/// ```
/// use url::Url;
/// use onion_scout::url::normalize_url;
///
/// let url = Url::parse("http://example.onion/page?q=1#top").unwrap();
/// assert_eq!(normalize_url(url).unwrap().as_str(), "http://example.onion/page");
/// ```
pub fn normalize_url(mut url: Url) -> UrlResult<Url> {
    url.set_query(None);
    url.set_fragment(None);

    if !ACCEPTED_SCHEMES.contains(&url.scheme()) {
        return Err(UrlError::InvalidScheme(url.scheme().to_string()));
    }

    let host = match url.host_str() {
        Some(host) if !host.is_empty() => host,
        _ => return Err(UrlError::MissingDomain),
    };

    if !is_onion_host(host) {
        return Err(UrlError::NotOnion(host.to_string()));
    }

    if is_file_path(url.path()) {
        return Err(UrlError::DeniedExtension(url.path().to_string()));
    }

    Ok(url)
}

/// Checks if a path leads to a downloadable, non-HTML file
///
/// The comparison is case-insensitive and requires at least one character
/// before the extension.
pub fn is_file_path(path: &str) -> bool {
    let path = path.to_ascii_lowercase();
    DENIED_EXTENSIONS
        .iter()
        .any(|ext| path.len() > ext.len() && path.ends_with(ext))
}

/// Checks if a raw href is written as a site-relative path
///
/// Recognizes `/x`, `./x`, `../x` and bare page names ending in `.html` or `.php`.
pub fn is_relative_path(href: &str) -> bool {
    (href.len() > 1 && href.starts_with('/'))
        || (href.len() > 2 && href.starts_with("./"))
        || (href.len() > 3 && href.starts_with("../"))
        || href.ends_with(".html")
        || href.ends_with(".php")
}

/// Checks if a raw href is a bare domain written without a scheme
///
/// Labels are 1 to 63 characters of letters, digits and hyphens; the whole
/// name is at most 255 characters and may not start or end with a hyphen.
/// Names ending in a denied file extension are not domains.
pub fn is_bare_domain(href: &str) -> bool {
    if href.is_empty() || href.len() > 255 {
        return false;
    }
    if href.starts_with('-') || href.ends_with('-') || is_file_path(href) {
        return false;
    }

    let name = href.strip_suffix('.').unwrap_or(href);
    !name.is_empty()
        && name.split('.').all(|label| {
            !label.is_empty()
                && label.len() <= 63
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}
