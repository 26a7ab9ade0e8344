use url::Url;

/// Top-level label of the network this crawler stays on
pub const ONION_TLD: &str = ".onion";

/// Extracts the authority (lowercase host plus explicit port) from a URL
///
/// Two links are on the same site exactly when their authorities are equal.
///
/// # Arguments
///
/// * `url` - The URL to extract the authority from
///
/// # Returns
///
/// * `Some(String)` - The authority, e.g. `example.onion` or `example.onion:8080`
/// * `None` - If the URL has no host
///
/// # Examples
///
/// ```
/// use url::Url;
/// use onion_scout::url::extract_authority;
///
/// let url = Url::parse("http://EXAMPLE.onion/path").unwrap();
/// assert_eq!(extract_authority(&url), Some("example.onion".to_string()));
///
/// let url = Url::parse("http://example.onion:8080/").unwrap();
/// assert_eq!(extract_authority(&url), Some("example.onion:8080".to_string()));
/// ```
pub fn extract_authority(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    if host.is_empty() {
        return None;
    }

    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Returns true if the host ends with the onion label and has something before it
pub fn is_onion_host(host: &str) -> bool {
    let host = host.to_ascii_lowercase();
    host.len() > ONION_TLD.len()
        && host.ends_with(ONION_TLD)
        && !host.chars().any(char::is_whitespace)
}
