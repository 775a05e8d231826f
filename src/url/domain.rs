use url::Url;

/// Extracts the domain key (lowercase host plus explicit port) from a URL
///
/// The port is kept so that two servers on the same host are rate limited
/// and robots-checked independently, matching how the authority is used on the wire.
///
/// # Examples
///
/// ```
/// use url::Url;
/// use bookstore_finder::url::extract_domain;
///
/// let url = Url::parse("https://EXAMPLE.COM/path").unwrap();
/// assert_eq!(extract_domain(&url), Some("example.com".to_string()));
///
/// let url = Url::parse("http://127.0.0.1:8080/").unwrap();
/// assert_eq!(extract_domain(&url), Some("127.0.0.1:8080".to_string()));
/// ```
pub fn extract_domain(url: &Url) -> Option<String> {
    let host = url.host_str()?.to_lowercase();
    match url.port() {
        Some(port) => Some(format!("{}:{}", host, port)),
        None => Some(host),
    }
}

/// Returns true if both URLs share a domain key
pub fn same_domain(a: &Url, b: &Url) -> bool {
    match (extract_domain(a), extract_domain(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Returns true if `candidate` is on `site`'s host or one of its subdomains
///
/// A leading `www.` on the site is ignored, so `www.shop.nl` and `shop.nl` match
/// each other.
pub fn within_site(candidate: &Url, site: &Url) -> bool {
    let (Some(candidate), Some(site)) = (candidate.host_str(), site.host_str()) else {
        return false;
    };
    let candidate = candidate.to_lowercase();
    let site = site.to_lowercase();
    let site = site.strip_prefix("www.").unwrap_or(&site);

    candidate == site || candidate.ends_with(&format!(".{}", site))
}
