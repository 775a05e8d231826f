//! URL handling module for Bookstore Finder
//!
//! This module provides domain extraction, site-root derivation, and the
//! normalization applied to bookstore homepage URLs read from input.

mod domain;

use crate::{UrlError, UrlResult};
use url::Url;

// Re-export main functions
pub use domain::{extract_domain, same_domain, within_site};

/// Parses a bookstore homepage URL, assuming `https://` when no scheme is given
///
/// # Examples
///
/// ```
/// use bookstore_finder::url::parse_site_url;
///
/// let url = parse_site_url("www.boekhandel.nl").unwrap();
/// assert_eq!(url.as_str(), "https://www.boekhandel.nl/");
/// ```
pub fn parse_site_url(raw: &str) -> UrlResult<Url> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(UrlError::Parse("empty URL".to_string()));
    }

    let with_scheme = if raw.starts_with("http://") || raw.starts_with("https://") {
        raw.to_string()
    } else if raw.contains("://") {
        return Err(UrlError::InvalidScheme(raw.to_string()));
    } else {
        format!("https://{}", raw)
    };

    let url = Url::parse(&with_scheme).map_err(|e| UrlError::Parse(format!("{}: {}", raw, e)))?;
    if url.host_str().is_none() {
        return Err(UrlError::MissingDomain);
    }

    Ok(url)
}

/// Returns the scheme and authority of a URL with an empty path (`https://host[:port]`)
///
/// # Examples
///
/// ```
/// use url::Url;
/// use bookstore_finder::url::site_root;
///
/// let url = Url::parse("https://www.example.nl/winkel/amsterdam?x=1").unwrap();
/// assert_eq!(site_root(&url), "https://www.example.nl");
/// ```
pub fn site_root(url: &Url) -> String {
    let mut root = format!("{}://{}", url.scheme(), url.host_str().unwrap_or_default());
    if let Some(port) = url.port() {
        root.push_str(&format!(":{}", port));
    }
    root
}

/// Builds the URL of the robots.txt file that governs `url`
pub fn robots_url(url: &Url) -> UrlResult<Url> {
    let root = site_root(url);
    Url::parse(&format!("{}/robots.txt", root)).map_err(|e| UrlError::Parse(e.to_string()))
}
