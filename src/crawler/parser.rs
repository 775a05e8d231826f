//! HTML helpers shared by the finder and the extractor
//!
//! This module handles parsing HTML content to extract:
//! - Links with their anchor text (absolute URLs)
//! - Visible text of an element or a whole document
//! - On-site search forms

use scraper::{ElementRef, Html, Node, Selector};
use url::Url;

/// Elements whose text is never shown to a reader
const INVISIBLE_TAGS: [&str; 4] = ["script", "style", "noscript", "template"];

/// A hyperlink found on a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Link {
    /// Absolute URL
    pub url: Url,

    /// Anchor text, whitespace-collapsed
    pub text: String,
}

impl Link {
    /// Returns true if the href or the anchor text contains any keyword (case-insensitive)
    pub fn mentions_any(&self, keywords: &[String]) -> bool {
        let href = self.url.as_str().to_lowercase();
        let text = self.text.to_lowercase();
        keywords.iter().any(|k| {
            let k = k.to_lowercase();
            href.contains(&k) || text.contains(&k)
        })
    }
}

/// An on-site search form submitted with GET
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchForm {
    /// Absolute form action
    pub action: Url,

    /// Name of the query input
    pub field: String,
}

impl SearchForm {
    /// Builds the result-page URL for a query
    pub fn query_url(&self, query: &str) -> Url {
        let mut url = self.action.clone();
        url.query_pairs_mut().append_pair(&self.field, query);
        url
    }
}

/// Parses an HTML document
pub fn parse_document(html: &str) -> Html {
    Html::parse_document(html)
}

/// Extracts every followable `<a href>` on the page
///
/// # Link Extraction Rules
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links
/// - Data URIs
/// - Fragment-only links
///
/// # Example
///
/// ```
/// use bookstore_finder::crawler::{extract_links, parse_document};
/// use url::Url;
///
/// let html = r#"<html><body><a href="/boeken">Onze boeken</a></body></html>"#;
/// let base = Url::parse("https://shop.example/").unwrap();
/// let links = extract_links(&parse_document(html), &base);
/// assert_eq!(links[0].url.as_str(), "https://shop.example/boeken");
/// assert_eq!(links[0].text, "Onze boeken");
/// ```
pub fn extract_links(document: &Html, base_url: &Url) -> Vec<Link> {
    let Ok(selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    document
        .select(&selector)
        .filter(|element| element.value().attr("download").is_none())
        .filter_map(|element| {
            let href = element.value().attr("href")?;
            let url = resolve_link(href, base_url)?;
            Some(Link {
                url,
                text: collapse_whitespace(&element.text().collect::<String>()),
            })
        })
        .collect()
}

/// Resolves a link href to an absolute HTTP(S) URL
///
/// Returns None if the link should be excluded:
/// - javascript:, mailto:, tel: schemes
/// - data: URIs
/// - Fragment-only or empty hrefs
/// - Invalid URLs
/// - Non-HTTP(S) URLs after resolution
pub fn resolve_link(href: &str, base_url: &Url) -> Option<Url> {
    let href = href.trim();
    if href.is_empty() || href.starts_with('#') {
        return None;
    }

    let lower = href.to_lowercase();
    if ["javascript:", "mailto:", "tel:", "data:"]
        .iter()
        .any(|scheme| lower.starts_with(scheme))
    {
        return None;
    }

    let absolute = base_url.join(href).ok()?;
    match absolute.scheme() {
        "http" | "https" => Some(absolute),
        _ => None,
    }
}

/// Visible text of an element, text nodes joined by `separator`
///
/// Text inside script, style, noscript and template elements is skipped.
pub fn visible_text(element: ElementRef<'_>, separator: &str) -> String {
    let mut parts: Vec<&str> = Vec::new();

    for node in element.descendants() {
        let Node::Text(text) = node.value() else {
            continue;
        };
        let hidden = node.ancestors().any(|ancestor| {
            ancestor
                .value()
                .as_element()
                .map_or(false, |e| INVISIBLE_TAGS.contains(&e.name()))
        });
        if hidden {
            continue;
        }

        let trimmed = text.trim();
        if !trimmed.is_empty() {
            parts.push(trimmed);
        }
    }

    parts.join(separator)
}

/// Visible text of the whole document, one text block per line
pub fn document_text(document: &Html) -> String {
    visible_text(document.root_element(), "\n")
}

/// Finds the first form with a text input whose name looks like a search field
///
/// An input qualifies when its name contains one of `field_hints`
/// (case-insensitive) or is exactly `q`. A form without an action submits to
/// `/search` on the same site.
pub fn find_search_form(document: &Html, base_url: &Url, field_hints: &[&str]) -> Option<SearchForm> {
    let form_selector = Selector::parse("form").ok()?;
    let input_selector = Selector::parse("input[name]").ok()?;

    for form in document.select(&form_selector) {
        let field = form.select(&input_selector).find_map(|input| {
            let name = input.value().attr("name")?;
            let lower = name.to_lowercase();
            let input_type = input.value().attr("type").unwrap_or("text").to_lowercase();
            if matches!(input_type.as_str(), "hidden" | "submit" | "button" | "checkbox" | "radio") {
                return None;
            }
            let looks_like_search =
                lower == "q" || field_hints.iter().any(|hint| lower.contains(hint));
            looks_like_search.then(|| name.to_string())
        });

        let Some(field) = field else {
            continue;
        };

        let action = form.value().attr("action").map(str::trim).unwrap_or("");
        let action = if action.is_empty() { "/search" } else { action };
        let Some(mut action) = resolve_link(action, base_url) else {
            continue;
        };
        action.set_fragment(None);

        return Some(SearchForm { action, field });
    }

    None
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}
