//! Content and URL checks for product-page candidates

use crate::config::BookConfig;
use url::Url;

/// Returns true if a page body is about the book: title (or a variant) and author,
/// or the ISBN
///
/// All checks are case-insensitive substring matches on the raw body.
pub fn page_mentions_book(book: &BookConfig, body: &str) -> bool {
    (book.mentions_title(body) && book.mentions_author(body)) || book.mentions_isbn(body)
}

/// Weaker check used for known-template candidates: title (or a variant) or ISBN
pub fn page_mentions_title_or_isbn(book: &BookConfig, body: &str) -> bool {
    book.mentions_title(body) || book.mentions_isbn(body)
}

/// URL slug of a title: `Zanger Ronald` becomes `zanger-ronald`
pub fn slugify(title: &str) -> String {
    title
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("-")
}

/// Returns true if a URL looks like a product page
///
/// Matches any configured path indicator (`/boek/`, `isbn`, ...) or the slug of
/// the title or one of its variants.
pub fn looks_like_product_url(url: &Url, indicators: &[String], book: &BookConfig) -> bool {
    let lower = url.as_str().to_lowercase();

    indicators
        .iter()
        .any(|indicator| lower.contains(&indicator.to_lowercase()))
        || book
            .title_needles()
            .iter()
            .map(|title| slugify(title))
            .any(|slug| !slug.is_empty() && lower.contains(&slug))
}
