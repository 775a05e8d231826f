//! The three discovery strategies
//!
//! HTML is parsed in small synchronous helpers so no parsed document is held across
//! a request.

use super::verify::{looks_like_product_url, page_mentions_title_or_isbn};
use super::{ProductPageFinder, Search};
use crate::crawler::{extract_links, find_search_form, parse_document, resolve_link, FetchResult, Link, SearchForm};
use crate::url::{site_root, within_site};
use scraper::Selector;
use tracing::debug;
use url::Url;

/// Substrings of input names that mark a search field
const SEARCH_FIELD_HINTS: [&str; 3] = ["search", "query", "zoek"];

impl ProductPageFinder {
    /// Tries the configured platform URL paths on the site root
    pub(super) async fn known_template(&self, search: &mut Search<'_>) -> Option<Url> {
        let root = site_root(search.site);

        for path in &self.search.known_paths {
            let Ok(candidate) = Url::parse(&format!("{}{}", root, path)) else {
                continue;
            };
            if !search.first_try(&candidate) {
                continue;
            }

            debug!("Testing known URL pattern: {}", candidate);
            let Some(body) = search.fetch_body(&candidate).await else {
                continue;
            };
            if page_mentions_title_or_isbn(&self.book, &body) {
                return Some(candidate);
            }
        }

        None
    }

    /// Site-restricted web search with title, author and ISBN query variants
    pub(super) async fn search_engine(&self, search: &mut Search<'_>) -> Option<Url> {
        let domain = search.site.host_str()?.to_string();
        let queries = [
            format!("site:{} \"{}\" \"{}\"", domain, self.book.title, self.book.author),
            format!("site:{} \"{}\"", domain, self.book.title),
            format!("site:{} {}", domain, self.book.isbn),
        ];

        for query in queries {
            debug!("Search engine query: {}", query);
            let Ok(results_url) =
                Url::parse_with_params(&self.search.search_engine_url, &[("q", query.as_str())])
            else {
                continue;
            };

            let Some(body) = search.fetch_body(&results_url).await else {
                debug!("Search engine request failed");
                continue;
            };

            for candidate in search_result_links(&body, &results_url, self.search.max_results) {
                if !within_site(&candidate, search.site)
                    || !looks_like_product_url(&candidate, &self.search.product_indicators, &self.book)
                {
                    continue;
                }
                if self.verify(search, &candidate).await {
                    return Some(candidate);
                }
            }
        }

        None
    }

    /// Crawls the site itself: search form, homepage links, then catalog pages
    ///
    /// Records the homepage HTML (or why it could not be fetched) on `search`.
    pub(super) async fn direct_crawl(&self, search: &mut Search<'_>) -> Option<Url> {
        let politeness = search.politeness;
        let site = search.site;

        let (body, base) = match politeness.guarded_fetch(site).await {
            FetchResult::Success { body, final_url, .. } => {
                let base = Url::parse(&final_url).unwrap_or_else(|_| site.clone());
                (body, base)
            }
            other => {
                debug!("Could not fetch homepage {}: {}", site, other.label());
                search.homepage_failure = other.failure_kind();
                return None;
            }
        };

        let (form, links) = scan_homepage(&body, &base);
        search.homepage_html = Some(body);

        // (a) on-site search
        let search_url = match form {
            Some(form) => {
                debug!("Found search form: {} ({})", form.action, form.field);
                Some(form.query_url(&self.book.title))
            }
            None => self.fallback_search_url(site),
        };
        if let Some(search_url) = search_url {
            if let Some(page) = search.fetch_body(&search_url).await {
                let results = page_links(&page, &search_url);
                if let Some(found) = self.first_verified_link(search, results).await {
                    return Some(found);
                }
            }
        }

        // (b) links on the homepage itself
        if let Some(found) = self.first_verified_link(search, links.clone()).await {
            return Some(found);
        }

        // (c) one level into catalog sections
        for catalog in self.catalog_urls(&links, site) {
            debug!("Checking catalog: {}", catalog);
            let Some(page) = search.fetch_body(&catalog).await else {
                continue;
            };
            let candidates = page_links(&page, &catalog);
            if let Some(found) = self.first_verified_link(search, candidates).await {
                return Some(found);
            }
        }

        None
    }

    /// `<fallback path>?q=<title>` on the site root
    fn fallback_search_url(&self, site: &Url) -> Option<Url> {
        let mut url = site.join(&self.search.fallback_search_path).ok()?;
        url.query_pairs_mut().append_pair("q", &self.book.title);
        Some(url)
    }

    /// Same-site links whose href or text contains a catalog keyword
    fn catalog_urls(&self, links: &[Link], site: &Url) -> Vec<Url> {
        let mut urls: Vec<Url> = Vec::new();
        for link in links {
            if !within_site(&link.url, site) || !link.mentions_any(&self.search.catalog_keywords) {
                continue;
            }
            let mut url = link.url.clone();
            url.set_fragment(None);
            if !urls.contains(&url) {
                urls.push(url);
            }
            if urls.len() == self.search.max_catalog_pages {
                break;
            }
        }
        urls
    }
}

fn scan_homepage(html: &str, base: &Url) -> (Option<SearchForm>, Vec<Link>) {
    let document = parse_document(html);
    (
        find_search_form(&document, base, &SEARCH_FIELD_HINTS),
        extract_links(&document, base),
    )
}

fn page_links(html: &str, base: &Url) -> Vec<Link> {
    extract_links(&parse_document(html), base)
}

/// Result links from a web-search results page (`div.g` blocks, first link each)
///
/// Redirect links of the form `/url?q=<target>` are unwrapped.
pub(super) fn search_result_links(html: &str, base: &Url, max_results: usize) -> Vec<Url> {
    let document = parse_document(html);
    let (Ok(result_selector), Ok(link_selector)) = (Selector::parse("div.g"), Selector::parse("a[href]")) else {
        return Vec::new();
    };

    document
        .select(&result_selector)
        .take(max_results)
        .filter_map(|result| {
            let href = result.select(&link_selector).next()?.value().attr("href")?;
            let url = resolve_link(href, base)?;
            if url.path() == "/url" {
                let target = url.query_pairs().find(|(key, _)| key == "q")?.1;
                return Url::parse(&target).ok();
            }
            Some(url)
        })
        .collect()
}
