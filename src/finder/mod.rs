//! Product-page discovery
//!
//! Tries a fixed, ordered list of strategies against a bookstore site and stops at
//! the first verified product page:
//!
//! 1. `KnownTemplate`: try URL paths used by a common Dutch webshop platform
//! 2. `SearchEngine`: site-restricted web search (off unless configured)
//! 3. `DirectCrawl`: on-site search form, homepage links, then catalog pages
//!
//! Every candidate URL goes through one verification step (fetch and check the body
//! for the book) before it is accepted. Each URL is verified at most once per
//! bookstore.

mod strategies;
mod verify;

pub use verify::{looks_like_product_url, page_mentions_book, slugify};

use crate::config::{BookConfig, Config, SearchConfig};
use crate::crawler::{FetchResult, Link, PolitenessController};
use crate::state::ErrorKind;
use std::collections::HashSet;
use std::fmt;
use tracing::{debug, info, warn};
use url::Url;

/// A product-page discovery strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    KnownTemplate,
    SearchEngine,
    DirectCrawl,
}

/// Order in which strategies are tried
pub const STRATEGY_ORDER: [Strategy; 3] = [
    Strategy::KnownTemplate,
    Strategy::SearchEngine,
    Strategy::DirectCrawl,
];

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::KnownTemplate => "known URL pattern",
            Self::SearchEngine => "search engine",
            Self::DirectCrawl => "direct crawl",
        })
    }
}

/// What discovery learned about a bookstore
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// The verified product page, if any strategy found one
    pub product_url: Option<Url>,

    /// The strategy that found it
    pub strategy: Option<Strategy>,

    /// Homepage HTML, when the direct crawl fetched it; reused for address extraction
    pub homepage_html: Option<String>,

    /// Why the homepage could not be fetched, when the direct crawl tried and failed
    pub homepage_failure: Option<ErrorKind>,
}

/// Per-bookstore discovery state
struct Search<'a> {
    politeness: &'a PolitenessController,
    site: &'a Url,
    tried: HashSet<String>,
    homepage_html: Option<String>,
    homepage_failure: Option<ErrorKind>,
}

impl<'a> Search<'a> {
    fn new(politeness: &'a PolitenessController, site: &'a Url) -> Self {
        Self {
            politeness,
            site,
            tried: HashSet::new(),
            homepage_html: None,
            homepage_failure: None,
        }
    }

    /// Marks a candidate as tried; false if it was tried before (fragment ignored)
    fn first_try(&mut self, url: &Url) -> bool {
        let mut key = url.clone();
        key.set_fragment(None);
        self.tried.insert(key.to_string())
    }

    /// Fetches a page and returns its body when it could be read
    async fn fetch_body(&self, url: &Url) -> Option<String> {
        match self.politeness.guarded_fetch(url).await {
            FetchResult::Success { body, .. } => Some(body),
            other => {
                debug!("Skipping {}: {}", url, other.label());
                None
            }
        }
    }
}

/// Finds the configured book's product page on bookstore sites
pub struct ProductPageFinder {
    book: BookConfig,
    search: SearchConfig,
}

impl ProductPageFinder {
    /// Creates a finder for one book
    pub fn new(book: BookConfig, search: SearchConfig) -> Self {
        Self { book, search }
    }

    /// Creates a finder from the `[book]` and `[search]` sections
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.book.clone(), config.search.clone())
    }

    /// Runs the strategies in order until one yields a verified product page
    ///
    /// Not finding a page is a normal outcome, reported as a `Discovery` without a
    /// product URL.
    pub async fn find_product_page(
        &self,
        politeness: &PolitenessController,
        name: &str,
        site: &Url,
    ) -> Discovery {
        info!("Searching for product page on {} ({})", name, site);
        let mut search = Search::new(politeness, site);

        for strategy in STRATEGY_ORDER {
            let found = match strategy {
                Strategy::KnownTemplate => self.known_template(&mut search).await,
                Strategy::SearchEngine if self.search.use_search_engine => {
                    self.search_engine(&mut search).await
                }
                Strategy::SearchEngine => None,
                Strategy::DirectCrawl => self.direct_crawl(&mut search).await,
            };

            if let Some(url) = found {
                info!("Found via {}: {}", strategy, url);
                return Discovery {
                    product_url: Some(url),
                    strategy: Some(strategy),
                    homepage_html: search.homepage_html,
                    homepage_failure: search.homepage_failure,
                };
            }
            debug!("{} found nothing for {}", strategy, site);
        }

        warn!("Product page not found for {}", name);
        Discovery {
            product_url: None,
            strategy: None,
            homepage_html: search.homepage_html,
            homepage_failure: search.homepage_failure,
        }
    }

    /// Fetches a candidate and checks that it is about the book
    ///
    /// Candidates already tried for this bookstore, and pages robots.txt disallows,
    /// fail without a request.
    async fn verify(&self, search: &mut Search<'_>, url: &Url) -> bool {
        if !search.first_try(url) {
            return false;
        }

        let Some(body) = search.fetch_body(url).await else {
            return false;
        };

        let verified = page_mentions_book(&self.book, &body);
        if verified {
            debug!("Verified product page: {}", url);
        } else {
            debug!("Page does not contain expected book info: {}", url);
        }
        verified
    }

    /// Verifies, in order, the links whose anchor text names the book
    async fn first_verified_link(
        &self,
        search: &mut Search<'_>,
        links: Vec<Link>,
    ) -> Option<Url> {
        for link in links {
            if !self.book.mentions_title(&link.text) {
                continue;
            }
            if !looks_like_product_url(&link.url, &self.search.product_indicators, &self.book) {
                continue;
            }
            if self.verify(search, &link.url).await {
                return Some(link.url);
            }
        }
        None
    }
}
