//! Address extraction
//!
//! Locates a postal code and city on a bookstore's site by searching progressively
//! broader parts of a page:
//!
//! 1. Structured address elements (configured CSS selectors)
//! 2. Footer-like elements
//! 3. The full visible page text
//! 4. Contact pages, each searched with steps 1 to 3
//!
//! The first postal code found wins.

mod postal;

pub use postal::{PostalCodeParser, PostalMatch};

use crate::config::ExtractionConfig;
use crate::crawler::{document_text, extract_links, parse_document, visible_text, PolitenessController};
use crate::url::within_site;
use crate::ConfigError;
use scraper::{Html, Selector};
use tracing::{debug, info, warn};
use url::Url;

/// Finds a bookstore's postal code and city in its HTML
pub struct AddressExtractor {
    parser: PostalCodeParser,
    selectors: Vec<(String, Selector)>,
    contact_paths: Vec<String>,
    contact_keywords: Vec<String>,
    max_contact_pages: usize,
}

impl AddressExtractor {
    /// Compiles the extractor configured in `[extraction]`
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ConfigError> {
        let selectors = config
            .address_selectors
            .iter()
            .map(|s| {
                Selector::parse(s)
                    .map(|selector| (s.clone(), selector))
                    .map_err(|e| ConfigError::InvalidPattern(format!("selector '{}': {:?}", s, e)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self {
            parser: PostalCodeParser::from_config(config)?,
            selectors,
            contact_paths: config.contact_paths.clone(),
            contact_keywords: config.contact_keywords.clone(),
            max_contact_pages: config.max_contact_pages,
        })
    }

    /// The postal code parser, also used to normalize pre-known codes
    pub fn parser(&self) -> &PostalCodeParser {
        &self.parser
    }

    /// Finds a bookstore's location, starting from `html` (its homepage) when given
    ///
    /// Without `html` the base URL is fetched first. Every request goes through the
    /// politeness controller. Returns None when no postal code is found anywhere.
    pub async fn extract_location(
        &self,
        politeness: &PolitenessController,
        base_url: &Url,
        html: Option<&str>,
    ) -> Option<PostalMatch> {
        let fetched;
        let html = match html {
            Some(html) => Some(html),
            None => {
                fetched = politeness.guarded_fetch(base_url).await.into_body();
                fetched.as_deref()
            }
        };

        if let Some(html) = html {
            if let Some(found) = self.extract_from_html(html) {
                return Some(found);
            }
        }

        for contact_url in self.contact_page_urls(base_url, html) {
            debug!("Trying contact page: {}", contact_url);
            let Some(body) = politeness.guarded_fetch(&contact_url).await.into_body() else {
                continue;
            };
            if let Some(found) = self.extract_from_html(&body) {
                info!("Found location on contact page: {}", contact_url);
                return Some(found);
            }
        }

        warn!("Could not extract postal code for {}", base_url);
        None
    }

    /// Runs the in-page search order over one HTML document
    pub fn extract_from_html(&self, html: &str) -> Option<PostalMatch> {
        let document = parse_document(html);

        self.from_address_elements(&document)
            .or_else(|| self.from_footer(&document))
            .or_else(|| self.from_full_text(&document))
    }

    fn from_address_elements(&self, document: &Html) -> Option<PostalMatch> {
        for (raw, selector) in &self.selectors {
            for element in document.select(selector) {
                if let Some(found) = self.parser.find(&visible_text(element, " ")) {
                    debug!("Found postal code in {}", raw);
                    return Some(found);
                }
            }
        }
        None
    }

    fn from_footer(&self, document: &Html) -> Option<PostalMatch> {
        let all = Selector::parse("*").ok()?;
        let found = document
            .select(&all)
            .filter(|element| {
                let value = element.value();
                value.name().eq_ignore_ascii_case("footer")
                    || value
                        .attr("class")
                        .map_or(false, |class| class.to_lowercase().contains("footer"))
            })
            .find_map(|element| self.parser.find(&visible_text(element, " ")));

        if found.is_some() {
            debug!("Found postal code in footer");
        }
        found
    }

    fn from_full_text(&self, document: &Html) -> Option<PostalMatch> {
        let found = self.parser.find(&document_text(document));
        if found.is_some() {
            debug!("Found postal code in full text search");
        }
        found
    }

    /// Candidate contact pages, at most `max_contact_pages`
    ///
    /// Same-site links on `html` whose href or anchor text contains a contact keyword
    /// come first, then the configured paths. Duplicates and the base URL itself
    /// are dropped.
    pub fn contact_page_urls(&self, base_url: &Url, html: Option<&str>) -> Vec<Url> {
        let mut candidates: Vec<Url> = Vec::new();

        if let Some(html) = html {
            let document = parse_document(html);
            candidates.extend(
                extract_links(&document, base_url)
                    .into_iter()
                    .filter(|link| within_site(&link.url, base_url))
                    .filter(|link| link.mentions_any(&self.contact_keywords))
                    .map(|link| link.url),
            );
        }

        candidates.extend(
            self.contact_paths
                .iter()
                .filter_map(|path| base_url.join(path).ok()),
        );

        let mut urls: Vec<Url> = Vec::new();
        for mut url in candidates {
            url.set_fragment(None);
            if url == *base_url || urls.contains(&url) {
                continue;
            }
            urls.push(url);
            if urls.len() == self.max_contact_pages {
                break;
            }
        }
        urls
    }
}
