use serde::Deserialize;

/// Main configuration structure for Bookstore Finder
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub book: BookConfig,
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent", default)]
    pub user_agent: UserAgentConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub extraction: ExtractionConfig,
    #[serde(default)]
    pub output: OutputConfig,
}

/// The single book searched for across every bookstore in a run
#[derive(Debug, Clone, Deserialize)]
pub struct BookConfig {
    pub title: String,

    pub author: String,

    pub isbn: String,

    /// Shorter spellings of the title that shops commonly use (matched case-insensitively)
    #[serde(rename = "title-variants", default)]
    pub title_variants: Vec<String>,
}

impl BookConfig {
    /// Lowercased title plus every lowercased title variant
    pub fn title_needles(&self) -> Vec<String> {
        std::iter::once(&self.title)
            .chain(self.title_variants.iter())
            .map(|t| t.trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect()
    }

    /// Returns true if the text mentions the title or one of its variants
    pub fn mentions_title(&self, text: &str) -> bool {
        let lower = text.to_lowercase();
        self.title_needles().iter().any(|t| lower.contains(t))
    }

    /// Returns true if the text mentions the author
    pub fn mentions_author(&self, text: &str) -> bool {
        text.to_lowercase()
            .contains(&self.author.trim().to_lowercase())
    }

    /// Returns true if the text contains the ISBN
    pub fn mentions_isbn(&self, text: &str) -> bool {
        !self.isbn.is_empty() && text.contains(&self.isbn)
    }
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CrawlerConfig {
    /// Minimum time between requests to the same domain (milliseconds)
    #[serde(rename = "delay-between-requests")]
    pub delay_between_requests: u64,

    /// Request timeout (seconds), also used for robots.txt
    #[serde(rename = "request-timeout")]
    pub request_timeout: u64,

    /// Additional attempts after a retryable failure
    #[serde(rename = "max-retries")]
    pub max_retries: u32,

    /// Backoff base (milliseconds); retry `n` waits `base * 2^n`
    #[serde(rename = "backoff-base")]
    pub backoff_base: u64,

    #[serde(rename = "respect-robots-txt")]
    pub respect_robots_txt: bool,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            delay_between_requests: 15_000,
            request_timeout: 10,
            max_retries: 2,
            backoff_base: 1_000,
            respect_robots_txt: true,
        }
    }
}

/// Bot identification, used for robots.txt matching
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    #[serde(rename = "contact-url")]
    pub contact_url: String,
}

impl UserAgentConfig {
    /// Formats the full bot identity: `Name/Version (+ContactURL)`
    pub fn identity(&self) -> String {
        format!(
            "{}/{} (+{})",
            self.crawler_name, self.crawler_version, self.contact_url
        )
    }
}

impl Default for UserAgentConfig {
    fn default() -> Self {
        Self {
            crawler_name: "BookstoreFinder".to_string(),
            crawler_version: "1.0".to_string(),
            contact_url: "https://github.com/waltervandenberg/bookcrawler".to_string(),
        }
    }
}

/// Product-page discovery configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Search-engine site search; off by default because of consent walls
    ///
    /// Result pages are fetched under robots.txt like any other page, and most
    /// engines disallow their search path, so this only finds anything with
    /// `respect-robots-txt = false` or an engine that allows it.
    #[serde(rename = "use-search-engine")]
    pub use_search_engine: bool,

    #[serde(rename = "search-engine-url")]
    pub search_engine_url: String,

    /// Result links inspected per search-engine query
    #[serde(rename = "max-results")]
    pub max_results: usize,

    /// Path suffixes used by the common Dutch bookstore webshop platform
    #[serde(rename = "known-paths")]
    pub known_paths: Vec<String>,

    /// Substrings that mark a URL as a likely product page
    #[serde(rename = "product-indicators")]
    pub product_indicators: Vec<String>,

    #[serde(rename = "catalog-keywords")]
    pub catalog_keywords: Vec<String>,

    #[serde(rename = "max-catalog-pages")]
    pub max_catalog_pages: usize,

    /// Search path tried when the homepage has no recognisable search form
    #[serde(rename = "fallback-search-path")]
    pub fallback_search_path: String,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            use_search_engine: false,
            search_engine_url: "https://www.google.com/search".to_string(),
            max_results: 5,
            known_paths: vec![
                "/a/walter-van-den-berg/zanger-ronald-zingt-de-blues/501634390#paperback-9789048853366"
                    .to_string(),
                "/a/walter-van-den-berg/zanger-ronald-zingt-de-blues/501634390".to_string(),
                "/boek/?authortitle=walter-van-den-berg/zanger-ronald-zingt-de-blues--9789048853366"
                    .to_string(),
            ],
            product_indicators: [
                "/product/",
                "/boek/",
                "/boeken/",
                "/artikel/",
                "/item/",
                "/p/",
                "isbn",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            catalog_keywords: [
                "boeken",
                "books",
                "catalog",
                "catalogus",
                "assortiment",
                "literatuur",
            ]
            .iter()
            .map(|s| s.to_string())
            .collect(),
            max_catalog_pages: 3,
            fallback_search_path: "/zoeken".to_string(),
        }
    }
}

/// Address extraction configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ExtractionConfig {
    /// Postal-code regex; capture group 1 is the digits, group 2 the letters
    #[serde(rename = "postal-code-pattern")]
    pub postal_code_pattern: String,

    /// CSS selectors for address/contact/footer containers, tried in order
    #[serde(rename = "address-selectors")]
    pub address_selectors: Vec<String>,

    #[serde(rename = "contact-paths")]
    pub contact_paths: Vec<String>,

    #[serde(rename = "contact-keywords")]
    pub contact_keywords: Vec<String>,

    /// Words that look capitalized but are never a city
    #[serde(rename = "city-exclude")]
    pub city_exclude: Vec<String>,

    #[serde(rename = "max-contact-pages")]
    pub max_contact_pages: usize,
}

impl Default for ExtractionConfig {
    fn default() -> Self {
        fn strings(items: &[&str]) -> Vec<String> {
            items.iter().map(|s| s.to_string()).collect()
        }

        Self {
            postal_code_pattern: r"\b([1-9]\d{3})\s*([A-EGHJ-NPR-TV-XZ]{2})\b".to_string(),
            address_selectors: strings(&[
                "footer",
                ".footer",
                "#footer",
                ".contact",
                ".address",
                ".adres",
                "[itemtype*='PostalAddress']",
                "address",
            ]),
            contact_paths: strings(&[
                "/contact",
                "/contacteer-ons",
                "/neem-contact-op",
                "/over-ons",
                "/vestigingen",
                "/winkels",
            ]),
            contact_keywords: strings(&[
                "contact",
                "over-ons",
                "about",
                "vestiging",
                "winkel",
                "locatie",
            ]),
            city_exclude: strings(&[
                "Nederland",
                "Netherlands",
                "Tel",
                "Telefoon",
                "Email",
                "Mail",
                "Website",
                "Openingstijden",
                "Bezoekadres",
                "Postadres",
                "Straat",
                "Postbus",
                "KVK",
                "BTW",
                "IBAN",
                "Boekhandel",
                "Boekwinkel",
                "Bookstore",
                "Antiquariaat",
            ]),
            max_contact_pages: 5,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Path to the SQLite database file
    #[serde(rename = "database-path")]
    pub database_path: String,

    /// Path to the exported JSON dataset
    #[serde(rename = "json-path")]
    pub json_path: String,

    /// Path to the manually curated entries CSV
    #[serde(rename = "manual-entries-path")]
    pub manual_entries_path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            database_path: "data/bookstores.db".to_string(),
            json_path: "data/bookstores.json".to_string(),
            manual_entries_path: "data/manual_entries.csv".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn book() -> BookConfig {
        BookConfig {
            title: "Zanger Ronald zingt de blues".to_string(),
            author: "Walter van den Berg".to_string(),
            isbn: "9789048853366".to_string(),
            title_variants: vec!["zanger ronald".to_string()],
        }
    }

    #[test]
    fn test_title_needles_lowercased() {
        assert_eq!(
            book().title_needles(),
            vec!["zanger ronald zingt de blues", "zanger ronald"]
        );
    }

    #[test]
    fn test_mentions_title_variant() {
        assert!(book().mentions_title("Nieuw: ZANGER RONALD!"));
        assert!(!book().mentions_title("Ronald zingt"));
    }

    #[test]
    fn test_mentions_isbn_requires_value() {
        let mut b = book();
        assert!(b.mentions_isbn("ean 9789048853366"));
        b.isbn.clear();
        assert!(!b.mentions_isbn("anything"));
    }

    #[test]
    fn test_identity_format() {
        let ua = UserAgentConfig::default();
        assert!(ua.identity().starts_with("BookstoreFinder/1.0 (+https://"));
    }
}
