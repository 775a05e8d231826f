//! Per-bookstore input and result types
//!
//! A `BookstoreTarget` is read once from input and never changed. The coordinator
//! turns it into exactly one `CrawlResult` per run.

use std::fmt;

/// A bookstore to process, optionally with an address that is already known
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookstoreTarget {
    pub name: String,
    pub homepage_url: String,
    pub known_postal_code: Option<String>,
    pub known_city: Option<String>,
}

impl BookstoreTarget {
    /// Creates a target without a known address
    pub fn new(name: impl Into<String>, homepage_url: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            homepage_url: homepage_url.into(),
            known_postal_code: None,
            known_city: None,
        }
    }

    /// Returns true if both postal code and city were supplied up front
    pub fn has_known_address(&self) -> bool {
        self.known_postal_code.is_some() && self.known_city.is_some()
    }
}

/// Why a bookstore did not produce a usable result
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// robots.txt disallows the homepage
    Robots,

    /// The site answered HTTP 403
    Forbidden,

    /// The site answered HTTP 404
    NotFound,

    /// Timeouts, connection errors or 5xx after all retries
    Network,

    /// Any other unexpected status or protocol error
    Http,

    /// Every discovery strategy ran without a verified product page
    NoProductPage,

    /// No postal code anywhere on the homepage or contact pages
    NoPostalCode,

    /// An error inside the pipeline itself
    Internal,
}

impl ErrorKind {
    /// Converts the error kind to its database string representation
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Robots => "robots",
            Self::Forbidden => "forbidden",
            Self::NotFound => "not_found",
            Self::Network => "network",
            Self::Http => "http",
            Self::NoProductPage => "no_product_page",
            Self::NoPostalCode => "no_postal_code",
            Self::Internal => "internal",
        }
    }

    /// Parses an error kind from its database string representation
    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "robots" => Some(Self::Robots),
            "forbidden" => Some(Self::Forbidden),
            "not_found" => Some(Self::NotFound),
            "network" => Some(Self::Network),
            "http" => Some(Self::Http),
            "no_product_page" => Some(Self::NoProductPage),
            "no_postal_code" => Some(Self::NoPostalCode),
            "internal" => Some(Self::Internal),
            _ => None,
        }
    }

    /// Human readable description used in logs and the error_message column
    pub fn description(&self) -> &'static str {
        match self {
            Self::Robots => "Disallowed by robots.txt",
            Self::Forbidden => "Homepage returned 403 Forbidden",
            Self::NotFound => "Homepage returned 404 Not Found",
            Self::Network => "Homepage unreachable",
            Self::Http => "Homepage returned an unexpected response",
            Self::NoProductPage => "Product page not found",
            Self::NoPostalCode => "Postal code not found",
            Self::Internal => "Internal error",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.to_db_string())
    }
}

/// Outcome of processing one bookstore
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CrawlResult {
    pub name: String,
    pub homepage_url: String,
    pub product_url: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub success: bool,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
}

impl CrawlResult {
    /// Starts an empty (failed) result for a target
    pub fn for_target(target: &BookstoreTarget) -> Self {
        Self {
            name: target.name.clone(),
            homepage_url: target.homepage_url.clone(),
            product_url: None,
            postal_code: None,
            city: None,
            success: false,
            error_kind: None,
            error_message: None,
        }
    }

    /// Records a failure; the first recorded kind wins
    pub fn fail(&mut self, kind: ErrorKind, message: impl Into<String>) {
        if self.error_kind.is_none() {
            self.error_kind = Some(kind);
            self.error_message = Some(message.into());
        }
        self.success = false;
    }

    /// Recomputes `success`: a product page plus a postal code (or a fully known address)
    pub fn finalize(&mut self, target: &BookstoreTarget) {
        self.success = self.product_url.is_some()
            && (self.postal_code.is_some() || target.has_known_address());
        if self.success {
            self.error_kind = None;
            self.error_message = None;
        }
    }
}

/// Run-level totals reported after all bookstores are processed
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunStats {
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
}

impl RunStats {
    /// Adds one result to the totals
    pub fn record(&mut self, result: &CrawlResult) {
        self.total += 1;
        if result.success {
            self.successful += 1;
        } else {
            self.failed += 1;
        }
    }

    /// Returns the success rate as a percentage
    pub fn success_rate(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.successful as f64 / self.total as f64) * 100.0
    }
}
