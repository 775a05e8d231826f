//! HTTP fetcher implementation
//!
//! This module handles every document request the crawler makes:
//! - Building the HTTP client with a fixed browser header profile
//! - GET requests with redirects followed
//! - Outcome classification (success, 404, 403, retryable, terminal)
//! - Retry with exponential backoff for transient failures
//!
//! Bookstore sites often block obvious bots, so requests carry a desktop browser's
//! headers. The bot identity is only used for robots.txt matching.

use super::retry::with_retry;
use crate::config::CrawlerConfig;
use crate::state::ErrorKind;
use reqwest::header::{self, HeaderMap, HeaderValue};
use reqwest::{redirect::Policy, Client, StatusCode};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) \
     AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

const MAX_REDIRECTS: usize = 10;

/// Result of a fetch operation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchResult {
    /// Any 2xx response
    Success {
        /// Final URL after redirects
        final_url: String,
        /// HTTP status code
        status_code: u16,
        /// Content-Type header value
        content_type: String,
        /// Decoded page body
        body: String,
    },

    /// HTTP 404
    NotFound,

    /// HTTP 403
    Forbidden,

    /// Timeout, connection error or HTTP 5xx, after all retries
    RetryableFailure {
        /// Error description
        reason: String,
    },

    /// Any other non-2xx status or non-transient error
    TerminalFailure {
        /// Error description
        reason: String,
    },

    /// robots.txt disallows the URL; no request was sent
    Disallowed,
}

impl FetchResult {
    /// Returns true for outcomes worth another attempt
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::RetryableFailure { .. })
    }

    /// Returns true for a 2xx response
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success { .. })
    }

    /// Returns the body of a successful response
    pub fn body(&self) -> Option<&str> {
        match self {
            Self::Success { body, .. } => Some(body),
            _ => None,
        }
    }

    /// Consumes the result, returning the body of a successful response
    pub fn into_body(self) -> Option<String> {
        match self {
            Self::Success { body, .. } => Some(body),
            _ => None,
        }
    }

    /// The per-bookstore error kind this outcome maps to; None for success
    pub fn failure_kind(&self) -> Option<ErrorKind> {
        match self {
            Self::Success { .. } => None,
            Self::NotFound => Some(ErrorKind::NotFound),
            Self::Forbidden => Some(ErrorKind::Forbidden),
            Self::RetryableFailure { .. } => Some(ErrorKind::Network),
            Self::TerminalFailure { .. } => Some(ErrorKind::Http),
            Self::Disallowed => Some(ErrorKind::Robots),
        }
    }

    /// Short label for logs
    pub fn label(&self) -> String {
        match self {
            Self::Success { status_code, .. } => format!("{}", status_code),
            Self::NotFound => "404 Not Found".to_string(),
            Self::Forbidden => "403 Forbidden".to_string(),
            Self::RetryableFailure { reason } => format!("retryable failure: {}", reason),
            Self::TerminalFailure { reason } => format!("terminal failure: {}", reason),
            Self::Disallowed => "disallowed by robots.txt".to_string(),
        }
    }
}

/// Builds the fixed browser-like header set sent with every request
///
/// `Accept-Encoding` is left to reqwest so it matches the decoders compiled in.
fn browser_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::ACCEPT,
        HeaderValue::from_static(
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
        ),
    );
    headers.insert(
        header::ACCEPT_LANGUAGE,
        HeaderValue::from_static("nl-NL,nl;q=0.9,en-US;q=0.8,en;q=0.7"),
    );
    headers.insert(header::DNT, HeaderValue::from_static("1"));
    headers.insert(
        header::UPGRADE_INSECURE_REQUESTS,
        HeaderValue::from_static("1"),
    );
    headers.insert("sec-fetch-dest", HeaderValue::from_static("document"));
    headers.insert("sec-fetch-mode", HeaderValue::from_static("navigate"));
    headers.insert("sec-fetch-site", HeaderValue::from_static("none"));
    headers.insert("sec-fetch-user", HeaderValue::from_static("?1"));
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("max-age=0"));
    headers
}

/// Builds the HTTP client used for every request in a run
///
/// Certificate validation is disabled: many small shops serve broken or expired
/// certificates, and the crawler only reads public pages.
///
/// # Example
///
/// ```no_run
/// use bookstore_finder::crawler::build_http_client;
/// use std::time::Duration;
///
/// let client = build_http_client(Duration::from_secs(10)).unwrap();
/// ```
pub fn build_http_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(BROWSER_USER_AGENT)
        .default_headers(browser_headers())
        .timeout(timeout)
        .redirect(Policy::limited(MAX_REDIRECTS))
        .danger_accept_invalid_certs(true)
        .gzip(true)
        .brotli(true)
        .build()
}

/// Sends a single GET and classifies the outcome
///
/// # Classification
///
/// | Condition | Outcome |
/// |-----------|---------|
/// | 2xx | Success |
/// | 404 | NotFound |
/// | 403 | Forbidden |
/// | 5xx, timeout, connection error | RetryableFailure |
/// | anything else | TerminalFailure |
pub async fn fetch_once(client: &Client, url: &Url) -> FetchResult {
    let response = match client.get(url.clone()).send().await {
        Ok(response) => response,
        Err(e) => return classify_error(&e),
    };

    let status = response.status();
    let final_url = response.url().to_string();

    match status {
        StatusCode::NOT_FOUND => {
            info!("404 Not Found: {}", url);
            return FetchResult::NotFound;
        }
        StatusCode::FORBIDDEN => {
            warn!("403 Forbidden: {}", url);
            return FetchResult::Forbidden;
        }
        s if s.is_server_error() => {
            warn!("Server error {}: {}", s.as_u16(), url);
            return FetchResult::RetryableFailure {
                reason: format!("HTTP {}", s.as_u16()),
            };
        }
        s if !s.is_success() => {
            warn!("Unexpected status {}: {}", s.as_u16(), url);
            return FetchResult::TerminalFailure {
                reason: format!("HTTP {}", s.as_u16()),
            };
        }
        _ => {}
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string();

    match response.text().await {
        Ok(body) => FetchResult::Success {
            final_url,
            status_code: status.as_u16(),
            content_type,
            body,
        },
        Err(e) => classify_error(&e),
    }
}

fn classify_error(e: &reqwest::Error) -> FetchResult {
    if e.is_timeout() {
        FetchResult::RetryableFailure {
            reason: "Request timeout".to_string(),
        }
    } else if e.is_connect() {
        FetchResult::RetryableFailure {
            reason: format!("Connection error: {}", e),
        }
    } else {
        FetchResult::TerminalFailure {
            reason: e.to_string(),
        }
    }
}

/// Single-request fetcher with retry
///
/// Knows nothing about domains or robots.txt; the politeness controller wraps it.
#[derive(Debug, Clone)]
pub struct Fetcher {
    client: Client,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl Fetcher {
    /// Creates a fetcher over an existing client
    pub fn new(client: Client, max_retries: u32, backoff_base_ms: u64) -> Self {
        Self {
            client,
            max_retries,
            backoff_base_ms,
        }
    }

    /// Builds the client and retry policy from the `[crawler]` section
    pub fn from_config(config: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        let client = build_http_client(Duration::from_secs(config.request_timeout))?;
        Ok(Self::new(client, config.max_retries, config.backoff_base))
    }

    /// The underlying client, shared with the robots.txt fetch
    pub fn client(&self) -> &Client {
        &self.client
    }

    /// Fetches a URL, retrying transient failures with exponential backoff
    ///
    /// Never retries `NotFound`, `Forbidden`, or `TerminalFailure`.
    pub async fn fetch(&self, url: &Url) -> FetchResult {
        with_retry(
            self.max_retries,
            self.backoff_base_ms,
            FetchResult::is_retryable,
            |attempt| async move {
                debug!(
                    "Requesting {} (attempt {}/{})",
                    url,
                    attempt + 1,
                    self.max_retries + 1
                );
                fetch_once(&self.client, url).await
            },
        )
        .await
    }
}
