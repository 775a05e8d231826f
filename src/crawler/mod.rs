//! Crawler module for polite page fetching and per-bookstore orchestration
//!
//! This module contains the core crawling logic, including:
//! - HTTP fetching with retry and backoff
//! - Per-domain robots.txt enforcement and rate limiting
//! - HTML parsing helpers (links, visible text, search forms)
//! - The coordinator that runs every bookstore through the pipeline

mod coordinator;
mod fetcher;
mod parser;
mod politeness;
mod retry;

pub use coordinator::Coordinator;
pub use fetcher::{build_http_client, fetch_once, FetchResult, Fetcher};
pub use parser::{
    document_text, extract_links, find_search_form, parse_document, resolve_link, visible_text,
    Link, SearchForm,
};
pub use politeness::PolitenessController;
pub use retry::{backoff_delay, with_retry};
