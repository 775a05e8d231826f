//! State module for tracking crawl progress
//!
//! # Components
//!
//! - `DomainState`: per-domain rate-limit timestamp and cached robots.txt decision
//! - `BookstoreTarget` / `CrawlResult`: the input record and its per-run outcome
//! - `RunStats`: run-level totals

mod crawl_result;
mod domain_state;

// Re-export main types
pub use crawl_result::{BookstoreTarget, CrawlResult, ErrorKind, RunStats};
pub use domain_state::DomainState;
