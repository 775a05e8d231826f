//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::config::BookConfig;
use crate::state::{CrawlResult, RunStats};
use crate::storage::{BookstoreRecord, DatabaseStats, RunRecord};
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Run not found: {0}")]
    RunNotFound(i64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// Crawl results are keyed by homepage URL: storing a result for a bookstore that
/// is already known replaces its previous outcome.
pub trait Storage {
    // ===== Run Management =====

    /// Records the start of a run and returns its ID
    fn create_run(&mut self, book: &BookConfig, config_hash: &str) -> StorageResult<i64>;

    /// Marks a run as completed with its final totals
    fn complete_run(&mut self, run_id: i64, stats: &RunStats) -> StorageResult<()>;

    /// Gets a run by ID
    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord>;

    // ===== Bookstore Results =====

    /// Inserts or updates the row for `result.homepage_url` and returns its ID
    fn upsert_result(&mut self, result: &CrawlResult) -> StorageResult<i64>;

    /// Successful bookstores that have both a product URL and a postal code
    fn get_successful(&self) -> StorageResult<Vec<BookstoreRecord>>;

    /// Every stored bookstore, in name order
    fn get_all(&self) -> StorageResult<Vec<BookstoreRecord>>;

    // ===== Statistics =====

    /// Aggregate counts over the stored results
    fn get_statistics(&self) -> StorageResult<DatabaseStats>;
}
