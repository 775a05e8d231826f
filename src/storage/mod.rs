//! Storage module for persisting crawl results
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - One row per bookstore, updated in place on every crawl
//! - Run tracking with book identity, config hash and totals

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use crate::state::ErrorKind;
use std::path::Path;

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Represents a bookstore row in the database
#[derive(Debug, Clone)]
pub struct BookstoreRecord {
    pub id: i64,
    pub name: String,
    pub homepage_url: String,
    pub product_url: Option<String>,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub success: bool,
    pub error_kind: Option<ErrorKind>,
    pub error_message: Option<String>,
    pub crawled_at: String,
    pub created_at: String,
    pub updated_at: String,
}

/// Represents a crawl run
#[derive(Debug, Clone)]
pub struct RunRecord {
    pub id: i64,
    pub book_title: String,
    pub book_author: String,
    pub book_isbn: String,
    pub config_hash: String,
    pub status: RunStatus,
    pub started_at: String,
    pub completed_at: Option<String>,
    pub total: u64,
    pub successful: u64,
    pub failed: u64,
}

/// Status of a crawl run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    Running,
    Completed,
}

impl RunStatus {
    pub fn to_db_string(&self) -> &'static str {
        match self {
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }

    pub fn from_db_string(s: &str) -> Option<Self> {
        match s {
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

/// Aggregate counts over the `bookstores` table
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DatabaseStats {
    pub total_bookstores: u64,
    pub successful: u64,
    pub with_product_url: u64,
    pub with_postal_code: u64,

    /// Rows with product URL, postal code and city all present
    pub complete: u64,

    /// Start time of the most recent run, if any
    pub last_run_started: Option<String>,
}
