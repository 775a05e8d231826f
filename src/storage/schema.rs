//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the results database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- One row per bookstore, keyed by homepage URL
CREATE TABLE IF NOT EXISTS bookstores (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    homepage_url TEXT NOT NULL UNIQUE,
    product_url TEXT,
    postal_code TEXT,
    city TEXT,
    success INTEGER NOT NULL DEFAULT 0,
    error_kind TEXT,
    error_message TEXT,
    crawled_at TEXT NOT NULL,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_bookstores_success ON bookstores(success);
CREATE INDEX IF NOT EXISTS idx_bookstores_city ON bookstores(city);

-- Track crawl runs
CREATE TABLE IF NOT EXISTS crawl_runs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    book_title TEXT NOT NULL,
    book_author TEXT NOT NULL,
    book_isbn TEXT NOT NULL,
    config_hash TEXT NOT NULL,
    status TEXT NOT NULL,
    started_at TEXT NOT NULL,
    completed_at TEXT,
    total INTEGER NOT NULL DEFAULT 0,
    successful INTEGER NOT NULL DEFAULT 0,
    failed INTEGER NOT NULL DEFAULT 0
);
"#;

/// Initializes the database schema
///
/// Safe to call on an existing database; every statement is `IF NOT EXISTS`.
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
