//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::config::BookConfig;
use crate::state::{CrawlResult, ErrorKind, RunStats};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{BookstoreRecord, DatabaseStats, RunRecord, RunStatus};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row};
use std::path::Path;

const BOOKSTORE_COLUMNS: &str = "id, name, homepage_url, product_url, postal_code, city, success, \
     error_kind, error_message, crawled_at, created_at, updated_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Opens (or creates) the database at `path`
    ///
    /// Missing parent directories are created.
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;
        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn query_bookstores(&self, filter: &str) -> StorageResult<Vec<BookstoreRecord>> {
        let sql = format!("SELECT {} FROM bookstores {}", BOOKSTORE_COLUMNS, filter);
        let mut stmt = self.conn.prepare(&sql)?;
        let records = stmt
            .query_map([], bookstore_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(records)
    }

    fn count(&self, filter: &str) -> StorageResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM bookstores {}", filter);
        let count: i64 = self.conn.query_row(&sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

fn bookstore_from_row(row: &Row<'_>) -> rusqlite::Result<BookstoreRecord> {
    let error_kind: Option<String> = row.get(7)?;
    Ok(BookstoreRecord {
        id: row.get(0)?,
        name: row.get(1)?,
        homepage_url: row.get(2)?,
        product_url: row.get(3)?,
        postal_code: row.get(4)?,
        city: row.get(5)?,
        success: row.get(6)?,
        error_kind: error_kind.as_deref().and_then(ErrorKind::from_db_string),
        error_message: row.get(8)?,
        crawled_at: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

impl Storage for SqliteStorage {
    // ===== Run Management =====

    fn create_run(&mut self, book: &BookConfig, config_hash: &str) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO crawl_runs (book_title, book_author, book_isbn, config_hash, status, started_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                book.title,
                book.author,
                book.isbn,
                config_hash,
                RunStatus::Running.to_db_string(),
                now
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn complete_run(&mut self, run_id: i64, stats: &RunStats) -> StorageResult<()> {
        let now = Utc::now().to_rfc3339();
        let updated = self.conn.execute(
            "UPDATE crawl_runs
             SET status = ?1, completed_at = ?2, total = ?3, successful = ?4, failed = ?5
             WHERE id = ?6",
            params![
                RunStatus::Completed.to_db_string(),
                now,
                stats.total as i64,
                stats.successful as i64,
                stats.failed as i64,
                run_id
            ],
        )?;
        if updated == 0 {
            return Err(StorageError::RunNotFound(run_id));
        }
        Ok(())
    }

    fn get_run(&self, run_id: i64) -> StorageResult<RunRecord> {
        self.conn
            .query_row(
                "SELECT id, book_title, book_author, book_isbn, config_hash, status, started_at,
                        completed_at, total, successful, failed
                 FROM crawl_runs WHERE id = ?1",
                params![run_id],
                |row| {
                    Ok(RunRecord {
                        id: row.get(0)?,
                        book_title: row.get(1)?,
                        book_author: row.get(2)?,
                        book_isbn: row.get(3)?,
                        config_hash: row.get(4)?,
                        status: RunStatus::from_db_string(&row.get::<_, String>(5)?)
                            .unwrap_or(RunStatus::Running),
                        started_at: row.get(6)?,
                        completed_at: row.get(7)?,
                        total: row.get::<_, i64>(8)? as u64,
                        successful: row.get::<_, i64>(9)? as u64,
                        failed: row.get::<_, i64>(10)? as u64,
                    })
                },
            )
            .optional()?
            .ok_or(StorageError::RunNotFound(run_id))
    }

    // ===== Bookstore Results =====

    fn upsert_result(&mut self, result: &CrawlResult) -> StorageResult<i64> {
        let now = Utc::now().to_rfc3339();
        self.conn.execute(
            "INSERT INTO bookstores (name, homepage_url, product_url, postal_code, city, success,
                                     error_kind, error_message, crawled_at, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9, ?9)
             ON CONFLICT(homepage_url) DO UPDATE SET
                name = excluded.name,
                product_url = excluded.product_url,
                postal_code = excluded.postal_code,
                city = excluded.city,
                success = excluded.success,
                error_kind = excluded.error_kind,
                error_message = excluded.error_message,
                crawled_at = excluded.crawled_at,
                updated_at = excluded.updated_at",
            params![
                result.name,
                result.homepage_url,
                result.product_url,
                result.postal_code,
                result.city,
                result.success,
                result.error_kind.map(|kind| kind.to_db_string()),
                result.error_message,
                now
            ],
        )?;

        let id = self.conn.query_row(
            "SELECT id FROM bookstores WHERE homepage_url = ?1",
            params![result.homepage_url],
            |row| row.get(0),
        )?;
        Ok(id)
    }

    fn get_successful(&self) -> StorageResult<Vec<BookstoreRecord>> {
        self.query_bookstores(
            "WHERE success = 1 AND product_url IS NOT NULL AND postal_code IS NOT NULL
             ORDER BY city, name",
        )
    }

    fn get_all(&self) -> StorageResult<Vec<BookstoreRecord>> {
        self.query_bookstores("ORDER BY name")
    }

    // ===== Statistics =====

    fn get_statistics(&self) -> StorageResult<DatabaseStats> {
        let last_run_started = self
            .conn
            .query_row(
                "SELECT started_at FROM crawl_runs ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        Ok(DatabaseStats {
            total_bookstores: self.count("")?,
            successful: self.count("WHERE success = 1")?,
            with_product_url: self.count("WHERE product_url IS NOT NULL")?,
            with_postal_code: self.count("WHERE postal_code IS NOT NULL")?,
            complete: self.count(
                "WHERE product_url IS NOT NULL AND postal_code IS NOT NULL AND city IS NOT NULL",
            )?,
            last_run_started,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::BookstoreTarget;

    fn book() -> BookConfig {
        BookConfig {
            title: "Zanger Ronald zingt de blues".to_string(),
            author: "Walter van den Berg".to_string(),
            isbn: "9789048853366".to_string(),
            title_variants: vec![],
        }
    }

    fn success(name: &str, url: &str, city: &str) -> CrawlResult {
        let target = BookstoreTarget::new(name, url);
        let mut result = CrawlResult::for_target(&target);
        result.product_url = Some(format!("{}/boek/1", url));
        result.postal_code = Some("1234 AB".to_string());
        result.city = Some(city.to_string());
        result.finalize(&target);
        result
    }

    fn failure(name: &str, url: &str, kind: ErrorKind) -> CrawlResult {
        let target = BookstoreTarget::new(name, url);
        let mut result = CrawlResult::for_target(&target);
        result.fail(kind, kind.description());
        result.finalize(&target);
        result
    }

    #[test]
    fn test_run_lifecycle() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        let run_id = storage.create_run(&book(), "abc123").unwrap();

        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Running);
        assert_eq!(run.book_isbn, "9789048853366");
        assert!(run.completed_at.is_none());

        let stats = RunStats {
            total: 3,
            successful: 2,
            failed: 1,
        };
        storage.complete_run(run_id, &stats).unwrap();

        let run = storage.get_run(run_id).unwrap();
        assert_eq!(run.status, RunStatus::Completed);
        assert_eq!((run.total, run.successful, run.failed), (3, 2, 1));
        assert!(run.completed_at.is_some());
    }

    #[test]
    fn test_missing_run() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        assert!(matches!(storage.get_run(42), Err(StorageError::RunNotFound(42))));
        assert!(storage.complete_run(42, &RunStats::default()).is_err());
    }

    #[test]
    fn test_upsert_replaces_by_homepage_url() {
        let mut storage = SqliteStorage::in_memory().unwrap();

        let first = storage
            .upsert_result(&failure("Boekhandel X", "https://x.example", ErrorKind::Network))
            .unwrap();
        let second = storage
            .upsert_result(&success("Boekhandel X", "https://x.example", "Voorbeeldstad"))
            .unwrap();
        assert_eq!(first, second);

        let all = storage.get_all().unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].success);
        assert_eq!(all[0].error_kind, None);
        assert_eq!(all[0].city.as_deref(), Some("Voorbeeldstad"));
    }

    #[test]
    fn test_error_kind_is_stored() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        storage
            .upsert_result(&failure("Y", "https://y.example", ErrorKind::Forbidden))
            .unwrap();

        let all = storage.get_all().unwrap();
        assert_eq!(all[0].error_kind, Some(ErrorKind::Forbidden));
        assert!(all[0].product_url.is_none());
    }

    #[test]
    fn test_successful_sorted_by_city_then_name() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        storage.upsert_result(&success("Zeta", "https://z.example", "Amsterdam")).unwrap();
        storage.upsert_result(&success("Alpha", "https://a.example", "Utrecht")).unwrap();
        storage.upsert_result(&success("Beta", "https://b.example", "Amsterdam")).unwrap();
        storage
            .upsert_result(&failure("Gamma", "https://g.example", ErrorKind::NoProductPage))
            .unwrap();

        let names: Vec<String> = storage
            .get_successful()
            .unwrap()
            .into_iter()
            .map(|r| r.name)
            .collect();
        assert_eq!(names, vec!["Beta", "Zeta", "Alpha"]);
    }

    #[test]
    fn test_statistics() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        assert_eq!(storage.get_statistics().unwrap(), DatabaseStats::default());

        storage.create_run(&book(), "hash").unwrap();
        storage.upsert_result(&success("A", "https://a.example", "Utrecht")).unwrap();

        let mut partial = failure("B", "https://b.example", ErrorKind::NoPostalCode);
        partial.product_url = Some("https://b.example/boek/1".to_string());
        storage.upsert_result(&partial).unwrap();

        let stats = storage.get_statistics().unwrap();
        assert_eq!(stats.total_bookstores, 2);
        assert_eq!(stats.successful, 1);
        assert_eq!(stats.with_product_url, 2);
        assert_eq!(stats.with_postal_code, 1);
        assert_eq!(stats.complete, 1);
        assert!(stats.last_run_started.is_some());
    }
}
