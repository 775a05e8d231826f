//! Statistics generation from the results database
//!
//! This module provides functionality for extracting and displaying
//! crawl statistics from the storage layer.

use crate::state::ErrorKind;
use crate::storage::{DatabaseStats, Storage, StorageResult};
use std::collections::HashMap;

/// Database statistics plus a breakdown of failures
#[derive(Debug, Clone)]
pub struct CrawlStatistics {
    pub database: DatabaseStats,

    /// Failed bookstores per error kind
    pub failures_by_kind: HashMap<ErrorKind, u64>,
}

/// Loads statistics from storage
pub fn load_statistics(storage: &dyn Storage) -> StorageResult<CrawlStatistics> {
    let database = storage.get_statistics()?;

    let mut failures_by_kind = HashMap::new();
    for record in storage.get_all()? {
        if let Some(kind) = record.error_kind {
            *failures_by_kind.entry(kind).or_insert(0) += 1;
        }
    }

    Ok(CrawlStatistics {
        database,
        failures_by_kind,
    })
}

fn percentage(count: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        (count as f64 / total as f64) * 100.0
    }
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &CrawlStatistics) {
    let db = &stats.database;
    let total = db.total_bookstores;

    println!("=== Database Statistics ===\n");

    println!("Overview:");
    println!("  Total bookstores: {}", total);
    println!(
        "  Successful: {} ({:.1}%)",
        db.successful,
        percentage(db.successful, total)
    );
    println!("  With product URL: {}", db.with_product_url);
    println!("  With postal code: {}", db.with_postal_code);
    println!("  Complete (URL, postal code and city): {}", db.complete);
    if let Some(started) = &db.last_run_started {
        println!("  Last run started: {}", started);
    }
    println!();

    if !stats.failures_by_kind.is_empty() {
        println!("Failures:");
        let mut kinds: Vec<_> = stats.failures_by_kind.iter().collect();
        kinds.sort_by(|a, b| b.1.cmp(a.1));
        for (kind, count) in kinds {
            println!(
                "  {}: {} ({:.1}%)",
                kind.description(),
                count,
                percentage(*count, total)
            );
        }
        println!();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::{BookstoreTarget, CrawlResult};
    use crate::storage::SqliteStorage;

    #[test]
    fn test_failures_grouped_by_kind() {
        let mut storage = SqliteStorage::in_memory().unwrap();
        for (name, kind) in [
            ("a", ErrorKind::Forbidden),
            ("b", ErrorKind::Forbidden),
            ("c", ErrorKind::NoPostalCode),
        ] {
            let target = BookstoreTarget::new(name, format!("https://{}.example", name));
            let mut result = CrawlResult::for_target(&target);
            result.fail(kind, "failed");
            storage.upsert_result(&result).unwrap();
        }

        let stats = load_statistics(&storage).unwrap();
        assert_eq!(stats.database.total_bookstores, 3);
        assert_eq!(stats.failures_by_kind.get(&ErrorKind::Forbidden), Some(&2));
        assert_eq!(stats.failures_by_kind.get(&ErrorKind::NoPostalCode), Some(&1));
        assert_eq!(stats.failures_by_kind.get(&ErrorKind::Robots), None);
    }

    #[test]
    fn test_percentage_of_empty_total() {
        assert_eq!(percentage(0, 0), 0.0);
        assert_eq!(percentage(1, 4), 25.0);
    }
}
