//! Output module for exporting results and reporting statistics
//!
//! This module handles:
//! - Merging stored results with manual entries into the JSON export
//! - Loading and printing database statistics

mod export;
pub mod stats;

pub use export::{
    export_json, load_manual_entries, merge_records, read_manual_entries, Export, ExportMetadata,
    ExportRecord, RecordSource,
};
pub use stats::{load_statistics, print_statistics, CrawlStatistics};

use crate::storage::StorageError;
use thiserror::Error;

/// Errors raised while building or writing the export
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid manual entries CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),
}
