//! JSON export of located bookstores
//!
//! Stored successes are merged with a hand-maintained CSV of manual entries. A
//! manual entry replaces a crawled one with the same name.

use super::ExportError;
use crate::config::BookConfig;
use crate::storage::{BookstoreRecord, Storage};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::io::Read;
use std::path::Path;
use tracing::{debug, info};

/// Where an exported record came from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordSource {
    Crawled,
    Manual,
}

/// One bookstore in the export
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub name: String,
    pub product_url: String,
    pub postal_code: Option<String>,
    pub city: Option<String>,
    pub source: RecordSource,
}

impl ExportRecord {
    fn from_stored(record: BookstoreRecord) -> Option<Self> {
        Some(Self {
            name: record.name,
            product_url: record.product_url?,
            postal_code: record.postal_code,
            city: record.city,
            source: RecordSource::Crawled,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportMetadata {
    pub book_title: String,
    pub book_author: String,
    pub book_isbn: String,
    pub last_updated: String,
    pub total_bookstores: usize,
    pub crawled_count: usize,
    pub manual_count: usize,
}

/// The exported document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Export {
    pub metadata: ExportMetadata,
    pub bookstores: Vec<ExportRecord>,
}

impl Export {
    /// Wraps merged records with metadata; counts are taken from `bookstores`
    pub fn new(book: &BookConfig, bookstores: Vec<ExportRecord>) -> Self {
        let manual_count = bookstores
            .iter()
            .filter(|r| r.source == RecordSource::Manual)
            .count();

        Self {
            metadata: ExportMetadata {
                book_title: book.title.clone(),
                book_author: book.author.clone(),
                book_isbn: book.isbn.clone(),
                last_updated: Utc::now().to_rfc3339(),
                total_bookstores: bookstores.len(),
                crawled_count: bookstores.len() - manual_count,
                manual_count,
            },
            bookstores,
        }
    }
}

/// Loads manual entries from a CSV file; a missing file yields no entries
pub fn load_manual_entries(path: &Path) -> Result<Vec<ExportRecord>, ExportError> {
    if !path.exists() {
        debug!("No manual entries file at {}", path.display());
        return Ok(Vec::new());
    }
    read_manual_entries(std::fs::File::open(path)?)
}

/// Reads manual entries with header `name,product_url,postal_code,city`
///
/// Rows whose name starts with `#` are comments. Rows without a name or product
/// URL are skipped.
pub fn read_manual_entries<R: Read>(reader: R) -> Result<Vec<ExportRecord>, ExportError> {
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let (name_col, url_col) = (column("name"), column("product_url"));
    let (postal_col, city_col) = (column("postal_code"), column("city"));

    let mut entries = Vec::new();
    for record in csv.records() {
        let record = record?;
        let field = |col: Option<usize>| {
            col.and_then(|c| record.get(c))
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let (Some(name), Some(product_url)) = (field(name_col), field(url_col)) else {
            continue;
        };
        if name.starts_with('#') {
            continue;
        }

        entries.push(ExportRecord {
            name,
            product_url,
            postal_code: field(postal_col),
            city: field(city_col),
            source: RecordSource::Manual,
        });
    }

    Ok(entries)
}

/// Merges crawled and manual records and sorts them by city, then name
pub fn merge_records(crawled: Vec<BookstoreRecord>, manual: Vec<ExportRecord>) -> Vec<ExportRecord> {
    let manual_names: HashSet<&str> = manual.iter().map(|r| r.name.as_str()).collect();

    let mut merged: Vec<ExportRecord> = crawled
        .into_iter()
        .filter(|r| !manual_names.contains(r.name.as_str()))
        .filter_map(ExportRecord::from_stored)
        .collect();
    merged.extend(manual.iter().cloned());

    merged.sort_by(|a, b| {
        let city = |r: &ExportRecord| r.city.clone().unwrap_or_default();
        city(a).cmp(&city(b)).then_with(|| a.name.cmp(&b.name))
    });
    merged
}

/// Builds the export from storage and manual entries and writes it as pretty JSON
pub fn export_json(
    storage: &dyn Storage,
    book: &BookConfig,
    manual_path: &Path,
    output_path: &Path,
) -> Result<Export, ExportError> {
    let crawled = storage.get_successful()?;
    let manual = load_manual_entries(manual_path)?;
    let export = Export::new(book, merge_records(crawled, manual));

    if let Some(parent) = output_path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(output_path, serde_json::to_string_pretty(&export)?)?;

    info!(
        "Exported {} bookstores ({} crawled, {} manual) to {}",
        export.metadata.total_bookstores,
        export.metadata.crawled_count,
        export.metadata.manual_count,
        output_path.display()
    );
    Ok(export)
}
