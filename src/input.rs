//! Bookstore list loading
//!
//! The input is a CSV file with a header row. `name` and `url` are required
//! columns; `postal_code` and `city` are optional and, when both are filled in,
//! let a bookstore skip address extraction.

use crate::state::BookstoreTarget;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, warn};

/// Errors that make the bookstore list unusable
#[derive(Debug, Error)]
pub enum InputError {
    #[error("Failed to read input file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid CSV: {0}")]
    Csv(#[from] csv::Error),

    #[error("Input is missing required column '{0}'")]
    MissingColumn(&'static str),
}

/// Loads bookstore targets from a CSV file
pub fn load_targets(path: &Path) -> Result<Vec<BookstoreTarget>, InputError> {
    let file = std::fs::File::open(path)?;
    let targets = read_targets(file)?;
    debug!("Loaded {} bookstores from {}", targets.len(), path.display());
    Ok(targets)
}

/// Reads bookstore targets from any CSV source
///
/// Fields are trimmed and blank optional fields become `None`. Rows without a
/// name or URL are skipped. URLs without a scheme get `https://`.
pub fn read_targets<R: Read>(reader: R) -> Result<Vec<BookstoreTarget>, InputError> {
    let mut csv = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let headers = csv.headers()?.clone();
    let column = |name: &str| headers.iter().position(|h| h.eq_ignore_ascii_case(name));
    let name_col = column("name").ok_or(InputError::MissingColumn("name"))?;
    let url_col = column("url").ok_or(InputError::MissingColumn("url"))?;
    let postal_col = column("postal_code");
    let city_col = column("city");

    let mut targets = Vec::new();
    for (index, record) in csv.records().enumerate() {
        let record = record?;
        let field = |col: Option<usize>| {
            col.and_then(|c| record.get(c))
                .filter(|value| !value.is_empty())
                .map(str::to_string)
        };

        let (Some(name), Some(url)) = (field(Some(name_col)), field(Some(url_col))) else {
            // header is line 1
            warn!("Skipping input line {}: missing name or url", index + 2);
            continue;
        };

        targets.push(BookstoreTarget {
            name,
            homepage_url: with_scheme(&url),
            known_postal_code: field(postal_col),
            known_city: field(city_col),
        });
    }

    Ok(targets)
}

fn with_scheme(url: &str) -> String {
    if url.starts_with("http://") || url.starts_with("https://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}
