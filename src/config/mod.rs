//! Configuration module for Bookstore Finder
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Only the `[book]` section is required; every other section falls back to the
//! defaults the crawler has always used.
//!
//! # Example
//!
//! ```no_run
//! use bookstore_finder::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("config.toml")).unwrap();
//! println!("Looking for '{}' by {}", config.book.title, config.book.author);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    BookConfig, Config, CrawlerConfig, ExtractionConfig, OutputConfig, SearchConfig,
    UserAgentConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};
