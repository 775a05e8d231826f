//! Bookstore Finder main entry point
//!
//! This is the command-line interface for the bookstore product-page and address
//! locator.

use anyhow::Context;
use bookstore_finder::config::{load_config_with_hash, Config};
use bookstore_finder::input::load_targets;
use bookstore_finder::output::{export_json, load_statistics, print_statistics};
use bookstore_finder::storage::{open_storage, SqliteStorage};
use bookstore_finder::Coordinator;
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Bookstore Finder: a polite product-page and address locator
///
/// Visits each bookstore in the input list, finds the page that sells the
/// configured book, and extracts the store's postal code and city. Results are
/// stored in SQLite and exported as JSON.
#[derive(Parser, Debug)]
#[command(name = "bookstore-finder")]
#[command(version)]
#[command(about = "Find a book's product page and address on bookstore websites", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// CSV file with columns name,url[,postal_code,city]
    #[arg(short, long, value_name = "CSV", required_unless_present = "stats_only")]
    input: Option<PathBuf>,

    /// JSON export path (overrides [output] json-path)
    #[arg(short, long, value_name = "JSON")]
    output: Option<PathBuf>,

    /// SQLite database path (overrides [output] database-path)
    #[arg(long, value_name = "DB")]
    db: Option<PathBuf>,

    /// Manual entries CSV (overrides [output] manual-entries-path)
    #[arg(long, value_name = "CSV")]
    manual: Option<PathBuf>,

    /// Only process the first N bookstores
    #[arg(short, long, value_name = "N")]
    limit: Option<usize>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Ignore robots.txt (use only with the site owner's permission)
    #[arg(long)]
    no_robots: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats_only: bool,

    /// Validate config and input and show what would be crawled
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, config_hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    apply_overrides(&mut config, &cli);

    if cli.stats_only {
        let storage = open_storage(Path::new(&config.output.database_path))?;
        show_statistics(&storage)?;
        return Ok(());
    }

    let Some(input) = &cli.input else {
        anyhow::bail!("--input is required");
    };
    let mut targets = load_targets(input)
        .with_context(|| format!("Failed to load bookstores from {}", input.display()))?;
    if let Some(limit) = cli.limit {
        targets.truncate(limit);
    }
    tracing::info!("Loaded {} bookstores", targets.len());

    if cli.dry_run {
        handle_dry_run(&config, targets.len());
        return Ok(());
    }

    let storage = open_storage(Path::new(&config.output.database_path))?;
    let book = config.book.clone();
    let json_path = PathBuf::from(&config.output.json_path);
    let manual_path = PathBuf::from(&config.output.manual_entries_path);

    let mut coordinator = Coordinator::new(config, storage, config_hash)?;
    coordinator.run(&targets).await?;

    // manual entries may exist even when nothing was crawled
    export_json(coordinator.storage(), &book, &manual_path, &json_path)?;
    show_statistics(coordinator.storage())?;

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("bookstore_finder=info,warn"),
            1 => EnvFilter::new("bookstore_finder=debug,info"),
            2 => EnvFilter::new("bookstore_finder=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Applies command-line overrides on top of the loaded configuration
fn apply_overrides(config: &mut Config, cli: &Cli) {
    if let Some(db) = &cli.db {
        config.output.database_path = db.display().to_string();
    }
    if let Some(output) = &cli.output {
        config.output.json_path = output.display().to_string();
    }
    if let Some(manual) = &cli.manual {
        config.output.manual_entries_path = manual.display().to_string();
    }
    if cli.no_robots {
        tracing::warn!("robots.txt checking disabled");
        config.crawler.respect_robots_txt = false;
    }
}

fn show_statistics(storage: &SqliteStorage) -> anyhow::Result<()> {
    let stats = load_statistics(storage)?;
    print_statistics(&stats);
    Ok(())
}

/// Handles the --dry-run mode: shows the effective settings without crawling
fn handle_dry_run(config: &Config, bookstores: usize) {
    println!("=== Bookstore Finder Dry Run ===\n");

    println!("Book:");
    println!("  Title: {}", config.book.title);
    println!("  Author: {}", config.book.author);
    println!("  ISBN: {}", config.book.isbn);
    if !config.book.title_variants.is_empty() {
        println!("  Title variants: {}", config.book.title_variants.join(", "));
    }

    println!("\nCrawler:");
    println!(
        "  Delay between requests: {}ms",
        config.crawler.delay_between_requests
    );
    println!("  Request timeout: {}s", config.crawler.request_timeout);
    println!("  Max retries: {}", config.crawler.max_retries);
    println!("  Respect robots.txt: {}", config.crawler.respect_robots_txt);
    println!("  Robots user agent: {}", config.user_agent.identity());

    println!("\nSearch:");
    println!("  Known URL paths: {}", config.search.known_paths.len());
    println!("  Search engine: {}", config.search.use_search_engine);

    println!("\nOutput:");
    println!("  Database: {}", config.output.database_path);
    println!("  JSON export: {}", config.output.json_path);
    println!("  Manual entries: {}", config.output.manual_entries_path);

    println!("\nBookstores to process: {}", bookstores);
}
