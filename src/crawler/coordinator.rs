//! Crawler coordinator - per-bookstore pipeline and run loop
//!
//! Each bookstore goes through the same linear pipeline with early exit:
//!
//! 1. robots.txt check on the homepage
//! 2. product-page discovery
//! 3. address: the pre-supplied one, or extraction from the site
//!
//! Every bookstore yields exactly one `CrawlResult`. Failures are recorded on the
//! result and never stop the run.

use crate::config::Config;
use crate::crawler::PolitenessController;
use crate::extractor::AddressExtractor;
use crate::finder::ProductPageFinder;
use crate::state::{BookstoreTarget, CrawlResult, ErrorKind, RunStats};
use crate::storage::{SqliteStorage, Storage};
use crate::url::parse_site_url;
use crate::Result;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info, warn};

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    config_hash: String,
    politeness: PolitenessController,
    finder: ProductPageFinder,
    extractor: AddressExtractor,
    storage: SqliteStorage,
}

impl Coordinator {
    /// Creates a coordinator for one run
    ///
    /// `config_hash` is stored with the run record.
    pub fn new(config: Config, storage: SqliteStorage, config_hash: impl Into<String>) -> Result<Self> {
        let politeness = PolitenessController::from_config(&config)?;
        let finder = ProductPageFinder::from_config(&config);
        let extractor = AddressExtractor::from_config(&config.extraction)?;

        if config.search.use_search_engine && config.crawler.respect_robots_txt {
            warn!(
                "Search engine strategy enabled while respecting robots.txt; {} is likely disallowed",
                config.search.search_engine_url
            );
        }

        Ok(Self {
            config: Arc::new(config),
            config_hash: config_hash.into(),
            politeness,
            finder,
            extractor,
            storage,
        })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn politeness(&self) -> &PolitenessController {
        &self.politeness
    }

    /// The results database, for export and statistics after the run
    pub fn storage(&self) -> &SqliteStorage {
        &self.storage
    }

    /// Processes every target in order, storing each result as it is produced
    ///
    /// Only storage failures around the run record itself abort the run.
    pub async fn run(&mut self, targets: &[BookstoreTarget]) -> Result<RunStats> {
        let run_id = self.storage.create_run(&self.config.book, &self.config_hash)?;
        info!(
            "Starting crawl run {} for '{}' over {} bookstores",
            run_id,
            self.config.book.title,
            targets.len()
        );

        let start_time = Instant::now();
        let mut stats = RunStats::default();

        for (index, target) in targets.iter().enumerate() {
            info!("[{}/{}] Processing {}", index + 1, targets.len(), target.name);

            let result = self.crawl_bookstore(target).await;
            if result.success {
                info!(
                    "Success: {} -> {} ({} {})",
                    result.name,
                    result.product_url.as_deref().unwrap_or_default(),
                    result.postal_code.as_deref().unwrap_or("?"),
                    result.city.as_deref().unwrap_or("?")
                );
            } else {
                warn!(
                    "Failed: {} ({})",
                    result.name,
                    result.error_message.as_deref().unwrap_or("unknown error")
                );
            }

            stats.record(&result);
            if let Err(e) = self.storage.upsert_result(&result) {
                error!("Failed to store result for {}: {}", target.name, e);
            }
        }

        self.storage.complete_run(run_id, &stats)?;

        info!(
            "Crawl run {} complete in {:.1}s: {} total, {} successful, {} failed ({:.1}% success rate)",
            run_id,
            start_time.elapsed().as_secs_f64(),
            stats.total,
            stats.successful,
            stats.failed,
            stats.success_rate()
        );
        Ok(stats)
    }

    /// Runs the pipeline for one bookstore
    ///
    /// Errors inside the pipeline become an `Internal` failure on the result.
    pub async fn crawl_bookstore(&self, target: &BookstoreTarget) -> CrawlResult {
        let target = self.with_usable_known_address(target);
        let mut result = CrawlResult::for_target(&target);

        if let Err(e) = self.process(&target, &mut result).await {
            error!("Error processing {}: {}", target.name, e);
            result.fail(ErrorKind::Internal, e.to_string());
        }

        result.finalize(&target);
        result
    }

    async fn process(&self, target: &BookstoreTarget, result: &mut CrawlResult) -> Result<()> {
        let site = parse_site_url(&target.homepage_url)?;

        if !self.politeness.is_allowed(&site).await {
            result.fail(ErrorKind::Robots, ErrorKind::Robots.description());
            return Ok(());
        }

        let discovery = self
            .finder
            .find_product_page(&self.politeness, &target.name, &site)
            .await;

        let Some(product_url) = discovery.product_url else {
            let kind = discovery.homepage_failure.unwrap_or(ErrorKind::NoProductPage);
            result.fail(kind, kind.description());
            return Ok(());
        };
        result.product_url = Some(product_url.to_string());

        if let (Some(postal_code), Some(city)) = (&target.known_postal_code, &target.known_city) {
            debug!("Using known address for {}", target.name);
            result.postal_code = Some(postal_code.clone());
            result.city = Some(city.clone());
            return Ok(());
        }

        match self
            .extractor
            .extract_location(&self.politeness, &site, discovery.homepage_html.as_deref())
            .await
        {
            Some(found) => {
                result.postal_code = Some(found.postal_code);
                result.city = found.city;
            }
            None => result.fail(ErrorKind::NoPostalCode, ErrorKind::NoPostalCode.description()),
        }

        Ok(())
    }

    /// Normalizes a pre-supplied postal code; one that does not parse is dropped
    fn with_usable_known_address(&self, target: &BookstoreTarget) -> BookstoreTarget {
        let mut target = target.clone();
        if let Some(raw) = target.known_postal_code.take() {
            target.known_postal_code = self.extractor.parser().normalize(&raw);
            if target.known_postal_code.is_none() {
                warn!("Ignoring invalid postal code '{}' for {}", raw, target.name);
            }
        }
        target
    }
}
