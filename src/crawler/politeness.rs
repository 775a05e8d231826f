//! Per-domain politeness: robots.txt enforcement and rate limiting
//!
//! Every page request made by the finder and the extractor goes through
//! `PolitenessController::guarded_fetch`. For each domain the controller keeps one
//! `DomainState` behind its own async mutex, so the elapsed-time check and the
//! timestamp update are one step even if bookstores are ever processed in parallel.
//! Different domains never wait on each other.

use super::fetcher::{FetchResult, Fetcher};
use crate::config::Config;
use crate::robots::fetch_robots;
use crate::state::DomainState;
use crate::url::extract_domain;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tracing::{debug, info};
use url::Url;

/// Upper bound on a robots.txt `Crawl-delay` we are willing to honor
const MAX_CRAWL_DELAY: Duration = Duration::from_secs(60);

type DomainSlot = Arc<tokio::sync::Mutex<DomainState>>;

/// Rate limiter and robots.txt cache wrapping the `Fetcher`
pub struct PolitenessController {
    fetcher: Fetcher,

    /// Per-domain state, created on first contact and kept for the run
    domains: Mutex<HashMap<String, DomainSlot>>,

    /// Minimum interval between requests to the same domain
    delay: Duration,

    /// Timeout for the one-off robots.txt request
    robots_timeout: Duration,

    respect_robots: bool,

    /// Bot name matched against robots.txt user-agent groups
    robots_agent: String,

    /// User-Agent header sent with the robots.txt request
    robots_identity: String,
}

impl PolitenessController {
    /// Creates a controller around an existing fetcher
    pub fn new(
        fetcher: Fetcher,
        delay: Duration,
        robots_timeout: Duration,
        respect_robots: bool,
        robots_agent: impl Into<String>,
    ) -> Self {
        let robots_agent = robots_agent.into();
        Self {
            fetcher,
            domains: Mutex::new(HashMap::new()),
            delay,
            robots_timeout,
            respect_robots,
            robots_identity: robots_agent.clone(),
            robots_agent,
        }
    }

    /// Sets the User-Agent sent when reading robots.txt (defaults to the bot name)
    pub fn with_robots_identity(mut self, identity: impl Into<String>) -> Self {
        self.robots_identity = identity.into();
        self
    }

    /// Builds the fetcher and controller from configuration
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let fetcher = Fetcher::from_config(&config.crawler)?;
        Ok(Self::new(
            fetcher,
            Duration::from_millis(config.crawler.delay_between_requests),
            Duration::from_secs(config.crawler.request_timeout),
            config.crawler.respect_robots_txt,
            config.user_agent.crawler_name.clone(),
        )
        .with_robots_identity(config.user_agent.identity()))
    }

    /// Number of domains contacted so far in this run
    pub fn domain_count(&self) -> usize {
        self.lock_domains().len()
    }

    /// Number of page requests issued to the domain of `url`
    pub async fn request_count(&self, url: &Url) -> u32 {
        let Some(key) = extract_domain(url) else {
            return 0;
        };
        let slot = self.lock_domains().get(&key).cloned();
        match slot {
            Some(slot) => slot.lock().await.request_count,
            None => 0,
        }
    }

    /// Checks `url` against its domain's robots.txt, fetching the file on first contact
    ///
    /// Does not touch the rate limiter.
    pub async fn is_allowed(&self, url: &Url) -> bool {
        if !self.respect_robots {
            return true;
        }
        let Some(slot) = self.slot_for(url) else {
            return true;
        };

        let mut state = slot.lock().await;
        self.ensure_robots(&mut state, url).await;
        state.is_allowed(url.as_str(), &self.robots_agent)
    }

    /// Fetches `url` after the robots.txt check and the per-domain wait
    ///
    /// Returns `Disallowed` without sending a request (or recording one) when
    /// robots.txt forbids the URL.
    pub async fn guarded_fetch(&self, url: &Url) -> FetchResult {
        let Some(slot) = self.slot_for(url) else {
            return FetchResult::TerminalFailure {
                reason: format!("URL has no host: {}", url),
            };
        };

        {
            let mut state = slot.lock().await;

            if self.respect_robots {
                self.ensure_robots(&mut state, url).await;
                if !state.is_allowed(url.as_str(), &self.robots_agent) {
                    info!("robots.txt disallows fetching: {}", url);
                    return FetchResult::Disallowed;
                }
            }

            let delay = self.effective_delay(&state);
            if let Some(wait) = state.time_until_next_request(delay, Instant::now()) {
                debug!(
                    "Rate limiting: sleeping {:.2}s for {}",
                    wait.as_secs_f64(),
                    state.domain
                );
                tokio::time::sleep(wait).await;
            }

            // Recorded before the request goes out
            state.record_request(Instant::now());
        }

        self.fetcher.fetch(url).await
    }

    /// Configured delay, raised to the robots.txt `Crawl-delay` when that is longer
    fn effective_delay(&self, state: &DomainState) -> Duration {
        if !self.respect_robots {
            return self.delay;
        }

        let robots_delay = state
            .robots
            .as_ref()
            .and_then(|robots| robots.crawl_delay(&self.robots_agent))
            .and_then(|secs| Duration::try_from_secs_f64(secs).ok())
            .map(|d| d.min(MAX_CRAWL_DELAY))
            .unwrap_or(Duration::ZERO);

        self.delay.max(robots_delay)
    }

    async fn ensure_robots(&self, state: &mut DomainState, url: &Url) {
        if state.has_robots() {
            return;
        }
        let robots = fetch_robots(
            self.fetcher.client(),
            url,
            &self.robots_identity,
            self.robots_timeout,
        )
        .await;
        state.update_robots(robots);
    }

    fn slot_for(&self, url: &Url) -> Option<DomainSlot> {
        let key = extract_domain(url)?;
        let mut domains = self.lock_domains();
        let slot = domains
            .entry(key.clone())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(DomainState::new(key))));
        Some(Arc::clone(slot))
    }

    fn lock_domains(&self) -> std::sync::MutexGuard<'_, HashMap<String, DomainSlot>> {
        // The map is only touched in short synchronous sections; a poisoned lock
        // still holds consistent data.
        self.domains.lock().unwrap_or_else(|e| e.into_inner())
    }
}
