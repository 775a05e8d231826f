use crate::robots::ParsedRobots;
use chrono::{DateTime, Utc};
use std::time::{Duration, Instant};

/// Tracks the politeness state of one domain during a run
///
/// There is at most one `DomainState` per domain key. The politeness controller
/// serializes access to it, so the elapsed-time check and the timestamp update
/// happen as one step.
#[derive(Debug, Clone)]
pub struct DomainState {
    /// Domain key (lowercase host plus explicit port)
    pub domain: String,

    /// Number of requests issued to this domain in the current run
    pub request_count: u32,

    /// When the last request to this domain was issued
    pub last_request_time: Option<Instant>,

    /// Parsed robots.txt, fetched lazily on first contact and kept for the run
    pub robots: Option<ParsedRobots>,

    /// When the robots.txt was fetched
    pub robots_fetched_at: Option<DateTime<Utc>>,
}

impl DomainState {
    /// Creates a fresh state for a domain
    pub fn new(domain: impl Into<String>) -> Self {
        Self {
            domain: domain.into(),
            request_count: 0,
            last_request_time: None,
            robots: None,
            robots_fetched_at: None,
        }
    }

    /// Checks if a request can be issued now without violating the minimum interval
    pub fn can_request(&self, min_delay: Duration, now: Instant) -> bool {
        self.time_until_next_request(min_delay, now).is_none()
    }

    /// Records that a request was issued to this domain
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }

    /// Calculates the time until the next request can be made
    ///
    /// Returns None if a request can be made now, or the duration to wait otherwise.
    pub fn time_until_next_request(&self, min_delay: Duration, now: Instant) -> Option<Duration> {
        let last = self.last_request_time?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < min_delay {
            Some(min_delay - elapsed)
        } else {
            None
        }
    }

    /// Returns true once robots.txt has been resolved for this domain
    pub fn has_robots(&self) -> bool {
        self.robots.is_some()
    }

    /// Stores the robots.txt decision for the remainder of the run
    pub fn update_robots(&mut self, robots: ParsedRobots) {
        self.robots = Some(robots);
        self.robots_fetched_at = Some(Utc::now());
    }

    /// Checks a URL against the cached robots.txt; unresolved policy allows everything
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        self.robots
            .as_ref()
            .map_or(true, |robots| robots.is_allowed(url, user_agent))
    }
}
