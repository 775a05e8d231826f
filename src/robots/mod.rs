//! Robots.txt handling module
//!
//! This module fetches and parses robots.txt files. Each domain's file is fetched at
//! most once per run by the politeness controller, which caches the result in its
//! `DomainState`.

mod parser;

pub use parser::ParsedRobots;

use crate::url::robots_url;
use reqwest::{header, Client};
use std::time::Duration;
use tracing::debug;
use url::Url;

/// Fetches the robots.txt that governs `site`
///
/// This request bypasses the rate limiter and is never retried. Anything other than
/// a successful response with a readable body yields an allow-all policy.
///
/// `user_agent` replaces the client's browser User-Agent so site owners see the
/// bot identity in their logs.
pub async fn fetch_robots(
    client: &Client,
    site: &Url,
    user_agent: &str,
    timeout: Duration,
) -> ParsedRobots {
    let url = match robots_url(site) {
        Ok(url) => url,
        Err(e) => {
            debug!("Cannot build robots.txt URL for {}: {}", site, e);
            return ParsedRobots::allow_all();
        }
    };

    let request = client
        .get(url.clone())
        .header(header::USER_AGENT, user_agent)
        .timeout(timeout);

    let response = match request.send().await {
        Ok(response) => response,
        Err(e) => {
            debug!("Could not read robots.txt at {}: {}", url, e);
            return ParsedRobots::allow_all();
        }
    };

    if !response.status().is_success() {
        debug!(
            "robots.txt at {} returned {}, allowing all",
            url,
            response.status()
        );
        return ParsedRobots::allow_all();
    }

    match response.text().await {
        Ok(body) => {
            debug!("Read robots.txt for {} ({} bytes)", url, body.len());
            ParsedRobots::from_content(&body)
        }
        Err(e) => {
            debug!("Could not decode robots.txt at {}: {}", url, e);
            ParsedRobots::allow_all()
        }
    }
}
