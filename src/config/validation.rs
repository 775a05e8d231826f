use crate::config::types::{
    BookConfig, Config, CrawlerConfig, ExtractionConfig, OutputConfig, SearchConfig,
    UserAgentConfig,
};
use crate::ConfigError;
use regex::Regex;
use scraper::Selector;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_book_config(&config.book)?;
    validate_crawler_config(&config.crawler)?;
    validate_user_agent_config(&config.user_agent)?;
    validate_search_config(&config.search)?;
    validate_extraction_config(&config.extraction)?;
    validate_output_config(&config.output)?;
    Ok(())
}

/// Validates the book identity
fn validate_book_config(config: &BookConfig) -> Result<(), ConfigError> {
    if config.title.trim().is_empty() {
        return Err(ConfigError::Validation(
            "book title cannot be empty".to_string(),
        ));
    }

    if config.author.trim().is_empty() {
        return Err(ConfigError::Validation(
            "book author cannot be empty".to_string(),
        ));
    }

    if !config.isbn.is_empty() && !config.isbn.chars().all(|c| c.is_ascii_digit() || c == 'X')
    {
        return Err(ConfigError::Validation(format!(
            "isbn must contain only digits (and a trailing X), got '{}'",
            config.isbn
        )));
    }

    Ok(())
}

/// Validates crawler configuration
fn validate_crawler_config(config: &CrawlerConfig) -> Result<(), ConfigError> {
    if config.request_timeout < 1 || config.request_timeout > 300 {
        return Err(ConfigError::Validation(format!(
            "request_timeout must be between 1 and 300 seconds, got {}",
            config.request_timeout
        )));
    }

    if config.max_retries > 10 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be <= 10, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

/// Validates user agent configuration
fn validate_user_agent_config(config: &UserAgentConfig) -> Result<(), ConfigError> {
    if config.crawler_name.is_empty() {
        return Err(ConfigError::Validation(
            "crawler_name cannot be empty".to_string(),
        ));
    }

    // robots.txt product tokens are letters, digits, '-' and '_'
    if !config
        .crawler_name
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ConfigError::Validation(format!(
            "crawler_name must contain only alphanumeric characters, hyphens and underscores, got '{}'",
            config.crawler_name
        )));
    }

    Url::parse(&config.contact_url)
        .map_err(|e| ConfigError::InvalidUrl(format!("Invalid contact_url: {}", e)))?;

    Ok(())
}

/// Validates product-page discovery configuration
fn validate_search_config(config: &SearchConfig) -> Result<(), ConfigError> {
    if config.use_search_engine {
        let url = Url::parse(&config.search_engine_url).map_err(|e| {
            ConfigError::InvalidUrl(format!("Invalid search_engine_url: {}", e))
        })?;

        if url.scheme() != "http" && url.scheme() != "https" {
            return Err(ConfigError::InvalidUrl(format!(
                "search_engine_url must be HTTP(S), got '{}'",
                config.search_engine_url
            )));
        }
    }

    for path in config
        .known_paths
        .iter()
        .chain(std::iter::once(&config.fallback_search_path))
    {
        if !path.starts_with('/') {
            return Err(ConfigError::Validation(format!(
                "path '{}' must start with '/'",
                path
            )));
        }
    }

    Ok(())
}

/// Validates address extraction configuration
fn validate_extraction_config(config: &ExtractionConfig) -> Result<(), ConfigError> {
    let pattern = Regex::new(&config.postal_code_pattern).map_err(|e| {
        ConfigError::InvalidPattern(format!("postal_code_pattern does not compile: {}", e))
    })?;

    if pattern.captures_len() < 3 {
        return Err(ConfigError::InvalidPattern(
            "postal_code_pattern needs a digits group and a letters group".to_string(),
        ));
    }

    for selector in &config.address_selectors {
        Selector::parse(selector).map_err(|e| {
            ConfigError::InvalidPattern(format!("Invalid address selector '{}': {:?}", selector, e))
        })?;
    }

    if config.max_contact_pages > 20 {
        return Err(ConfigError::Validation(format!(
            "max_contact_pages must be <= 20, got {}",
            config.max_contact_pages
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.database_path.is_empty() {
        return Err(ConfigError::Validation(
            "database_path cannot be empty".to_string(),
        ));
    }

    if config.json_path.is_empty() {
        return Err(ConfigError::Validation(
            "json_path cannot be empty".to_string(),
        ));
    }

    Ok(())
}
