//! Dutch postal code and city parsing over plain text

use crate::config::ExtractionConfig;
use crate::ConfigError;
use regex::{Regex, RegexBuilder};

/// Characters of context after a postal code searched for the city
const AFTER_WINDOW: usize = 20;

/// Characters of context before a postal code searched for the city
const BEFORE_WINDOW: usize = 100;

/// Maximum number of words in a city name taken from before the postal code
const MAX_CITY_WORDS: usize = 3;

/// A postal code found in text, with the city next to it when one could be derived
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PostalMatch {
    /// Canonical form `NNNN LL`
    pub postal_code: String,
    pub city: Option<String>,
}

/// Finds postal codes in text and derives the adjacent city name
///
/// The pattern must have two capture groups: the digits and the letters. It is
/// always matched case-insensitively.
#[derive(Debug, Clone)]
pub struct PostalCodeParser {
    pattern: Regex,
    city_exclude: Vec<String>,
}

impl PostalCodeParser {
    /// Compiles a parser from a pattern and a city exclude-list
    pub fn new(pattern: &str, city_exclude: &[String]) -> Result<Self, ConfigError> {
        let pattern = RegexBuilder::new(pattern)
            .case_insensitive(true)
            .build()
            .map_err(|e| ConfigError::InvalidPattern(e.to_string()))?;
        if pattern.captures_len() < 3 {
            return Err(ConfigError::InvalidPattern(
                "postal code pattern needs two capture groups".to_string(),
            ));
        }

        Ok(Self {
            pattern,
            city_exclude: city_exclude.to_vec(),
        })
    }

    /// Compiles the parser configured in `[extraction]`
    pub fn from_config(config: &ExtractionConfig) -> Result<Self, ConfigError> {
        Self::new(&config.postal_code_pattern, &config.city_exclude)
    }

    /// Normalizes a postal code to `NNNN LL`; None if `raw` is not a postal code
    ///
    /// # Example
    ///
    /// ```
    /// use bookstore_finder::config::ExtractionConfig;
    /// use bookstore_finder::extractor::PostalCodeParser;
    ///
    /// let parser = PostalCodeParser::from_config(&ExtractionConfig::default()).unwrap();
    /// assert_eq!(parser.normalize("1012ab").as_deref(), Some("1012 AB"));
    /// assert_eq!(parser.normalize("0012 AB"), None);
    /// ```
    pub fn normalize(&self, raw: &str) -> Option<String> {
        let raw = raw.trim();
        let caps = self.pattern.captures(raw)?;
        let whole = caps.get(0)?;
        if whole.start() != 0 || whole.end() != raw.len() {
            return None;
        }
        Some(format_code(caps.get(1)?.as_str(), caps.get(2)?.as_str()))
    }

    /// Returns the first postal code in `text`, with its city if one can be derived
    ///
    /// Later postal codes in the same text are ignored even if the first one has no
    /// city.
    pub fn find(&self, text: &str) -> Option<PostalMatch> {
        let caps = self.pattern.captures(text)?;
        let whole = caps.get(0)?;
        let postal_code = format_code(caps.get(1)?.as_str(), caps.get(2)?.as_str());

        let city = self
            .city_after(&text[whole.end()..])
            .or_else(|| self.city_before(&text[..whole.start()]));

        Some(PostalMatch { postal_code, city })
    }

    /// City written right after the code, as in `1234 AB Amsterdam`
    fn city_after(&self, after: &str) -> Option<String> {
        let window: String = after.chars().take(AFTER_WINDOW).collect();
        let candidate = window.split_whitespace().next()?.trim_matches(strip_punctuation);
        self.is_valid_city(candidate).then(|| candidate.to_string())
    }

    /// City written before the street, as in `Amsterdam, Straat 1, 1234 AB`
    ///
    /// Walks the comma/newline separated segments backwards and takes the trailing
    /// run of capitalized words of the first segment that ends in one.
    fn city_before(&self, before: &str) -> Option<String> {
        let start = before
            .char_indices()
            .rev()
            .nth(BEFORE_WINDOW - 1)
            .map_or(0, |(i, _)| i);
        let window = &before[start..];

        for segment in window.rsplit(|c: char| c == ',' || c == '\n' || c == '\r') {
            let mut words: Vec<&str> = Vec::new();
            for word in segment.split_whitespace().rev() {
                let word = word.trim_matches(strip_punctuation);
                if words.len() == MAX_CITY_WORDS || !is_capitalized_word(word) {
                    break;
                }
                words.push(word);
            }
            if words.is_empty() {
                continue;
            }

            words.reverse();
            let city = words.join(" ");
            if self.is_valid_city(&city) {
                return Some(city);
            }
        }

        None
    }

    /// City-name check: at least 3 characters, capitalized, no excluded word in it
    pub fn is_valid_city(&self, name: &str) -> bool {
        name.chars().count() >= 3
            && name.chars().next().map_or(false, char::is_uppercase)
            && !name.split_whitespace().any(|part| {
                self.city_exclude
                    .iter()
                    .any(|word| word.eq_ignore_ascii_case(part))
            })
    }
}

fn format_code(digits: &str, letters: &str) -> String {
    format!("{} {}", digits, letters.to_uppercase())
}

fn strip_punctuation(c: char) -> bool {
    matches!(c, '.' | ',' | ';' | ':')
}

fn is_capitalized_word(word: &str) -> bool {
    word.chars().count() > 2 && word.chars().next().map_or(false, char::is_uppercase)
}
