//! Prefix-Harvest: exhaustive enumeration of a truncating directory search
//!
//! This crate discovers every entry of a remote directory that is only reachable
//! through a name-prefix autocomplete API capped at a fixed number of results,
//! then fetches and extracts one structured record per discovered entry. Every
//! remote call goes through a cache-aside layer so that runs are replay-safe and
//! resumable.

pub mod cache;
pub mod config;
pub mod crawler;
pub mod output;
pub mod record;
pub mod url;

use thiserror::Error;

/// Main error type for Prefix-Harvest operations
#[derive(Debug, Error)]
pub enum HarvestError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("HTTP error for {url}: {source}")]
    Http { url: String, source: reqwest::Error },

    #[error("Request timeout for {url}")]
    Timeout { url: String },

    #[error("HTTP {status} from {url}")]
    HttpStatus { url: String, status: u16 },

    #[error("Malformed payload from {endpoint}: {message}")]
    MalformedPayload { endpoint: String, message: String },

    #[error("HTTP client error: {0}")]
    Reqwest(#[from] reqwest::Error),

    #[error("HTML parse error for {url}: {message}")]
    HtmlParse { url: String, message: String },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl HarvestError {
    /// Returns true for transient I/O failures worth retrying
    ///
    /// Network errors, timeouts, HTTP 429/5xx and malformed autocomplete
    /// payloads are transient. Everything else fails the unit of work at once.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { .. } | Self::Timeout { .. } | Self::MalformedPayload { .. } => true,
            Self::HttpStatus { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),

    #[error("Invalid selector in config: {0}")]
    InvalidSelector(String),
}

/// URL-specific errors
#[derive(Debug, Error)]
pub enum UrlError {
    #[error("Failed to parse URL: {0}")]
    Parse(String),

    #[error("Invalid URL scheme: {0}")]
    InvalidScheme(String),

    #[error("Missing host in URL")]
    MissingHost,
}

pub use cache::{CacheError, CacheStore};
pub use config::Config;
pub use crawler::{Harvester, PrefixExpander, SearchCrawler};
pub use record::{Record, RecordExtractor};
