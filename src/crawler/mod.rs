//! Crawler module for enumerating and harvesting the remote directory
//!
//! This module contains the core harvesting logic, including:
//! - HTTP transport with session handling and error classification
//! - Cached, rate-limited, retrying access to the directory
//! - Prefix expansion over the truncating autocomplete endpoint
//! - Search listing parsing, link deduplication and record extraction
//! - Overall run coordination with resumable stages

mod coordinator;
mod directory;
mod expander;
mod fetcher;
mod parser;
mod rate_limiter;
mod retry;
mod search;

#[cfg(test)]
pub(crate) mod testing;

pub use coordinator::{run_harvest, HarvestOptions, Harvester};
pub use directory::{parse_suggestions, RemoteDirectory};
pub use expander::{EnumerationAnomaly, ExpansionReport, PrefixExpander};
pub use fetcher::{build_http_client, HttpTransport, SiteEndpoints, Transport};
pub use parser::{extract_form_fields, parse_selector, resolve_link, EntryLink, ListingParser};
pub use rate_limiter::{DelayProfile, RateLimiter};
pub use retry::RetryPolicy;
pub use search::{CrawlReport, LinkReport, SearchCrawler};
