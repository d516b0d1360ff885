//! Response cache for remote calls
//!
//! This module handles:
//! - The `CacheStore` backend interface (SQLite on disk, in-memory)
//! - The cache-aside fetch layer every remote call goes through
//! - Opening the configured store, degrading to pass-through when it is unavailable

mod fetcher;
mod memory;
mod schema;
mod sqlite;
mod traits;

pub use fetcher::{CacheAsideFetcher, FetchStats, Fetched};
pub use memory::MemoryCache;
pub use sqlite::{CacheSummary, SqliteCache};
pub use traits::{CacheEntry, CacheError, CacheResult, CacheStore};

use crate::config::CacheConfig;
use std::path::Path;

/// Opens the configured cache store
///
/// A store that cannot be opened is not an error: the harvest continues
/// without caching, and the condition is reported once here.
///
/// # Returns
///
/// * `Some(store)` - The cache is enabled and the database opened
/// * `None` - The cache is disabled or unavailable
pub fn open_cache(config: &CacheConfig) -> Option<Box<dyn CacheStore>> {
    if !config.enabled {
        tracing::info!("Response cache disabled by configuration");
        return None;
    }

    match SqliteCache::new(Path::new(&config.database_path)) {
        Ok(cache) => {
            match cache.len() {
                Ok(entries) => tracing::info!(
                    "Response cache opened at {} ({} entries)",
                    config.database_path,
                    entries
                ),
                Err(e) => tracing::debug!("Could not count cache entries: {}", e),
            }
            Some(Box::new(cache))
        }
        Err(e) => {
            tracing::warn!(
                "Response cache at {} unavailable, continuing without caching: {}",
                config.database_path,
                e
            );
            None
        }
    }
}
