//! Cache store traits and error types
//!
//! This module defines the trait interface for response cache backends and
//! the entry type they hold.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Errors that can occur during cache operations
#[derive(Debug, Error)]
pub enum CacheError {
    #[error("Cache backend unavailable: {0}")]
    Unavailable(String),

    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Corrupt cache entry for {key}: {message}")]
    Corrupt { key: String, message: String },
}

/// Result type for cache operations
pub type CacheResult<T> = Result<T, CacheError>;

/// A cached response payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    /// Raw response body
    pub payload: String,

    /// Whether the call that produced the payload succeeded
    pub success: bool,

    /// When the payload was fetched
    pub fetched_at: DateTime<Utc>,
}

impl CacheEntry {
    /// Creates an entry for a successful call fetched now
    pub fn success(payload: impl Into<String>) -> Self {
        Self {
            payload: payload.into(),
            success: true,
            fetched_at: Utc::now(),
        }
    }
}

/// Trait for response cache backends
///
/// Keys are canonical request identities. `get` distinguishes a miss (`None`)
/// from a present but empty payload. Freshness is the backend's concern; the
/// fetch layer never expires entries.
pub trait CacheStore: Send {
    /// Looks up an entry
    fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>>;

    /// Inserts or replaces an entry
    fn put(&mut self, key: &str, entry: &CacheEntry) -> CacheResult<()>;

    /// Number of stored entries
    fn len(&self) -> CacheResult<u64>;

    /// Whether the store holds no entries
    fn is_empty(&self) -> CacheResult<bool> {
        Ok(self.len()? == 0)
    }

    /// Human-readable backend name for logs
    fn name(&self) -> &str;
}
