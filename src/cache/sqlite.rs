//! SQLite cache implementation
//!
//! This module provides a SQLite-backed implementation of the CacheStore trait.
//! The database file outlives the process, which is what makes a harvest
//! resumable: a restarted run replays every completed call from disk.

use crate::cache::schema::initialize_schema;
use crate::cache::traits::{CacheEntry, CacheError, CacheResult, CacheStore};
use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, OptionalExtension};
use std::collections::BTreeMap;
use std::path::Path;

/// SQLite cache backend
pub struct SqliteCache {
    conn: Connection,
}

/// Aggregate view of a cache database
#[derive(Debug, Clone, Default)]
pub struct CacheSummary {
    /// Total number of entries
    pub entries: u64,

    /// Entry count per `METHOD endpoint` (query strings stripped)
    pub by_endpoint: BTreeMap<String, u64>,

    /// Oldest fetch timestamp
    pub oldest: Option<String>,

    /// Newest fetch timestamp
    pub newest: Option<String>,
}

impl SqliteCache {
    /// Opens or creates a cache database
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteCache)` - Successfully opened/created database
    /// * `Err(CacheError)` - Failed to open database
    pub fn new(path: &Path) -> CacheResult<Self> {
        let conn = Connection::open(path)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database
    pub fn new_in_memory() -> CacheResult<Self> {
        let conn = Connection::open_in_memory()?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    /// Summarizes the cache contents
    pub fn summary(&self) -> CacheResult<CacheSummary> {
        let mut summary = CacheSummary {
            entries: self.len()?,
            ..CacheSummary::default()
        };

        let (oldest, newest): (Option<String>, Option<String>) = self.conn.query_row(
            "SELECT MIN(fetched_at), MAX(fetched_at) FROM responses",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;
        summary.oldest = oldest;
        summary.newest = newest;

        let mut stmt = self.conn.prepare("SELECT identity FROM responses")?;
        let rows = stmt.query_map([], |row| row.get::<_, String>(0))?;
        for row in rows {
            let identity = row?;
            *summary.by_endpoint.entry(endpoint_group(&identity)).or_insert(0) += 1;
        }

        Ok(summary)
    }
}

/// Reduces an identity to `METHOD endpoint` without query string
fn endpoint_group(identity: &str) -> String {
    let mut parts = identity.split(' ');
    let method = parts.next().unwrap_or_default();
    let endpoint = parts.next().unwrap_or_default();
    let endpoint = endpoint.split('?').next().unwrap_or_default();
    format!("{} {}", method, endpoint)
}

impl CacheStore for SqliteCache {
    fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        let row: Option<(String, i64, String)> = self
            .conn
            .query_row(
                "SELECT payload, success, fetched_at FROM responses WHERE identity = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((payload, success, fetched_at)) = row else {
            return Ok(None);
        };

        let fetched_at = fetched_at
            .parse::<DateTime<Utc>>()
            .map_err(|e| CacheError::Corrupt {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        Ok(Some(CacheEntry {
            payload,
            success: success != 0,
            fetched_at,
        }))
    }

    fn put(&mut self, key: &str, entry: &CacheEntry) -> CacheResult<()> {
        self.conn.execute(
            "INSERT OR REPLACE INTO responses (identity, payload, success, fetched_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                key,
                entry.payload,
                entry.success as i64,
                entry.fetched_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }

    fn len(&self) -> CacheResult<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM responses", [], |row| row.get(0))?;
        Ok(count as u64)
    }

    fn name(&self) -> &str {
        "sqlite"
    }
}
