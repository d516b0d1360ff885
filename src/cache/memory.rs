//! In-memory cache backend for tests and embedders that manage their own persistence

use crate::cache::traits::{CacheEntry, CacheResult, CacheStore};
use std::collections::HashMap;

/// HashMap-backed cache store; contents die with the process
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: HashMap<String, CacheEntry>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStore for MemoryCache {
    fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
        Ok(self.entries.get(key).cloned())
    }

    fn put(&mut self, key: &str, entry: &CacheEntry) -> CacheResult<()> {
        self.entries.insert(key.to_string(), entry.clone());
        Ok(())
    }

    fn len(&self) -> CacheResult<u64> {
        Ok(self.entries.len() as u64)
    }

    fn name(&self) -> &str {
        "memory"
    }
}
