//! Cache-aside fetch layer
//!
//! Every remote call in the harvest goes through [`CacheAsideFetcher::fetch`].
//! The caller hands over the canonical identity of the call and a closure that
//! performs it; the fetcher answers from the store when it can and records
//! successful payloads when it cannot.

use crate::cache::traits::{CacheEntry, CacheStore};
use crate::url::RequestIdentity;
use crate::HarvestError;
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

/// A payload returned by the fetch layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Fetched {
    pub payload: String,
    pub from_cache: bool,
}

/// Snapshot of the fetcher counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FetchStats {
    /// Calls answered from the store
    pub hits: u64,

    /// Calls that went to the remote side
    pub misses: u64,

    /// Successful payloads written to the store
    pub stores: u64,

    /// Store reads or writes that failed and were skipped
    pub store_errors: u64,
}

/// Read-through/write-through cache in front of remote calls
///
/// The store is an explicit optional capability. Without one the fetcher is
/// a pass-through: every call reaches the remote side and nothing is kept.
pub struct CacheAsideFetcher {
    store: Option<Mutex<Box<dyn CacheStore>>>,
    hits: AtomicU64,
    misses: AtomicU64,
    stores: AtomicU64,
    store_errors: AtomicU64,
}

impl CacheAsideFetcher {
    /// Creates a fetcher over an optional store
    pub fn new(store: Option<Box<dyn CacheStore>>) -> Self {
        Self {
            store: store.map(Mutex::new),
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            stores: AtomicU64::new(0),
            store_errors: AtomicU64::new(0),
        }
    }

    /// Creates a fetcher that never caches
    pub fn pass_through() -> Self {
        Self::new(None)
    }

    /// Whether a store is attached
    pub fn is_caching(&self) -> bool {
        self.store.is_some()
    }

    /// Fetches the payload for `identity`, calling `perform_call` on a miss
    ///
    /// On a hit no remote call is made. On a miss, a successful payload is
    /// stored before being returned; a failed call is propagated and nothing
    /// is stored, so the next run retries it.
    ///
    /// Store failures never fail the fetch: a read error counts as a miss and
    /// a write error only loses the cache entry.
    pub async fn fetch<F, Fut>(
        &self,
        identity: &RequestIdentity,
        perform_call: F,
    ) -> Result<Fetched, HarvestError>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<String, HarvestError>>,
    {
        let Some(store) = &self.store else {
            self.misses.fetch_add(1, Ordering::Relaxed);
            let payload = perform_call().await?;
            return Ok(Fetched {
                payload,
                from_cache: false,
            });
        };

        if let Some(payload) = self.lookup(store, identity) {
            self.hits.fetch_add(1, Ordering::Relaxed);
            tracing::trace!("Cache hit: {}", identity);
            return Ok(Fetched {
                payload,
                from_cache: true,
            });
        }

        self.misses.fetch_add(1, Ordering::Relaxed);
        tracing::trace!("Cache miss: {}", identity);

        let payload = perform_call().await?;
        self.record(store, identity, &payload);

        Ok(Fetched {
            payload,
            from_cache: false,
        })
    }

    /// Returns the current counters
    pub fn stats(&self) -> FetchStats {
        FetchStats {
            hits: self.hits.load(Ordering::Relaxed),
            misses: self.misses.load(Ordering::Relaxed),
            stores: self.stores.load(Ordering::Relaxed),
            store_errors: self.store_errors.load(Ordering::Relaxed),
        }
    }

    fn lookup(
        &self,
        store: &Mutex<Box<dyn CacheStore>>,
        identity: &RequestIdentity,
    ) -> Option<String> {
        let guard = match store.lock() {
            Ok(guard) => guard,
            Err(e) => {
                self.store_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Cache lock poisoned on read: {}", e);
                return None;
            }
        };

        match guard.get(identity.as_str()) {
            Ok(Some(entry)) if entry.success => Some(entry.payload),
            Ok(_) => None,
            Err(e) => {
                self.store_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Cache read failed for {}: {}", identity, e);
                None
            }
        }
    }

    fn record(&self, store: &Mutex<Box<dyn CacheStore>>, identity: &RequestIdentity, payload: &str) {
        let mut guard = match store.lock() {
            Ok(guard) => guard,
            Err(e) => {
                self.store_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Cache lock poisoned on write: {}", e);
                return;
            }
        };

        match guard.put(identity.as_str(), &CacheEntry::success(payload)) {
            Ok(()) => {
                self.stores.fetch_add(1, Ordering::Relaxed);
            }
            Err(e) => {
                self.store_errors.fetch_add(1, Ordering::Relaxed);
                tracing::warn!("Cache write failed for {}: {}", identity, e);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::traits::{CacheError, CacheResult};
    use crate::cache::MemoryCache;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    fn identity(name: &str) -> RequestIdentity {
        RequestIdentity::builder("POST", "http://example.com/ac")
            .param("nom", name)
            .build()
    }

    /// A store whose every operation fails
    struct BrokenStore;

    impl CacheStore for BrokenStore {
        fn get(&self, key: &str) -> CacheResult<Option<CacheEntry>> {
            Err(CacheError::Unavailable(format!("cannot read {}", key)))
        }

        fn put(&mut self, key: &str, _entry: &CacheEntry) -> CacheResult<()> {
            Err(CacheError::Unavailable(format!("cannot write {}", key)))
        }

        fn len(&self) -> CacheResult<u64> {
            Ok(0)
        }

        fn name(&self) -> &str {
            "broken"
        }
    }

    #[tokio::test]
    async fn test_second_fetch_is_served_from_cache() {
        let fetcher = CacheAsideFetcher::new(Some(Box::new(MemoryCache::new())));
        let calls = Arc::new(AtomicUsize::new(0));

        let first = {
            let calls = calls.clone();
            fetcher
                .fetch(&identity("ab"), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("{\"d\":[\"abbott\"]}".to_string())
                })
                .await
                .unwrap()
        };
        let second = {
            let calls = calls.clone();
            fetcher
                .fetch(&identity("ab"), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("different".to_string())
                })
                .await
                .unwrap()
        };

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(!first.from_cache);
        assert!(second.from_cache);
        assert_eq!(first.payload, second.payload);

        let stats = fetcher.stats();
        assert_eq!(stats.hits, 1);
        assert_eq!(stats.misses, 1);
        assert_eq!(stats.stores, 1);
    }

    #[tokio::test]
    async fn test_failed_call_is_not_cached() {
        let fetcher = CacheAsideFetcher::new(Some(Box::new(MemoryCache::new())));

        let failed = fetcher
            .fetch(&identity("ab"), || async {
                Err(HarvestError::Timeout {
                    url: "http://example.com/ac".to_string(),
                })
            })
            .await;
        assert!(failed.is_err());

        let retried = fetcher
            .fetch(&identity("ab"), || async { Ok("ok".to_string()) })
            .await
            .unwrap();
        assert!(!retried.from_cache);
        assert_eq!(retried.payload, "ok");
        assert_eq!(fetcher.stats().stores, 1);
    }

    #[tokio::test]
    async fn test_pass_through_always_calls() {
        let fetcher = CacheAsideFetcher::pass_through();
        assert!(!fetcher.is_caching());

        let calls = Arc::new(AtomicUsize::new(0));
        for _ in 0..3 {
            let calls = calls.clone();
            let fetched = fetcher
                .fetch(&identity("ab"), || async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Ok("x".to_string())
                })
                .await
                .unwrap();
            assert!(!fetched.from_cache);
        }

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(fetcher.stats().misses, 3);
    }

    #[tokio::test]
    async fn test_broken_store_degrades_to_remote_calls() {
        let fetcher = CacheAsideFetcher::new(Some(Box::new(BrokenStore)));

        let fetched = fetcher
            .fetch(&identity("ab"), || async { Ok("payload".to_string()) })
            .await
            .unwrap();

        assert_eq!(fetched.payload, "payload");
        assert!(!fetched.from_cache);
        assert_eq!(fetcher.stats().store_errors, 2);
    }

    #[tokio::test]
    async fn test_unsuccessful_entry_is_a_miss() {
        let mut store = MemoryCache::new();
        let mut entry = CacheEntry::success("stale failure");
        entry.success = false;
        store.put(identity("ab").as_str(), &entry).unwrap();

        let fetcher = CacheAsideFetcher::new(Some(Box::new(store)));
        let fetched = fetcher
            .fetch(&identity("ab"), || async { Ok("fresh".to_string()) })
            .await
            .unwrap();

        assert!(!fetched.from_cache);
        assert_eq!(fetched.payload, "fresh");
    }
}
