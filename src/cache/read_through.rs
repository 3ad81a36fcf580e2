//! Read-Through Cache Module
//!
//! Thread-safe front for [`CacheStore`]: memoizes async computations under a
//! key for a bounded time and collapses concurrent misses on one key into a
//! single computation.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::debug;

use crate::cache::inflight::InFlightTable;
use crate::cache::{CacheStats, CacheStore, Census};
use crate::error::{CacheError, Result};

// == Read-Through Cache ==
/// Shared memoization table.
///
/// Lookups and stores are synchronous map operations under a short-lived
/// lock; only the caller's computation suspends.
#[derive(Debug, Default)]
pub struct ReadThroughCache {
    store: Mutex<CacheStore>,
    inflight: InFlightTable,
}

impl ReadThroughCache {
    // == Constructor ==
    pub fn new() -> Self {
        Self {
            store: Mutex::new(CacheStore::new()),
            inflight: InFlightTable::new(),
        }
    }

    // == Cached ==
    /// Returns the live value under `key`, or runs `compute`, stores its
    /// result for `ttl`, and returns it.
    ///
    /// `compute` is not invoked on a hit. If it fails, the error is returned
    /// unchanged and nothing is stored. Concurrent callers missing on the same
    /// key wait for the first one's computation instead of running their own.
    ///
    /// # Errors
    /// An empty `key` or zero `ttl` is rejected before `compute` runs.
    pub async fn cached<T, E, F, Fut>(
        &self,
        key: impl Into<String>,
        ttl: Duration,
        compute: F,
    ) -> std::result::Result<Arc<T>, E>
    where
        T: Send + Sync + 'static,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let key = key.into();
        validate(&key, ttl)?;

        let hit = self.store.lock().get::<T>(&key);
        if let Some(value) = hit {
            debug!(key = %key, "cache hit");
            return Ok(value);
        }

        let slot = self.inflight.acquire(&key);
        let _permit = slot.enter().await;

        // Another caller may have filled the key while we queued.
        let filled = self.store.lock().peek::<T>(&key);
        if let Some(value) = filled {
            self.store.lock().stats_mut().record_coalesced();
            debug!(key = %key, "cache filled by concurrent load");
            return Ok(value);
        }

        debug!(key = %key, "cache miss, computing");
        match compute().await {
            Ok(value) => {
                let value = Arc::new(value);
                let mut store = self.store.lock();
                store.stats_mut().record_load();
                if slot.was_invalidated() {
                    debug!(key = %key, "key invalidated during load, result not stored");
                } else {
                    store.insert(key, Arc::clone(&value), ttl);
                }
                Ok(value)
            }
            Err(err) => {
                self.store.lock().stats_mut().record_load_failure();
                debug!(key = %key, "load failed, nothing cached");
                Err(err)
            }
        }
    }

    /// [`ReadThroughCache::cached`] with the TTL given in whole seconds.
    pub async fn cached_secs<T, E, F, Fut>(
        &self,
        key: impl Into<String>,
        ttl_seconds: u64,
        compute: F,
    ) -> std::result::Result<Arc<T>, E>
    where
        T: Send + Sync + 'static,
        E: From<CacheError>,
        F: FnOnce() -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        self.cached(key, Duration::from_secs(ttl_seconds), compute)
            .await
    }

    // == Get ==
    /// Returns the live value under `key` without computing anything.
    pub fn get<T>(&self, key: &str) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.store.lock().get::<T>(key)
    }

    // == Insert ==
    /// Stores `value` under `key` directly, replacing any previous entry.
    pub fn insert<T>(&self, key: impl Into<String>, ttl: Duration, value: T) -> Result<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let key = key.into();
        validate(&key, ttl)?;

        let value = Arc::new(value);
        self.store.lock().insert(key, Arc::clone(&value), ttl);
        Ok(value)
    }

    // == Delete ==
    /// Removes one entry. Returns whether it was present.
    pub fn delete(&self, key: &str) -> bool {
        self.inflight.invalidate(key);
        let removed = self.store.lock().delete(key);
        debug!(key, removed, "cache delete");
        removed
    }

    // == Delete By Prefix ==
    /// Removes every entry whose key starts with `prefix`. Returns the count.
    pub fn delete_by_prefix(&self, prefix: &str) -> usize {
        self.inflight.invalidate_prefix(prefix);
        let removed = self.store.lock().delete_by_prefix(prefix);
        debug!(prefix, removed, "cache prefix delete");
        removed
    }

    // == Clear ==
    /// Removes every entry. Returns the count.
    pub fn clear(&self) -> usize {
        self.inflight.invalidate_all();
        self.store.lock().clear()
    }

    // == Reset ==
    /// Removes every entry and zeroes the statistics.
    pub fn reset(&self) {
        self.inflight.invalidate_all();
        self.store.lock().reset();
    }

    /// Removes expired entries. Reads never depend on this having run.
    pub fn cleanup_expired(&self) -> usize {
        self.store.lock().cleanup_expired()
    }

    pub fn stats(&self) -> CacheStats {
        self.store.lock().stats()
    }

    pub fn census(&self) -> Census {
        self.store.lock().census()
    }

    pub fn len(&self) -> usize {
        self.store.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.lock().is_empty()
    }

    /// Number of keys with a computation currently underway or queued.
    pub fn in_flight(&self) -> usize {
        self.inflight.len()
    }
}

fn validate(key: &str, ttl: Duration) -> Result<()> {
    if key.is_empty() {
        return Err(CacheError::InvalidKey("key must not be empty".to_string()));
    }
    if ttl.is_zero() {
        return Err(CacheError::InvalidTtl(format!(
            "ttl must be positive for key '{}'",
            key
        )));
    }
    Ok(())
}
