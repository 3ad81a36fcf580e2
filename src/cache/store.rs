//! Cache Store Module
//!
//! Single-threaded entry table with lazy TTL expiry and prefix invalidation.
//! [`ReadThroughCache`](crate::cache::ReadThroughCache) wraps it in a lock.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::warn;

use crate::cache::{CacheEntry, CacheStats};

// == Cache Store ==
/// Key to entry table plus usage counters.
#[derive(Debug, Default)]
pub struct CacheStore {
    /// Key-value storage
    entries: HashMap<String, CacheEntry>,
    /// Usage statistics
    stats: CacheStats,
}

/// Live and stale entry counts at one instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Census {
    pub active: usize,
    pub expired: usize,
}

impl CacheStore {
    // == Constructor ==
    pub fn new() -> Self {
        Self::default()
    }

    // == Get ==
    /// Looks a key up and records the outcome as a hit or a miss.
    ///
    /// Expired entries are removed here. An entry holding a different type
    /// than `T` means two queries built the same key: it is dropped so that
    /// the caller recomputes and replaces it.
    pub fn get<T>(&mut self, key: &str) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let found = self.lookup::<T>(key);
        match found {
            Some(_) => self.stats.record_hit(),
            None => self.stats.record_miss(),
        }
        found
    }

    // == Peek ==
    /// Same as [`CacheStore::get`] without touching the hit/miss counters.
    pub fn peek<T>(&mut self, key: &str) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        self.lookup::<T>(key)
    }

    fn lookup<T>(&mut self, key: &str) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        let entry = self.entries.get(key)?;

        if entry.is_expired() {
            self.entries.remove(key);
            self.stats.record_expirations(1);
            self.stats.set_total_entries(self.entries.len());
            return None;
        }

        match entry.downcast::<T>() {
            Some(value) => Some(value),
            None => {
                warn!(
                    key,
                    stored = entry.type_name(),
                    requested = std::any::type_name::<T>(),
                    "Cache key collision: stored value has a different type"
                );
                self.entries.remove(key);
                self.stats.record_collision();
                self.stats.set_total_entries(self.entries.len());
                None
            }
        }
    }

    // == Insert ==
    /// Stores a value under `key`, replacing any previous entry and resetting its TTL.
    pub fn insert<T>(&mut self, key: String, value: Arc<T>, ttl: Duration)
    where
        T: Send + Sync + 'static,
    {
        self.entries.insert(key, CacheEntry::new(value, ttl));
        self.stats.set_total_entries(self.entries.len());
    }

    // == Delete ==
    /// Removes an entry by key. Returns whether one was present.
    pub fn delete(&mut self, key: &str) -> bool {
        let removed = self.entries.remove(key).is_some();
        if removed {
            self.stats.record_invalidations(1);
            self.stats.set_total_entries(self.entries.len());
        }
        removed
    }

    // == Delete By Prefix ==
    /// Removes every entry whose key starts with `prefix`.
    ///
    /// Returns the number of entries removed.
    pub fn delete_by_prefix(&mut self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|key, _| !key.starts_with(prefix));
        let removed = before - self.entries.len();

        self.stats.record_invalidations(removed);
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    // == Clear ==
    /// Removes every entry. Returns the number removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.entries.len();
        self.entries.clear();
        self.stats.record_invalidations(removed);
        self.stats.set_total_entries(0);
        removed
    }

    // == Reset ==
    /// Removes every entry and zeroes the counters.
    pub fn reset(&mut self) {
        self.entries.clear();
        self.stats = CacheStats::new();
    }

    // == Cleanup Expired ==
    /// Removes all expired entries from the cache.
    ///
    /// Returns the number of entries removed.
    pub fn cleanup_expired(&mut self) -> usize {
        let now = Instant::now();
        let before = self.entries.len();
        self.entries.retain(|_, entry| !entry.is_expired_at(now));
        let removed = before - self.entries.len();

        self.stats.record_expirations(removed);
        self.stats.set_total_entries(self.entries.len());
        removed
    }

    // == Census ==
    /// Counts live and stale entries without removing anything.
    pub fn census(&self) -> Census {
        let now = Instant::now();
        let expired = self
            .entries
            .values()
            .filter(|entry| entry.is_expired_at(now))
            .count();

        Census {
            active: self.entries.len() - expired,
            expired,
        }
    }

    // == Stats ==
    /// Returns current cache statistics.
    pub fn stats(&self) -> CacheStats {
        let mut stats = self.stats.clone();
        stats.set_total_entries(self.entries.len());
        stats
    }

    pub(crate) fn stats_mut(&mut self) -> &mut CacheStats {
        &mut self.stats
    }

    /// Returns true if an entry (live or stale) is stored under `key`.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    // == Length ==
    /// Returns the current number of entries, including stale ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    // == Is Empty ==
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
