//! Cache Statistics Module
//!
//! Tracks read-through behaviour: hits, misses, loads, and invalidations.

use serde::Serialize;

// == Cache Stats ==
/// Counters describing how the cache has been used since start or reset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CacheStats {
    /// Lookups answered from a live entry
    pub hits: u64,
    /// Lookups that found nothing usable
    pub misses: u64,
    /// Successful computations stored or returned on a miss
    pub loads: u64,
    /// Computations that failed (nothing stored)
    pub load_failures: u64,
    /// Callers served by another caller's in-flight computation
    pub coalesced: u64,
    /// Entries removed by delete, prefix delete, or clear
    pub invalidations: u64,
    /// Entries dropped because their TTL elapsed
    pub expirations: u64,
    /// Lookups that found a value of a different type under the key
    pub collisions: u64,
    /// Current number of entries in the cache
    pub total_entries: usize,
}

impl CacheStats {
    // == Constructor ==
    /// Creates a new CacheStats with all counters at zero.
    pub fn new() -> Self {
        Self::default()
    }

    // == Hit Rate ==
    /// Calculates the cache hit rate.
    ///
    /// Returns hits / (hits + misses), or 0.0 if no lookups have been made.
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            self.hits as f64 / total as f64
        }
    }

    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    pub fn record_load(&mut self) {
        self.loads += 1;
    }

    pub fn record_load_failure(&mut self) {
        self.load_failures += 1;
    }

    pub fn record_coalesced(&mut self) {
        self.coalesced += 1;
    }

    pub fn record_invalidations(&mut self, count: usize) {
        self.invalidations += count as u64;
    }

    pub fn record_expirations(&mut self, count: usize) {
        self.expirations += count as u64;
    }

    pub fn record_collision(&mut self) {
        self.collisions += 1;
    }

    // == Update Entry Count ==
    /// Updates the total entries count.
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
