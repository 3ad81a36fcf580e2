//! Cache Entry Module
//!
//! Defines the structure for individual cache entries with TTL support.

use std::any::{type_name, Any};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::cache::ttl::MAX_TTL;

// == Cache Entry ==
/// A memoized result together with its lifetime.
///
/// The value is type-erased so one table can hold the results of every
/// wrapped read; callers recover it with [`CacheEntry::downcast`].
#[derive(Clone)]
pub struct CacheEntry {
    /// The stored value
    value: Arc<dyn Any + Send + Sync>,
    /// Name of the stored type, kept for collision diagnostics
    type_name: &'static str,
    /// When the entry was stored
    pub created_at: Instant,
    /// Instant from which the entry is stale
    pub expires_at: Instant,
}

impl CacheEntry {
    // == Constructor ==
    /// Creates a new cache entry that expires `ttl` from now, with `ttl`
    /// clamped to [`MAX_TTL`].
    pub fn new<T>(value: Arc<T>, ttl: Duration) -> Self
    where
        T: Send + Sync + 'static,
    {
        let now = Instant::now();
        Self {
            value,
            type_name: type_name::<T>(),
            created_at: now,
            expires_at: now + ttl.min(MAX_TTL),
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// Boundary condition: an entry is expired once the current time is
    /// greater than or equal to the expiration time, so a value is never
    /// served for any instant past its full TTL.
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Instant::now())
    }

    /// Same as [`CacheEntry::is_expired`] against a caller-supplied clock reading.
    pub fn is_expired_at(&self, now: Instant) -> bool {
        now >= self.expires_at
    }

    // == Time To Live ==
    /// Returns the remaining lifetime, zero once expired.
    pub fn ttl_remaining(&self) -> Duration {
        self.expires_at.saturating_duration_since(Instant::now())
    }

    // == Downcast ==
    /// Returns the stored value if it is a `T`.
    pub fn downcast<T>(&self) -> Option<Arc<T>>
    where
        T: Send + Sync + 'static,
    {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    /// Name of the stored value's type.
    pub fn type_name(&self) -> &'static str {
        self.type_name
    }
}

impl fmt::Debug for CacheEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheEntry")
            .field("type_name", &self.type_name)
            .field("created_at", &self.created_at)
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_entry_not_expired_within_ttl() {
        let entry = CacheEntry::new(Arc::new("rows".to_string()), Duration::from_secs(60));

        assert!(!entry.is_expired());
        tokio::time::advance(Duration::from_secs(59)).await;
        assert!(!entry.is_expired());
    }

    #[tokio::test(start_paused = true)]
    async fn test_entry_expiration() {
        let entry = CacheEntry::new(Arc::new(1u32), Duration::from_secs(1));

        tokio::time::advance(Duration::from_millis(1100)).await;

        assert!(entry.is_expired());
        assert_eq!(entry.ttl_remaining(), Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_expiration_boundary_condition() {
        let entry = CacheEntry::new(Arc::new(1u32), Duration::from_secs(10));

        assert!(!entry.is_expired_at(entry.expires_at - Duration::from_millis(1)));
        assert!(entry.is_expired_at(entry.expires_at), "Entry should be expired at boundary");
    }

    #[tokio::test(start_paused = true)]
    async fn test_ttl_remaining() {
        let entry = CacheEntry::new(Arc::new(1u32), Duration::from_secs(10));

        tokio::time::advance(Duration::from_secs(4)).await;
        assert_eq!(entry.ttl_remaining(), Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_oversized_ttl_is_clamped() {
        let entry = CacheEntry::new(Arc::new(1u32), Duration::from_secs(u64::MAX));

        assert_eq!(entry.ttl_remaining(), MAX_TTL);
        assert!(!entry.is_expired());
    }

    #[test]
    fn test_downcast_same_type_shares_allocation() {
        let rows = Arc::new(vec![1u32, 2, 3]);
        let entry = CacheEntry::new(Arc::clone(&rows), Duration::from_secs(60));

        let recovered = entry.downcast::<Vec<u32>>().unwrap();
        assert!(Arc::ptr_eq(&rows, &recovered));
    }

    #[test]
    fn test_downcast_wrong_type() {
        let entry = CacheEntry::new(Arc::new(vec![1u32]), Duration::from_secs(60));

        assert!(entry.downcast::<String>().is_none());
        assert_eq!(entry.type_name(), type_name::<Vec<u32>>());
    }
}
