//! Process-wide cache instance
//!
//! Request handlers reach the shared table through these functions instead
//! of threading a handle through every call site. `init` installs a
//! specific instance before first use; otherwise one is created lazily.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use once_cell::sync::OnceCell;

use crate::cache::{CacheStats, ReadThroughCache};
use crate::error::{CacheError, Result};

static GLOBAL: OnceCell<Arc<ReadThroughCache>> = OnceCell::new();

/// Installs `cache` as the process-wide instance.
///
/// # Errors
/// Returns [`CacheError::AlreadyInitialized`] if an instance is already in
/// place, including one created lazily by an earlier call.
pub fn init(cache: ReadThroughCache) -> Result<Arc<ReadThroughCache>> {
    let cache = Arc::new(cache);
    GLOBAL
        .set(Arc::clone(&cache))
        .map_err(|_| CacheError::AlreadyInitialized)?;
    Ok(cache)
}

/// Returns the process-wide instance, creating it on first use.
pub fn instance() -> &'static ReadThroughCache {
    shared_ref()
}

/// Returns a counted handle to the process-wide instance.
pub fn shared() -> Arc<ReadThroughCache> {
    Arc::clone(shared_ref())
}

fn shared_ref() -> &'static Arc<ReadThroughCache> {
    GLOBAL.get_or_init(|| Arc::new(ReadThroughCache::new()))
}

/// [`ReadThroughCache::cached`] on the process-wide instance.
pub async fn cached<T, E, F, Fut>(
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
    instance().cached(key, ttl, compute).await
}

pub fn delete(key: &str) -> bool {
    instance().delete(key)
}

pub fn delete_by_prefix(prefix: &str) -> usize {
    instance().delete_by_prefix(prefix)
}

/// Clears entries and statistics, for isolation between tests.
pub fn reset() {
    instance().reset()
}

pub fn stats() -> CacheStats {
    instance().stats()
}
