//! Cache Module
//!
//! In-process read-through caching with TTL expiration and prefix invalidation.

mod entry;
pub mod global;
mod inflight;
pub mod keys;
mod read_through;
mod stats;
mod store;
mod ttl;


// Re-export public types
pub use entry::CacheEntry;
pub use keys::CacheKey;
pub use read_through::ReadThroughCache;
pub use stats::CacheStats;
pub use store::{CacheStore, Census};
pub use ttl::{TtlPolicy, TtlTier, MAX_TTL};
