//! Horsebox Cache - read-through caching for the operations platform
//!
//! Wraps expensive reads in a TTL cache with single-flight loading and
//! prefix invalidation, and serves a small admin API over it.

pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod models;
pub mod queries;
pub mod tasks;

pub use api::AppState;
pub use cache::{CacheKey, ReadThroughCache, TtlPolicy, TtlTier};
pub use config::Config;
pub use error::{CacheError, QueryError};
pub use queries::{CachedQueries, OperationsBackend};
pub use tasks::{spawn_cleanup_task, spawn_warmup_task, CacheWarmer};
