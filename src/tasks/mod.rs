//! Background Tasks Module
//!
//! Contains background tasks that run periodically during server operation.
//!
//! # Tasks
//! - TTL Cleanup: Removes expired cache entries at configured intervals
//! - Cache Warmup: Pre-loads critical reads at start and on a schedule

mod cleanup;
mod warmup;

pub use cleanup::spawn_cleanup_task;
pub use warmup::{spawn_warmup_task, CacheWarmer, WarmupOutcome, WarmupPriority, WarmupTask};
