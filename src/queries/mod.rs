//! Queries Module
//!
//! Read paths of the operations platform wrapped in the read-through cache,
//! and the invalidation each write must perform.

pub mod backend;
mod cached;
pub mod invalidate;
pub mod monitor;

pub use backend::{Condition, ListQuery, Listing, OperationsBackend, Order, Record, Table};
pub use cached::{
    CachedQueries, DashboardMetrics, InventoryFilter, LeadFilter, Page, Pagination, Pipeline,
    PipelineCard, QuoteFilter, PIPELINE_STAGES,
};
pub use monitor::{QueryLog, QueryMonitor, QueryStats};
