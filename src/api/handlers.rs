//! API Handlers
//!
//! HTTP request handlers for the admin endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    Json,
};
use tracing::info;

use crate::cache::ReadThroughCache;
use crate::error::{CacheError, Result};
use crate::models::{
    CacheStatsResponse, ClearResponse, DeleteResponse, HealthResponse, InvalidateRequest,
    InvalidateResponse,
};
use crate::queries::QueryMonitor;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    /// Shared read-through cache
    pub cache: Arc<ReadThroughCache>,
    /// Timings of the backend calls made on cache misses
    pub monitor: Arc<QueryMonitor>,
}

impl AppState {
    pub fn new(cache: Arc<ReadThroughCache>) -> Self {
        Self {
            cache,
            monitor: Arc::new(QueryMonitor::default()),
        }
    }

    /// Reports the monitor shared with a `CachedQueries`.
    pub fn with_monitor(mut self, monitor: Arc<QueryMonitor>) -> Self {
        self.monitor = monitor;
        self
    }

    /// State over the process-wide cache.
    pub fn global() -> Self {
        Self::new(crate::cache::global::shared())
    }
}

const SLOW_QUERY_REPORT_LIMIT: usize = 20;

/// Handler for GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::healthy())
}

/// Handler for GET /monitoring/cache
///
/// Returns counters, hit rate, a census of held entries, and backend
/// query timings.
pub async fn cache_stats_handler(State(state): State<AppState>) -> Json<CacheStatsResponse> {
    let stats = state.cache.stats();
    let census = state.cache.census();

    Json(CacheStatsResponse::new(&stats, census).with_queries(
        state.monitor.stats(),
        state.monitor.slow_queries(SLOW_QUERY_REPORT_LIMIT),
    ))
}

/// Handler for DELETE /cache/keys/:key
pub async fn delete_key_handler(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Json<DeleteResponse> {
    let removed = state.cache.delete(&key);
    info!(%key, removed, "Deleted cache key");

    Json(DeleteResponse::new(key, removed))
}

/// Handler for POST /cache/invalidate
///
/// Removes every entry under a non-empty prefix.
pub async fn invalidate_handler(
    State(state): State<AppState>,
    Json(req): Json<InvalidateRequest>,
) -> Result<Json<InvalidateResponse>> {
    if let Some(error_msg) = req.validate() {
        return Err(CacheError::InvalidRequest(error_msg));
    }

    let removed = state.cache.delete_by_prefix(&req.prefix);
    info!(prefix = %req.prefix, removed, "Invalidated cache prefix");

    Ok(Json(InvalidateResponse {
        prefix: req.prefix,
        removed,
    }))
}

/// Handler for DELETE /cache
pub async fn clear_handler(State(state): State<AppState>) -> Json<ClearResponse> {
    let removed = state.cache.clear();
    info!(removed, "Cleared cache");

    Json(ClearResponse { removed })
}
