//! Response DTOs for the admin API
//!
//! Defines the structure of outgoing HTTP response bodies.

use serde::Serialize;

use crate::cache::{CacheStats, Census};
use crate::queries::{QueryLog, QueryStats};

/// Response body for the monitoring endpoint (GET /monitoring/cache)
#[derive(Debug, Clone, Serialize)]
pub struct CacheStatsResponse {
    pub hits: u64,
    pub misses: u64,
    pub loads: u64,
    pub load_failures: u64,
    pub coalesced: u64,
    pub invalidations: u64,
    pub expirations: u64,
    pub collisions: u64,
    /// Hit rate (hits / (hits + misses))
    pub hit_rate: f64,
    /// Entries held, including ones past their TTL not yet swept
    pub total: usize,
    pub active: usize,
    pub expired: usize,
    /// Percentage of held entries that are still live
    pub efficiency: f64,
    /// Backend calls made on cache misses
    pub queries: QueryStats,
    /// Slowest calls above the threshold, slowest first
    pub slow_queries: Vec<QueryLog>,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl CacheStatsResponse {
    pub fn new(stats: &CacheStats, census: Census) -> Self {
        let total = census.active + census.expired;
        Self {
            hits: stats.hits,
            misses: stats.misses,
            loads: stats.loads,
            load_failures: stats.load_failures,
            coalesced: stats.coalesced,
            invalidations: stats.invalidations,
            expirations: stats.expirations,
            collisions: stats.collisions,
            hit_rate: stats.hit_rate(),
            total,
            active: census.active,
            expired: census.expired,
            efficiency: census.active as f64 / total.max(1) as f64 * 100.0,
            queries: QueryStats::default(),
            slow_queries: Vec::new(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }

    pub fn with_queries(mut self, queries: QueryStats, slow_queries: Vec<QueryLog>) -> Self {
        self.queries = queries;
        self.slow_queries = slow_queries;
        self
    }
}

/// Response body for single-key deletion (DELETE /cache/keys/:key)
#[derive(Debug, Clone, Serialize)]
pub struct DeleteResponse {
    pub key: String,
    /// Whether an entry was present
    pub removed: bool,
}

impl DeleteResponse {
    pub fn new(key: impl Into<String>, removed: bool) -> Self {
        Self {
            key: key.into(),
            removed,
        }
    }
}

/// Response body for prefix invalidation (POST /cache/invalidate)
#[derive(Debug, Clone, Serialize)]
pub struct InvalidateResponse {
    pub prefix: String,
    /// Number of entries removed
    pub removed: usize,
}

/// Response body for clearing the cache (DELETE /cache)
#[derive(Debug, Clone, Serialize)]
pub struct ClearResponse {
    pub removed: usize,
}

/// Response body for the health endpoint (GET /health)
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Health status (e.g., "healthy")
    pub status: String,
    /// Current timestamp in ISO 8601 format
    pub timestamp: String,
}

impl HealthResponse {
    /// Creates a new HealthResponse with current timestamp
    pub fn healthy() -> Self {
        Self {
            status: "healthy".to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// Error response body for all error conditions
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    /// Error message describing what went wrong
    pub error: String,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats_response_efficiency() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..CacheStats::default()
        };
        let resp = CacheStatsResponse::new(
            &stats,
            Census {
                active: 3,
                expired: 1,
            },
        );

        assert!((resp.hit_rate - 0.8).abs() < 0.001);
        assert_eq!(resp.total, 4);
        assert!((resp.efficiency - 75.0).abs() < 0.001);
    }

    #[test]
    fn test_stats_response_empty_cache() {
        let resp = CacheStatsResponse::new(
            &CacheStats::default(),
            Census {
                active: 0,
                expired: 0,
            },
        );
        assert_eq!(resp.hit_rate, 0.0);
        assert_eq!(resp.efficiency, 0.0);
    }

    #[test]
    fn test_delete_response_serialize() {
        let json = serde_json::to_value(DeleteResponse::new("lead:7", true)).unwrap();
        assert_eq!(json["key"], "lead:7");
        assert_eq!(json["removed"], true);
    }

    #[test]
    fn test_health_response_serialize() {
        let resp = HealthResponse::healthy();
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("healthy"));
        assert!(json.contains("timestamp"));
    }

    #[test]
    fn test_error_response_serialize() {
        let resp = ErrorResponse::new("Something went wrong");
        let json = serde_json::to_string(&resp).unwrap();
        assert!(json.contains("Something went wrong"));
    }
}
