//! Backend query monitoring
//!
//! Times every backend call made on a cache miss and keeps the most recent
//! ones in a bounded log. Calls slower than the threshold are logged at warn.

use std::collections::VecDeque;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use parking_lot::Mutex;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, error, warn};

/// Number of calls kept by [`QueryMonitor::default`].
pub const DEFAULT_LOG_CAPACITY: usize = 1000;

/// Threshold used by [`QueryMonitor::default`].
pub const DEFAULT_SLOW_THRESHOLD: Duration = Duration::from_secs(1);

/// One timed backend call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QueryLog {
    pub query: String,
    pub duration_ms: u64,
    /// Completion time in ISO 8601 format
    pub timestamp: String,
    pub error: Option<String>,
}

/// Aggregates over the calls currently held in the log.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct QueryStats {
    pub total_queries: usize,
    pub slow_queries: usize,
    pub error_count: usize,
    pub average_ms: f64,
    pub fastest_ms: u64,
    pub slowest_ms: u64,
    pub slow_threshold_ms: u64,
}

// == Query Monitor ==
#[derive(Debug)]
pub struct QueryMonitor {
    logs: Mutex<VecDeque<QueryLog>>,
    capacity: usize,
    slow_threshold: Duration,
}

impl Default for QueryMonitor {
    fn default() -> Self {
        Self::new(DEFAULT_LOG_CAPACITY, DEFAULT_SLOW_THRESHOLD)
    }
}

impl QueryMonitor {
    /// A capacity of zero is raised to one.
    pub fn new(capacity: usize, slow_threshold: Duration) -> Self {
        let capacity = capacity.max(1);
        Self {
            logs: Mutex::new(VecDeque::with_capacity(capacity)),
            capacity,
            slow_threshold,
        }
    }

    pub fn slow_threshold(&self) -> Duration {
        self.slow_threshold
    }

    /// Runs `query`, records how long it took and whether it failed, and
    /// returns its result unchanged.
    pub async fn observe<T, E, Fut>(&self, name: &str, query: Fut) -> Result<T, E>
    where
        E: Display,
        Fut: Future<Output = Result<T, E>>,
    {
        let started = Instant::now();
        let result = query.await;
        let error = result.as_ref().err().map(ToString::to_string);
        self.record(name, started.elapsed(), error);
        result
    }

    /// Appends one call to the log, dropping the oldest when full.
    pub fn record(&self, name: &str, duration: Duration, error: Option<String>) {
        let duration_ms = duration.as_millis().min(u128::from(u64::MAX)) as u64;

        if duration > self.slow_threshold {
            warn!(query = name, duration_ms, "Slow backend query");
        } else {
            debug!(query = name, duration_ms, "Backend query");
        }
        if let Some(err) = &error {
            error!(query = name, error = %err, "Backend query failed");
        }

        let mut logs = self.logs.lock();
        if logs.len() == self.capacity {
            logs.pop_front();
        }
        logs.push_back(QueryLog {
            query: name.to_string(),
            duration_ms,
            timestamp: chrono::Utc::now().to_rfc3339(),
            error,
        });
    }

    pub fn stats(&self) -> QueryStats {
        let logs = self.logs.lock();
        let slow_threshold_ms = self.threshold_ms();
        if logs.is_empty() {
            return QueryStats {
                slow_threshold_ms,
                ..QueryStats::default()
            };
        }

        let total: u64 = logs.iter().map(|log| log.duration_ms).sum();
        QueryStats {
            total_queries: logs.len(),
            slow_queries: logs.iter().filter(|log| self.is_slow(log)).count(),
            error_count: logs.iter().filter(|log| log.error.is_some()).count(),
            average_ms: total as f64 / logs.len() as f64,
            fastest_ms: logs.iter().map(|log| log.duration_ms).min().unwrap_or(0),
            slowest_ms: logs.iter().map(|log| log.duration_ms).max().unwrap_or(0),
            slow_threshold_ms,
        }
    }

    /// Slow calls, slowest first.
    pub fn slow_queries(&self, limit: usize) -> Vec<QueryLog> {
        let mut slow: Vec<QueryLog> = self
            .logs
            .lock()
            .iter()
            .filter(|log| self.is_slow(log))
            .cloned()
            .collect();
        slow.sort_by(|a, b| b.duration_ms.cmp(&a.duration_ms));
        slow.truncate(limit);
        slow
    }

    /// Most recent calls, newest first.
    pub fn recent(&self, limit: usize) -> Vec<QueryLog> {
        self.logs.lock().iter().rev().take(limit).cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.logs.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.logs.lock().is_empty()
    }

    pub fn clear(&self) {
        self.logs.lock().clear();
    }

    fn threshold_ms(&self) -> u64 {
        self.slow_threshold.as_millis().min(u128::from(u64::MAX)) as u64
    }

    fn is_slow(&self, log: &QueryLog) -> bool {
        log.duration_ms > self.threshold_ms()
    }
}
