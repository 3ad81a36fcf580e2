//! Cache Warmup
//!
//! Pre-loads reads that every session needs (configurator pricing, the
//! dashboard) so the first requests after start do not pay cold-cache
//! latency.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::future::{join_all, BoxFuture};
use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{error, info, warn};

/// Run order of warmup tasks. Lower variants run first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum WarmupPriority {
    Critical,
    High,
    Medium,
    Low,
}

impl WarmupPriority {
    pub const ALL: [WarmupPriority; 4] = [
        WarmupPriority::Critical,
        WarmupPriority::High,
        WarmupPriority::Medium,
        WarmupPriority::Low,
    ];
}

type WarmupFn = Box<dyn Fn() -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

// == Warmup Task ==
/// A named read to perform ahead of demand.
pub struct WarmupTask {
    pub name: String,
    pub priority: WarmupPriority,
    run: WarmupFn,
}

impl WarmupTask {
    pub fn new<F, Fut>(name: impl Into<String>, priority: WarmupPriority, run: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
    {
        Self {
            name: name.into(),
            priority,
            run: Box::new(move || Box::pin(run())),
        }
    }

    async fn execute(&self) -> bool {
        let started = Instant::now();
        match (self.run)().await {
            Ok(()) => {
                info!(
                    task = %self.name,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Warmup task completed"
                );
                true
            }
            Err(err) => {
                warn!(task = %self.name, error = %err, "Warmup task failed");
                false
            }
        }
    }
}

impl std::fmt::Debug for WarmupTask {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WarmupTask")
            .field("name", &self.name)
            .field("priority", &self.priority)
            .finish()
    }
}

/// What a call to [`CacheWarmer::warm`] did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarmupOutcome {
    Completed {
        succeeded: usize,
        failed: usize,
        elapsed: Duration,
    },
    /// Another warmup was still running
    AlreadyRunning,
    /// The previous warmup started less than the cooldown ago
    CoolingDown,
}

#[derive(Debug, Default)]
struct WarmerState {
    warming: bool,
    last_started: Option<Instant>,
}

// == Cache Warmer ==
#[derive(Debug)]
pub struct CacheWarmer {
    tasks: Vec<WarmupTask>,
    cooldown: Duration,
    state: Mutex<WarmerState>,
}

impl CacheWarmer {
    pub fn new(tasks: Vec<WarmupTask>, cooldown: Duration) -> Self {
        Self {
            tasks,
            cooldown,
            state: Mutex::new(WarmerState::default()),
        }
    }

    pub fn tasks(&self) -> &[WarmupTask] {
        &self.tasks
    }

    /// Runs every task, one priority group at a time, tasks within a group
    /// concurrently. A failing task is logged and does not stop the others.
    pub async fn warm(&self) -> WarmupOutcome {
        let started = Instant::now();
        {
            let mut state = self.state.lock();
            if state.warming {
                info!("Warmup already running, skipping");
                return WarmupOutcome::AlreadyRunning;
            }
            if let Some(last) = state.last_started {
                if started.duration_since(last) < self.cooldown {
                    info!("Warmup cooling down, skipping");
                    return WarmupOutcome::CoolingDown;
                }
            }
            state.warming = true;
            state.last_started = Some(started);
        }
        let _running = RunningGuard(&self.state);

        info!(tasks = self.tasks.len(), "Starting cache warmup");

        let mut succeeded = 0;
        let mut failed = 0;
        for priority in WarmupPriority::ALL {
            let group = self
                .tasks
                .iter()
                .filter(|task| task.priority == priority)
                .map(WarmupTask::execute);

            for ok in join_all(group).await {
                if ok {
                    succeeded += 1;
                } else {
                    failed += 1;
                }
            }
        }

        let elapsed = started.elapsed();
        info!(
            succeeded,
            failed,
            elapsed_ms = elapsed.as_millis() as u64,
            "Cache warmup completed"
        );

        WarmupOutcome::Completed {
            succeeded,
            failed,
            elapsed,
        }
    }
}

/// Clears the running flag even if the warmup future is dropped.
struct RunningGuard<'a>(&'a Mutex<WarmerState>);

impl Drop for RunningGuard<'_> {
    fn drop(&mut self) {
        self.0.lock().warming = false;
    }
}

/// Warms immediately, then again every `interval`.
pub fn spawn_warmup_task(warmer: Arc<CacheWarmer>, interval: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "Starting cache warmup task with interval of {} seconds",
            interval.as_secs()
        );

        loop {
            if let WarmupOutcome::Completed { failed, .. } = warmer.warm().await {
                if failed > 0 {
                    error!(failed, "Cache warmup finished with failed tasks");
                }
            }
            tokio::time::sleep(interval).await;
        }
    })
}
