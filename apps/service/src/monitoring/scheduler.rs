use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{MissedTickBehavior, interval};
use tracing::{Instrument, info, info_span};

use super::executor::MonitoringExecutor;
use super::types::CycleReport;

/// Monitoring scheduler - fires a cycle immediately, then once per interval.
///
/// Every cycle runs as its own task and is never awaited by the timer, so a
/// slow cycle does not delay the next one.
pub struct MonitoringScheduler {
    executor: Arc<MonitoringExecutor>,
    interval: Duration,
    cycles: Arc<AtomicU64>,
}

impl MonitoringScheduler {
    /// Create a new monitoring scheduler
    pub fn new(executor: Arc<MonitoringExecutor>, interval: Duration) -> Self {
        Self { executor, interval, cycles: Arc::new(AtomicU64::new(0)) }
    }

    /// Start the timer loop. The loop runs until the returned handle is
    /// aborted or the runtime shuts down.
    pub fn start(self) -> JoinHandle<()> {
        info!(interval_seconds = self.interval.as_secs(), "Starting monitoring scheduler");

        tokio::spawn(async move {
            let mut timer = interval(self.interval);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                timer.tick().await;
                self.spawn_cycle();
            }
        })
    }

    /// Launch one independent cycle.
    pub fn spawn_cycle(&self) -> JoinHandle<CycleReport> {
        let cycle = self.cycles.fetch_add(1, Ordering::Relaxed) + 1;
        let executor = Arc::clone(&self.executor);

        tokio::spawn(executor.run_cycle().instrument(info_span!("cycle", cycle)))
    }
}
