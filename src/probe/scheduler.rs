//! Periodic probe scheduling and the probe worker pool.
//!
//! A single tick loop decides which monitors are due and pushes their ids onto
//! a shared queue; `workers` tasks pop ids, execute them and persist the result.
//! On shutdown the loop stops producing, waits for the queue to drain, then
//! stops and joins the workers.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::executor::ProbeExecutor;
use crate::db::models::Monitor;
use crate::db::store::MonitorStore;
use crate::lifecycle::{Lifecycle, Phase};
use crate::queue::WorkQueue;

#[derive(Debug, Clone)]
pub struct SchedulerOptions {
    pub workers: usize,
    pub tick: Duration,
    /// How long an idle worker waits for work before re-checking for shutdown.
    pub idle_poll: Duration,
}

impl Default for SchedulerOptions {
    fn default() -> Self {
        Self {
            workers: 3,
            tick: Duration::from_secs(60),
            idle_poll: Duration::from_secs(1),
        }
    }
}

pub struct ProbeScheduler {
    store: Arc<dyn MonitorStore>,
    executor: ProbeExecutor,
    queue: Arc<WorkQueue<i32>>,
    options: SchedulerOptions,
    lifecycle: Lifecycle,
}

impl ProbeScheduler {
    pub fn new(
        store: Arc<dyn MonitorStore>,
        executor: ProbeExecutor,
        options: SchedulerOptions,
    ) -> Self {
        Self {
            store,
            executor,
            queue: Arc::new(WorkQueue::new()),
            options,
            lifecycle: Lifecycle::new("probe_scheduler"),
        }
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Runs until `shutdown` is cancelled, then drains and joins the worker pool.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            workers = self.options.workers,
            tick_secs = self.options.tick.as_secs_f64(),
            "Probe scheduler started."
        );

        let stop_workers = CancellationToken::new();
        let workers: Vec<_> = (0..self.options.workers.max(1))
            .map(|worker_id| {
                tokio::spawn(probe_worker(
                    worker_id,
                    self.queue.clone(),
                    self.executor.clone(),
                    self.store.clone(),
                    stop_workers.clone(),
                    self.options.idle_poll,
                ))
            })
            .collect();

        self.tick_loop(&shutdown).await;

        self.lifecycle.advance(Phase::Draining);
        let pending = self.queue.len().await;
        info!(pending, "Draining probe queue.");
        self.queue.join().await;
        stop_workers.cancel();
        for handle in workers {
            if let Err(e) = handle.await {
                error!(error = %e, "Probe worker terminated abnormally.");
            }
        }
        self.lifecycle.advance(Phase::Stopped);
        info!("Probe scheduler stopped.");
    }

    async fn tick_loop(&self, shutdown: &CancellationToken) {
        let mut last_triggered = HashMap::new();
        let mut seeded = false;
        let mut next_tick = Instant::now();

        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => return,
                _ = tokio::time::sleep_until(next_tick) => {}
            }
            next_tick = Instant::now() + self.options.tick;

            let monitors = match self.store.list_monitors().await {
                Ok(monitors) => monitors,
                Err(e) => {
                    error!(error = %e, "Failed to list monitors, skipping tick.");
                    continue;
                }
            };
            if !seeded {
                self.seed_last_triggered(&monitors, &mut last_triggered).await;
                seeded = true;
            }
            let due = due_monitor_ids(&monitors, &mut last_triggered, Utc::now());
            if !due.is_empty() {
                debug!(count = due.len(), "Enqueuing due monitors.");
            }
            for monitor_id in due {
                self.queue.push(monitor_id).await;
            }
        }
    }

    /// Restores trigger times from stored results so a restart does not probe
    /// everything at once. A monitor whose history cannot be read counts as never run.
    async fn seed_last_triggered(
        &self,
        monitors: &[Monitor],
        last_triggered: &mut HashMap<i32, DateTime<Utc>>,
    ) {
        for monitor in monitors {
            match self.store.latest_result(monitor.id).await {
                Ok(Some(latest)) => {
                    last_triggered.insert(monitor.id, latest.executed_at);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!(monitor_id = monitor.id, error = %e, "Failed to load latest result, treating monitor as never run.");
                }
            }
        }
    }
}

/// Returns the monitors whose interval has elapsed and marks them triggered at `now`.
pub fn due_monitor_ids(
    monitors: &[Monitor],
    last_triggered: &mut HashMap<i32, DateTime<Utc>>,
    now: DateTime<Utc>,
) -> Vec<i32> {
    let mut due = Vec::new();
    for monitor in monitors {
        let is_due = match last_triggered.get(&monitor.id) {
            Some(at) => now - *at >= monitor.schedule_interval.as_chrono(),
            None => true,
        };
        if is_due {
            last_triggered.insert(monitor.id, now);
            due.push(monitor.id);
        }
    }
    due
}

async fn probe_worker(
    worker_id: usize,
    queue: Arc<WorkQueue<i32>>,
    executor: ProbeExecutor,
    store: Arc<dyn MonitorStore>,
    stop: CancellationToken,
    idle_poll: Duration,
) {
    debug!(worker_id, "Probe worker started.");
    loop {
        let Some(monitor_id) = queue.pop(idle_poll).await else {
            if stop.is_cancelled() && queue.is_empty().await {
                break;
            }
            continue;
        };

        let job = tokio::spawn(run_probe(executor.clone(), store.clone(), monitor_id));
        if let Err(e) = job.await {
            error!(worker_id, monitor_id, error = %e, "Probe job panicked.");
        }
        queue.task_done().await;
    }
    debug!(worker_id, "Probe worker stopped.");
}

async fn run_probe(executor: ProbeExecutor, store: Arc<dyn MonitorStore>, monitor_id: i32) {
    let started_at = Utc::now();
    let clock = std::time::Instant::now();
    let mut result = executor.execute(monitor_id).await;
    result.executed_at = started_at;
    result.response_time_ms = i64::try_from(clock.elapsed().as_millis()).unwrap_or(i64::MAX);

    if !result.success {
        warn!(monitor_id, status = result.status_code, error = %result.log_error, "Probe failed.");
    }
    if let Err(e) = store.create_result(&result).await {
        error!(monitor_id, error = %e, "Failed to store execution result.");
    }
}
