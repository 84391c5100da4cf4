use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::dispatcher::AlertDispatcher;
use super::success_rate::success_rate;
use crate::db::models::{AlertsConfiguration, Monitor};
use crate::db::store::{MonitorStore, StoreError};
use crate::lifecycle::{Lifecycle, Phase};
use crate::notifications::senders::NotificationSender;

/// Minimum time between two notifications for the same monitor.
pub const COOL_DOWN_SECS: i64 = 5 * 60;

#[derive(Debug, Clone)]
pub struct EvaluatorOptions {
    pub tick: Duration,
    pub workers_per_channel: usize,
    pub idle_poll: Duration,
}

impl Default for EvaluatorOptions {
    fn default() -> Self {
        Self {
            tick: Duration::from_secs(60),
            workers_per_channel: 1,
            idle_poll: Duration::from_secs(1),
        }
    }
}

pub struct AlertEvaluator {
    store: Arc<dyn MonitorStore>,
    senders: Vec<Arc<dyn NotificationSender>>,
    options: EvaluatorOptions,
    lifecycle: Lifecycle,
}

impl AlertEvaluator {
    pub fn new(
        store: Arc<dyn MonitorStore>,
        senders: Vec<Arc<dyn NotificationSender>>,
        options: EvaluatorOptions,
    ) -> Self {
        Self {
            store,
            senders,
            options,
            lifecycle: Lifecycle::new("alert_evaluator"),
        }
    }

    pub fn lifecycle(&self) -> &Lifecycle {
        &self.lifecycle
    }

    /// Evaluates all monitors every tick until `shutdown` is cancelled, then
    /// drains the channel queues and joins their workers.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(
            tick_secs = self.options.tick.as_secs_f64(),
            "Alert evaluator started."
        );
        let dispatcher = AlertDispatcher::start(
            self.store.clone(),
            self.senders.clone(),
            self.options.workers_per_channel,
            self.options.idle_poll,
        );

        let mut notified: HashMap<i32, DateTime<Utc>> = HashMap::new();
        let mut next_tick = Instant::now();
        loop {
            tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                _ = tokio::time::sleep_until(next_tick) => {}
            }
            next_tick = Instant::now() + self.options.tick;

            match self.evaluate_once(&dispatcher, &mut notified, Utc::now()).await {
                Ok(alerted) if !alerted.is_empty() => {
                    info!(monitors = ?alerted, "Queued alerts for monitors below threshold.")
                }
                Ok(_) => {}
                Err(e) => error!(error = %e, "Alert evaluation cycle failed."),
            }
        }

        self.lifecycle.advance(Phase::Draining);
        dispatcher.shutdown().await;
        self.lifecycle.advance(Phase::Stopped);
        info!("Alert evaluator stopped.");
    }

    /// One evaluation pass. Returns the ids that were queued for notification.
    ///
    /// `notified` is the loop's own record of when each monitor was last alerted.
    pub async fn evaluate_once(
        &self,
        dispatcher: &AlertDispatcher,
        notified: &mut HashMap<i32, DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> Result<Vec<i32>, StoreError> {
        let monitors = self.store.list_monitors().await?;
        let mut configs: HashMap<i32, AlertsConfiguration> = HashMap::new();
        let mut alerted = Vec::new();

        for monitor in monitors {
            if in_cool_down(&monitor, notified.get(&monitor.id).copied(), now) {
                debug!(monitor_id = monitor.id, "Monitor in cool-down, skipped.");
                continue;
            }

            if !configs.contains_key(&monitor.team_id) {
                match self.store.alerts_configuration(monitor.team_id).await {
                    Ok(config) => {
                        configs.insert(monitor.team_id, config);
                    }
                    Err(e) => {
                        error!(team_id = monitor.team_id, error = %e, "Failed to load alerts configuration.");
                        continue;
                    }
                }
            }
            let Some(config) = configs.get(&monitor.team_id) else {
                continue;
            };

            let rate = match success_rate(self.store.as_ref(), monitor.id, config.time_window, now).await {
                Ok(rate) => rate,
                Err(e) => {
                    error!(monitor_id = monitor.id, error = %e, "Failed to compute success rate.");
                    continue;
                }
            };
            if rate.rate >= config.threshold() {
                continue;
            }

            warn!(
                monitor_id = monitor.id,
                success_rate = rate.rate,
                executions = rate.total(),
                threshold = config.threshold(),
                "Monitor below alert threshold."
            );
            notified.insert(monitor.id, now);
            if let Err(e) = self.store.update_last_notified(monitor.id, now).await {
                error!(monitor_id = monitor.id, error = %e, "Failed to persist last notification time.");
            }
            dispatcher.enqueue(monitor.id).await;
            alerted.push(monitor.id);
        }
        Ok(alerted)
    }
}

/// True when either the loop or the stored monitor saw a notification within the cool-down.
fn in_cool_down(monitor: &Monitor, loop_notified: Option<DateTime<Utc>>, now: DateTime<Utc>) -> bool {
    let last = match (loop_notified, monitor.last_notified) {
        (Some(a), Some(b)) => Some(a.max(b)),
        (a, b) => a.or(b),
    };
    last.is_some_and(|at| now - at < chrono::Duration::seconds(COOL_DOWN_SECS))
}
