//! Per-channel alert queues and their worker pools.
//!
//! Every registered channel owns one queue. Enqueuing a monitor id fans it out
//! to all of them; whether a team actually uses a channel is decided by the
//! channel's workers at send time.

use chrono::Utc;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use super::success_rate::success_rate;
use crate::db::store::{MonitorStore, StoreError};
use crate::notifications::models::{AlertNotification, Channel};
use crate::notifications::senders::{NotificationSender, SenderError};
use crate::queue::WorkQueue;

#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("Store error: {0}")]
    Store(#[from] StoreError),
    #[error("Sender error: {0}")]
    Sender(#[from] SenderError),
}

/// Whether a dequeued alert went out or was skipped because the channel is off.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    Sent,
    ChannelInactive,
}

struct Lane {
    queue: Arc<WorkQueue<i32>>,
    workers: Vec<JoinHandle<()>>,
}

pub struct AlertDispatcher {
    lanes: HashMap<Channel, Lane>,
    stop: CancellationToken,
}

impl AlertDispatcher {
    /// Spawns `workers_per_channel` workers for each sender's channel.
    pub fn start(
        store: Arc<dyn MonitorStore>,
        senders: Vec<Arc<dyn NotificationSender>>,
        workers_per_channel: usize,
        idle_poll: Duration,
    ) -> Self {
        let stop = CancellationToken::new();
        let mut lanes = HashMap::new();
        for sender in senders {
            let channel = sender.channel();
            let queue = Arc::new(WorkQueue::new());
            let workers = (0..workers_per_channel.max(1))
                .map(|worker_id| {
                    tokio::spawn(alert_worker(
                        worker_id,
                        queue.clone(),
                        sender.clone(),
                        store.clone(),
                        stop.clone(),
                        idle_poll,
                    ))
                })
                .collect();
            lanes.insert(channel, Lane { queue, workers });
        }
        let dispatcher = Self { lanes, stop };
        info!(
            channels = ?dispatcher.channels(),
            workers_per_channel, "Alert dispatcher started."
        );
        dispatcher
    }

    pub fn channels(&self) -> Vec<Channel> {
        Channel::ALL
            .into_iter()
            .filter(|channel| self.lanes.contains_key(channel))
            .collect()
    }

    /// Queues the monitor on every channel.
    pub async fn enqueue(&self, monitor_id: i32) {
        for channel in Channel::ALL {
            self.enqueue_to(channel, monitor_id).await;
        }
    }

    pub async fn enqueue_to(&self, channel: Channel, monitor_id: i32) {
        if let Some(lane) = self.lanes.get(&channel) {
            lane.queue.push(monitor_id).await;
        }
    }

    /// Waits for every channel queue to drain, then stops and joins the workers.
    pub async fn shutdown(self) {
        for (channel, lane) in &self.lanes {
            let pending = lane.queue.len().await;
            debug!(%channel, pending, "Draining alert queue.");
            lane.queue.join().await;
        }
        self.stop.cancel();
        for (channel, lane) in self.lanes {
            for handle in lane.workers {
                if let Err(e) = handle.await {
                    error!(%channel, error = %e, "Alert worker terminated abnormally.");
                }
            }
        }
        info!("Alert dispatcher stopped.");
    }
}

async fn alert_worker(
    worker_id: usize,
    queue: Arc<WorkQueue<i32>>,
    sender: Arc<dyn NotificationSender>,
    store: Arc<dyn MonitorStore>,
    stop: CancellationToken,
    idle_poll: Duration,
) {
    let channel = sender.channel();
    loop {
        let Some(monitor_id) = queue.pop(idle_poll).await else {
            if stop.is_cancelled() && queue.is_empty().await {
                break;
            }
            continue;
        };

        let job = {
            let sender = sender.clone();
            let store = store.clone();
            tokio::spawn(async move { deliver(sender.as_ref(), store.as_ref(), monitor_id).await })
        };
        match job.await {
            Ok(Ok(Delivery::Sent)) => info!(%channel, monitor_id, "Alert sent."),
            Ok(Ok(Delivery::ChannelInactive)) => {
                debug!(%channel, monitor_id, "Channel inactive for team, alert skipped.")
            }
            Ok(Err(e)) => error!(%channel, monitor_id, error = %e, "Failed to send alert."),
            Err(e) => error!(%channel, worker_id, monitor_id, error = %e, "Alert job panicked."),
        }
        queue.task_done().await;
    }
}

/// Loads fresh settings and success-rate figures for one monitor and sends the alert.
pub async fn deliver(
    sender: &dyn NotificationSender,
    store: &dyn MonitorStore,
    monitor_id: i32,
) -> Result<Delivery, DispatchError> {
    let details = store.get_monitor_details(monitor_id).await?;
    let config = store.alerts_configuration(details.monitor.team_id).await?;
    if !sender.channel().is_active(&config) {
        return Ok(Delivery::ChannelInactive);
    }

    let rate = success_rate(store, monitor_id, config.time_window, Utc::now()).await?;
    let notification = AlertNotification::new(&details.monitor, &config, &rate);
    sender.send(&config, &notification).await?;
    Ok(Delivery::Sent)
}
