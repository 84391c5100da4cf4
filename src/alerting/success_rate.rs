use chrono::{DateTime, Utc};

use crate::db::enums::TimeWindow;
use crate::db::store::{MonitorStore, StoreError};

/// Share of successful executions over a trailing window.
#[derive(Debug, Clone, PartialEq)]
pub struct SuccessRate {
    pub successes: u64,
    pub failures: u64,
    /// Percentage in `0.0..=100.0`; 100 when the window holds no results.
    pub rate: f64,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
}

impl SuccessRate {
    pub fn from_counts(
        successes: u64,
        failures: u64,
        window_start: DateTime<Utc>,
        window_end: DateTime<Utc>,
    ) -> Self {
        let total = successes + failures;
        let rate = if total == 0 {
            100.0
        } else {
            100.0 * successes as f64 / total as f64
        };
        Self {
            successes,
            failures,
            rate,
            window_start,
            window_end,
        }
    }

    pub fn total(&self) -> u64 {
        self.successes + self.failures
    }
}

pub async fn success_rate(
    store: &dyn MonitorStore,
    monitor_id: i32,
    window: TimeWindow,
    now: DateTime<Utc>,
) -> Result<SuccessRate, StoreError> {
    let window_start = now - window.as_chrono();
    let counts = store.count_results(monitor_id, window_start, now).await?;
    Ok(SuccessRate::from_counts(
        counts.successes,
        counts.total.saturating_sub(counts.successes),
        window_start,
        now,
    ))
}
