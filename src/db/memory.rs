//! An in-process `MonitorStore` for tests and for embedding the engine
//! without a database.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::RwLock;

use super::models::{AlertsConfiguration, ExecutionResult, Monitor, MonitorDetails};
use super::store::{MonitorStore, ResultCounts, StoreError};

#[derive(Default)]
struct Tables {
    monitors: HashMap<i32, MonitorDetails>,
    results: Vec<ExecutionResult>,
    alerts: HashMap<i32, AlertsConfiguration>,
}

#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn upsert_monitor(&self, details: MonitorDetails) {
        let mut tables = self.tables.write().await;
        tables.monitors.insert(details.monitor.id, details);
    }

    pub async fn set_alerts_configuration(&self, config: AlertsConfiguration) {
        let mut tables = self.tables.write().await;
        tables.alerts.insert(config.team_id, config);
    }

    /// All stored results for one monitor, in insertion order.
    pub async fn results_for(&self, monitor_id: i32) -> Vec<ExecutionResult> {
        let tables = self.tables.read().await;
        tables
            .results
            .iter()
            .filter(|r| r.monitor_id == monitor_id)
            .cloned()
            .collect()
    }

    pub async fn result_count(&self) -> usize {
        self.tables.read().await.results.len()
    }
}

#[async_trait]
impl MonitorStore for MemoryStore {
    async fn list_monitors(&self) -> Result<Vec<Monitor>, StoreError> {
        let tables = self.tables.read().await;
        let mut monitors: Vec<Monitor> = tables
            .monitors
            .values()
            .map(|d| d.monitor.clone())
            .collect();
        monitors.sort_by_key(|m| m.id);
        Ok(monitors)
    }

    async fn get_monitor_details(&self, monitor_id: i32) -> Result<MonitorDetails, StoreError> {
        let tables = self.tables.read().await;
        tables
            .monitors
            .get(&monitor_id)
            .cloned()
            .ok_or(StoreError::MonitorNotFound(monitor_id))
    }

    async fn latest_result(
        &self,
        monitor_id: i32,
    ) -> Result<Option<ExecutionResult>, StoreError> {
        let tables = self.tables.read().await;
        Ok(tables
            .results
            .iter()
            .filter(|r| r.monitor_id == monitor_id)
            .max_by_key(|r| r.executed_at)
            .cloned())
    }

    async fn count_results(
        &self,
        monitor_id: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<ResultCounts, StoreError> {
        let tables = self.tables.read().await;
        let counts = tables
            .results
            .iter()
            .filter(|r| r.monitor_id == monitor_id && r.executed_at >= from && r.executed_at <= to)
            .fold(ResultCounts::default(), |mut counts, r| {
                counts.total += 1;
                counts.successes += u64::from(r.success);
                counts
            });
        Ok(counts)
    }

    async fn create_result(&self, result: &ExecutionResult) -> Result<(), StoreError> {
        self.tables.write().await.results.push(result.clone());
        Ok(())
    }

    async fn update_last_notified(
        &self,
        monitor_id: i32,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write().await;
        let details = tables
            .monitors
            .get_mut(&monitor_id)
            .ok_or(StoreError::MonitorNotFound(monitor_id))?;
        details.monitor.last_notified = Some(at);
        Ok(())
    }

    async fn alerts_configuration(&self, team_id: i32) -> Result<AlertsConfiguration, StoreError> {
        let mut tables = self.tables.write().await;
        Ok(tables
            .alerts
            .entry(team_id)
            .or_insert_with(|| AlertsConfiguration::default_for_team(team_id))
            .clone())
    }
}
