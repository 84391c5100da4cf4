//! The read/write surface the engine needs from the configuration and result store.
//!
//! The management API owns the schema and all CRUD beyond what is listed here;
//! the engine reads monitors and alert settings and appends execution results.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use super::enums::ParseEnumError;
use super::models::{AlertsConfiguration, ExecutionResult, Monitor, MonitorDetails};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
    #[error("Monitor not found: {0}")]
    MonitorNotFound(i32),
    #[error("Malformed record: {0}")]
    Malformed(#[from] ParseEnumError),
}

/// Execution counts for one monitor over a time range.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ResultCounts {
    pub total: u64,
    pub successes: u64,
}

#[async_trait]
pub trait MonitorStore: Send + Sync {
    async fn list_monitors(&self) -> Result<Vec<Monitor>, StoreError>;

    /// Fetches a monitor with its headers, query params, form fields, raw body
    /// and excluded diff keys.
    async fn get_monitor_details(&self, monitor_id: i32) -> Result<MonitorDetails, StoreError>;

    async fn latest_result(&self, monitor_id: i32)
    -> Result<Option<ExecutionResult>, StoreError>;

    /// Counts results with `from <= executed_at <= to`.
    async fn count_results(
        &self,
        monitor_id: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<ResultCounts, StoreError>;

    async fn create_result(&self, result: &ExecutionResult) -> Result<(), StoreError>;

    async fn update_last_notified(
        &self,
        monitor_id: i32,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError>;

    /// Returns the team's alert settings, inserting the defaults on first access.
    async fn alerts_configuration(&self, team_id: i32) -> Result<AlertsConfiguration, StoreError>;
}
