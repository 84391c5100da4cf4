#![allow(dead_code)]

use apiwatch::db::MemoryStore;
use apiwatch::db::enums::{AssertionType, BodyType, HttpMethod, ScheduleInterval};
use apiwatch::db::models::{AlertsConfiguration, ExecutionResult, Monitor, MonitorDetails};
use apiwatch::db::store::{MonitorStore, ResultCounts, StoreError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::DbErr;
use std::sync::atomic::{AtomicUsize, Ordering};

pub fn monitor(id: i32, name: &str, url: String) -> Monitor {
    Monitor {
        id,
        team_id: 1,
        name: name.to_string(),
        method: HttpMethod::Get,
        url,
        body_type: BodyType::Empty,
        schedule_interval: ScheduleInterval::OneMinute,
        previous_step_id: None,
        assertion_type: AssertionType::Disabled,
        assertion_value: String::new(),
        is_assertion_json_schema_only: false,
        last_notified: None,
    }
}

pub fn details(id: i32, name: &str, url: String) -> MonitorDetails {
    MonitorDetails::new(monitor(id, name, url))
}

pub fn chained(id: i32, name: &str, url: String, previous_step_id: i32) -> MonitorDetails {
    let mut details = details(id, name, url);
    details.monitor.previous_step_id = Some(previous_step_id);
    details
}

/// A `MemoryStore` that fails or panics on selected calls.
pub struct FlakyStore {
    pub inner: MemoryStore,
    list_failures: AtomicUsize,
    latest_result_failures: AtomicUsize,
    panic_on_create_for: Option<i32>,
}

impl FlakyStore {
    pub fn new(inner: MemoryStore) -> Self {
        Self {
            inner,
            list_failures: AtomicUsize::new(0),
            latest_result_failures: AtomicUsize::new(0),
            panic_on_create_for: None,
        }
    }

    pub fn failing_list_monitors(self, times: usize) -> Self {
        self.list_failures.store(times, Ordering::SeqCst);
        self
    }

    pub fn failing_latest_result(self, times: usize) -> Self {
        self.latest_result_failures.store(times, Ordering::SeqCst);
        self
    }

    pub fn panicking_on_create_for(mut self, monitor_id: i32) -> Self {
        self.panic_on_create_for = Some(monitor_id);
        self
    }
}

fn take_failure(remaining: &AtomicUsize) -> bool {
    remaining
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok()
}

#[async_trait]
impl MonitorStore for FlakyStore {
    async fn list_monitors(&self) -> Result<Vec<Monitor>, StoreError> {
        if take_failure(&self.list_failures) {
            return Err(StoreError::Database(DbErr::Custom("connection reset".to_string())));
        }
        self.inner.list_monitors().await
    }

    async fn get_monitor_details(&self, monitor_id: i32) -> Result<MonitorDetails, StoreError> {
        self.inner.get_monitor_details(monitor_id).await
    }

    async fn latest_result(
        &self,
        monitor_id: i32,
    ) -> Result<Option<ExecutionResult>, StoreError> {
        if take_failure(&self.latest_result_failures) {
            return Err(StoreError::Database(DbErr::Custom("connection reset".to_string())));
        }
        self.inner.latest_result(monitor_id).await
    }

    async fn count_results(
        &self,
        monitor_id: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<ResultCounts, StoreError> {
        self.inner.count_results(monitor_id, from, to).await
    }

    async fn create_result(&self, result: &ExecutionResult) -> Result<(), StoreError> {
        if self.panic_on_create_for == Some(result.monitor_id) {
            panic!("result table unavailable for monitor {}", result.monitor_id);
        }
        self.inner.create_result(result).await
    }

    async fn update_last_notified(
        &self,
        monitor_id: i32,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        self.inner.update_last_notified(monitor_id, at).await
    }

    async fn alerts_configuration(&self, team_id: i32) -> Result<AlertsConfiguration, StoreError> {
        self.inner.alerts_configuration(team_id).await
    }
}
