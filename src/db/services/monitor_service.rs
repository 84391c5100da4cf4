//! Database access for monitors, their execution results and team alert settings.
//!
//! Functions take a `DatabaseConnection` directly; `SeaOrmStore` wraps them
//! behind the `MonitorStore` trait used by the scheduler and the alert loops.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::try_join;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, NotSet, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};
use tracing::{debug, info, warn};

use crate::db::entities::{
    alerts_configuration, monitor, monitor_body_form, monitor_excluded_key, monitor_header,
    monitor_query_param, monitor_raw_body, monitor_result, prelude::*,
};
use crate::db::enums::{AssertionType, BodyType, HttpMethod, ScheduleInterval, TimeWindow};
use crate::db::models::{
    AlertsConfiguration as AlertsConfigurationModel, DiscordSettings, EmailSettings,
    ExecutionResult, KeyValue, Monitor as MonitorModel, MonitorDetails, PagerDutySettings,
    SlackSettings,
};
use crate::db::store::{MonitorStore, ResultCounts, StoreError};

impl TryFrom<monitor::Model> for MonitorModel {
    type Error = StoreError;

    fn try_from(row: monitor::Model) -> Result<Self, Self::Error> {
        Ok(MonitorModel {
            id: row.id,
            team_id: row.team_id,
            name: row.name,
            method: row.method.parse::<HttpMethod>()?,
            url: row.url,
            body_type: row.body_type.parse::<BodyType>()?,
            schedule_interval: ScheduleInterval::try_from(row.schedule_interval_minutes)?,
            previous_step_id: row.previous_step_id,
            assertion_type: row.assertion_type.parse::<AssertionType>()?,
            assertion_value: row.assertion_value,
            is_assertion_json_schema_only: row.is_assertion_json_schema_only,
            last_notified: row.last_notified,
        })
    }
}

impl From<monitor_result::Model> for ExecutionResult {
    fn from(row: monitor_result::Model) -> Self {
        ExecutionResult {
            monitor_id: row.monitor_id,
            executed_at: row.executed_at,
            response_time_ms: row.response_time_ms,
            success: row.success,
            status_code: row.status_code,
            log_response: row.log_response,
            log_error: row.log_error,
        }
    }
}

impl TryFrom<alerts_configuration::Model> for AlertsConfigurationModel {
    type Error = StoreError;

    fn try_from(row: alerts_configuration::Model) -> Result<Self, Self::Error> {
        Ok(AlertsConfigurationModel {
            team_id: row.team_id,
            threshold_pct: row.threshold_pct,
            time_window: row.time_window.parse::<TimeWindow>()?,
            utc_offset: row.utc_offset,
            slack: SlackSettings {
                active: row.is_slack_active,
                token: row.slack_token,
                channel_id: row.slack_channel_id,
            },
            discord: DiscordSettings {
                active: row.is_discord_active,
                webhook_url: row.discord_webhook_url,
            },
            pagerduty: PagerDutySettings {
                active: row.is_pagerduty_active,
                api_key: row.pagerduty_api_key,
                service_id: row.pagerduty_service_id,
                from_email: row.pagerduty_from_email,
            },
            email: EmailSettings {
                active: row.is_email_active,
                smtp_host: row.email_smtp_host,
                smtp_port: u16::try_from(row.email_smtp_port).unwrap_or(587),
                smtp_user: row.email_smtp_user,
                smtp_password: row.email_smtp_password,
                from_address: row.email_from,
                to_address: row.email_to,
            },
        })
    }
}

/// Converts rows, dropping any that cannot be interpreted.
fn usable_monitors(rows: Vec<monitor::Model>) -> Vec<MonitorModel> {
    rows.into_iter()
        .filter_map(|row| {
            let monitor_id = row.id;
            match MonitorModel::try_from(row) {
                Ok(monitor) => Some(monitor),
                Err(e) => {
                    warn!(monitor_id, error = %e, "Skipping malformed monitor row.");
                    None
                }
            }
        })
        .collect()
}

pub async fn get_all_monitors(db: &DatabaseConnection) -> Result<Vec<MonitorModel>, DbErr> {
    let rows = Monitor::find()
        .order_by_asc(monitor::Column::Id)
        .all(db)
        .await?;
    Ok(usable_monitors(rows))
}

pub async fn get_monitor_details(
    db: &DatabaseConnection,
    monitor_id: i32,
) -> Result<MonitorDetails, StoreError> {
    let row = Monitor::find_by_id(monitor_id)
        .one(db)
        .await?
        .ok_or(StoreError::MonitorNotFound(monitor_id))?;
    let monitor = MonitorModel::try_from(row)?;

    let headers_future = MonitorHeader::find()
        .filter(monitor_header::Column::MonitorId.eq(monitor_id))
        .order_by_asc(monitor_header::Column::Id)
        .all(db);
    let params_future = MonitorQueryParam::find()
        .filter(monitor_query_param::Column::MonitorId.eq(monitor_id))
        .order_by_asc(monitor_query_param::Column::Id)
        .all(db);
    let form_future = MonitorBodyForm::find()
        .filter(monitor_body_form::Column::MonitorId.eq(monitor_id))
        .order_by_asc(monitor_body_form::Column::Id)
        .all(db);
    let raw_body_future = MonitorRawBody::find()
        .filter(monitor_raw_body::Column::MonitorId.eq(monitor_id))
        .one(db);
    let excluded_future = MonitorExcludedKey::find()
        .filter(monitor_excluded_key::Column::MonitorId.eq(monitor_id))
        .order_by_asc(monitor_excluded_key::Column::Id)
        .all(db);

    let (headers, query_params, body_form, raw_body, excluded_keys) = try_join!(
        headers_future,
        params_future,
        form_future,
        raw_body_future,
        excluded_future
    )?;

    Ok(MonitorDetails {
        monitor,
        headers: headers
            .into_iter()
            .map(|h| KeyValue::new(h.key, h.value))
            .collect(),
        query_params: query_params
            .into_iter()
            .map(|p| KeyValue::new(p.key, p.value))
            .collect(),
        body_form: body_form
            .into_iter()
            .map(|f| KeyValue::new(f.key, f.value))
            .collect(),
        raw_body: raw_body.map(|r| r.body),
        excluded_keys: excluded_keys.into_iter().map(|k| k.key).collect(),
    })
}

pub async fn get_latest_result(
    db: &DatabaseConnection,
    monitor_id: i32,
) -> Result<Option<ExecutionResult>, DbErr> {
    let row = MonitorResult::find()
        .filter(monitor_result::Column::MonitorId.eq(monitor_id))
        .order_by_desc(monitor_result::Column::ExecutedAt)
        .one(db)
        .await?;
    Ok(row.map(ExecutionResult::from))
}

pub async fn count_results_between(
    db: &DatabaseConnection,
    monitor_id: i32,
    from: DateTime<Utc>,
    to: DateTime<Utc>,
) -> Result<ResultCounts, DbErr> {
    let in_window = || {
        MonitorResult::find()
            .filter(monitor_result::Column::MonitorId.eq(monitor_id))
            .filter(monitor_result::Column::ExecutedAt.gte(from))
            .filter(monitor_result::Column::ExecutedAt.lte(to))
    };
    let (total, successes) = try_join!(
        in_window().count(db),
        in_window()
            .filter(monitor_result::Column::Success.eq(true))
            .count(db)
    )?;
    Ok(ResultCounts { total, successes })
}

pub async fn create_result(db: &DatabaseConnection, result: &ExecutionResult) -> Result<(), DbErr> {
    let new_result = monitor_result::ActiveModel {
        id: NotSet,
        monitor_id: Set(result.monitor_id),
        executed_at: Set(result.executed_at),
        response_time_ms: Set(result.response_time_ms),
        success: Set(result.success),
        status_code: Set(result.status_code),
        log_response: Set(result.log_response.clone()),
        log_error: Set(result.log_error.clone()),
    };
    let saved = new_result.insert(db).await?;
    debug!(monitor_id = saved.monitor_id, result_id = saved.id, "Stored execution result.");
    Ok(())
}

pub async fn update_last_notified(
    db: &DatabaseConnection,
    monitor_id: i32,
    at: DateTime<Utc>,
) -> Result<(), StoreError> {
    let outcome = Monitor::update_many()
        .col_expr(monitor::Column::LastNotified, Expr::value(at))
        .filter(monitor::Column::Id.eq(monitor_id))
        .exec(db)
        .await?;
    if outcome.rows_affected == 0 {
        return Err(StoreError::MonitorNotFound(monitor_id));
    }
    Ok(())
}

fn default_alerts_row(team_id: i32) -> alerts_configuration::ActiveModel {
    let defaults = AlertsConfigurationModel::default_for_team(team_id);
    alerts_configuration::ActiveModel {
        id: NotSet,
        team_id: Set(team_id),
        threshold_pct: Set(defaults.threshold_pct),
        time_window: Set(defaults.time_window.to_string()),
        utc_offset: Set(defaults.utc_offset),
        is_slack_active: Set(false),
        slack_token: Set(String::new()),
        slack_channel_id: Set(String::new()),
        is_discord_active: Set(false),
        discord_webhook_url: Set(String::new()),
        is_pagerduty_active: Set(false),
        pagerduty_api_key: Set(String::new()),
        pagerduty_service_id: Set(String::new()),
        pagerduty_from_email: Set(String::new()),
        is_email_active: Set(false),
        email_smtp_host: Set(String::new()),
        email_smtp_port: Set(defaults.email.smtp_port as i32),
        email_smtp_user: Set(String::new()),
        email_smtp_password: Set(String::new()),
        email_from: Set(String::new()),
        email_to: Set(String::new()),
    }
}

pub async fn get_or_create_alerts_configuration(
    db: &DatabaseConnection,
    team_id: i32,
) -> Result<AlertsConfigurationModel, StoreError> {
    let existing = AlertsConfiguration::find()
        .filter(alerts_configuration::Column::TeamId.eq(team_id))
        .one(db)
        .await?;
    if let Some(row) = existing {
        return AlertsConfigurationModel::try_from(row);
    }

    match default_alerts_row(team_id).insert(db).await {
        Ok(row) => {
            info!(team_id = team_id, "Created default alerts configuration.");
            AlertsConfigurationModel::try_from(row)
        }
        Err(insert_err) => {
            // Another writer may have created the row between our read and insert.
            let row = AlertsConfiguration::find()
                .filter(alerts_configuration::Column::TeamId.eq(team_id))
                .one(db)
                .await?
                .ok_or(StoreError::Database(insert_err))?;
            AlertsConfigurationModel::try_from(row)
        }
    }
}

/// `MonitorStore` backed by the management API's relational database.
#[derive(Clone)]
pub struct SeaOrmStore {
    db: DatabaseConnection,
}

impl SeaOrmStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MonitorStore for SeaOrmStore {
    async fn list_monitors(&self) -> Result<Vec<MonitorModel>, StoreError> {
        Ok(get_all_monitors(&self.db).await?)
    }

    async fn get_monitor_details(&self, monitor_id: i32) -> Result<MonitorDetails, StoreError> {
        get_monitor_details(&self.db, monitor_id).await
    }

    async fn latest_result(
        &self,
        monitor_id: i32,
    ) -> Result<Option<ExecutionResult>, StoreError> {
        Ok(get_latest_result(&self.db, monitor_id).await?)
    }

    async fn count_results(
        &self,
        monitor_id: i32,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> Result<ResultCounts, StoreError> {
        Ok(count_results_between(&self.db, monitor_id, from, to).await?)
    }

    async fn create_result(&self, result: &ExecutionResult) -> Result<(), StoreError> {
        Ok(create_result(&self.db, result).await?)
    }

    async fn update_last_notified(
        &self,
        monitor_id: i32,
        at: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        update_last_notified(&self.db, monitor_id, at).await
    }

    async fn alerts_configuration(
        &self,
        team_id: i32,
    ) -> Result<AlertsConfigurationModel, StoreError> {
        get_or_create_alerts_configuration(&self.db, team_id).await
    }
}
