use chrono::{DateTime, FixedOffset, Offset, Utc};
use serde::{Deserialize, Serialize};

use super::enums::{AssertionType, BodyType, HttpMethod, ScheduleInterval, TimeWindow};

pub const STATUS_NO_RESPONSE: i32 = -1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// A configured HTTP probe, as maintained by the management API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Monitor {
    pub id: i32,
    pub team_id: i32,
    pub name: String,
    pub method: HttpMethod,
    pub url: String,
    pub body_type: BodyType,
    pub schedule_interval: ScheduleInterval,
    pub previous_step_id: Option<i32>,
    pub assertion_type: AssertionType,
    pub assertion_value: String,
    pub is_assertion_json_schema_only: bool,
    pub last_notified: Option<DateTime<Utc>>,
}

/// A monitor together with the child collections loaded for one execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonitorDetails {
    pub monitor: Monitor,
    pub headers: Vec<KeyValue>,
    pub query_params: Vec<KeyValue>,
    pub body_form: Vec<KeyValue>,
    pub raw_body: Option<String>,
    pub excluded_keys: Vec<String>,
}

impl MonitorDetails {
    pub fn new(monitor: Monitor) -> Self {
        Self {
            monitor,
            headers: Vec::new(),
            query_params: Vec::new(),
            body_form: Vec::new(),
            raw_body: None,
            excluded_keys: Vec::new(),
        }
    }
}

/// Outcome of one monitor execution. Append-only once persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExecutionResult {
    pub monitor_id: i32,
    pub executed_at: DateTime<Utc>,
    pub response_time_ms: i64,
    pub success: bool,
    pub status_code: i32,
    pub log_response: String,
    pub log_error: String,
}

impl ExecutionResult {
    /// A failed, response-less result; the starting point of every execution.
    pub fn pending(monitor_id: i32) -> Self {
        Self {
            monitor_id,
            executed_at: Utc::now(),
            response_time_ms: 0,
            success: false,
            status_code: STATUS_NO_RESPONSE,
            log_response: String::new(),
            log_error: String::new(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackSettings {
    pub active: bool,
    pub token: String,
    pub channel_id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscordSettings {
    pub active: bool,
    pub webhook_url: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PagerDutySettings {
    pub active: bool,
    pub api_key: String,
    pub service_id: String,
    pub from_email: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailSettings {
    pub active: bool,
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_user: String,
    pub smtp_password: String,
    pub from_address: String,
    pub to_address: String,
}

/// Per-team alerting setup. One per team, created with defaults on first access.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertsConfiguration {
    pub team_id: i32,
    pub threshold_pct: i32,
    pub time_window: TimeWindow,
    pub utc_offset: String,
    pub slack: SlackSettings,
    pub discord: DiscordSettings,
    pub pagerduty: PagerDutySettings,
    pub email: EmailSettings,
}

impl AlertsConfiguration {
    pub const DEFAULT_THRESHOLD_PCT: i32 = 90;

    pub fn default_for_team(team_id: i32) -> Self {
        Self {
            team_id,
            threshold_pct: Self::DEFAULT_THRESHOLD_PCT,
            time_window: TimeWindow::OneHour,
            utc_offset: "+00:00".to_string(),
            slack: SlackSettings::default(),
            discord: DiscordSettings::default(),
            pagerduty: PagerDutySettings::default(),
            email: EmailSettings {
                smtp_port: 587,
                ..EmailSettings::default()
            },
        }
    }

    /// The team's display offset; malformed values fall back to UTC.
    pub fn offset(&self) -> FixedOffset {
        self.utc_offset
            .parse::<FixedOffset>()
            .unwrap_or_else(|_| Utc.fix())
    }

    /// Threshold clamped into the accepted 1..=100 range.
    pub fn threshold(&self) -> f64 {
        self.threshold_pct.clamp(1, 100) as f64
    }
}
