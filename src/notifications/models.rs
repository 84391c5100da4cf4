use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};
use std::fmt;
use tera::{Context, Tera};

use crate::alerting::success_rate::SuccessRate;
use crate::db::models::{AlertsConfiguration, Monitor};

/// The notification transports an alert fans out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Channel {
    Slack,
    Discord,
    PagerDuty,
    Email,
}

impl Channel {
    pub const ALL: [Channel; 4] = [
        Channel::Slack,
        Channel::Discord,
        Channel::PagerDuty,
        Channel::Email,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Slack => "slack",
            Channel::Discord => "discord",
            Channel::PagerDuty => "pagerduty",
            Channel::Email => "email",
        }
    }

    /// Whether the team has switched this channel on.
    pub fn is_active(&self, config: &AlertsConfiguration) -> bool {
        match self {
            Channel::Slack => config.slack.active,
            Channel::Discord => config.discord.active,
            Channel::PagerDuty => config.pagerduty.active,
            Channel::Email => config.email.active,
        }
    }
}

impl fmt::Display for Channel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S %:z";

const MESSAGE_TEMPLATE: &str = "Monitor {{ monitor_name }} ({{ method }} {{ url }}) \
has a success rate of {{ success_rate }}%, below the {{ threshold }}% threshold.\n\
Window: {{ window_start }} to {{ window_end }}";

/// Content of one alert, with the window expressed in the team's offset.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AlertNotification {
    pub monitor_id: i32,
    pub monitor_name: String,
    pub method: String,
    pub url: String,
    pub threshold: f64,
    pub success_rate: f64,
    pub window_start: DateTime<FixedOffset>,
    pub window_end: DateTime<FixedOffset>,
}

impl AlertNotification {
    pub fn new(monitor: &Monitor, config: &AlertsConfiguration, rate: &SuccessRate) -> Self {
        let offset = config.offset();
        Self {
            monitor_id: monitor.id,
            monitor_name: monitor.name.clone(),
            method: monitor.method.to_string(),
            url: monitor.url.clone(),
            threshold: config.threshold(),
            success_rate: rate.rate,
            window_start: rate.window_start.with_timezone(&offset),
            window_end: rate.window_end.with_timezone(&offset),
        }
    }

    pub fn title(&self) -> String {
        format!("[apiwatch] {} is failing", self.monitor_name)
    }

    pub fn formatted_rate(&self) -> String {
        format!("{:.2}", self.success_rate)
    }

    pub fn formatted_window_start(&self) -> String {
        self.window_start.format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn formatted_window_end(&self) -> String {
        self.window_end.format(TIMESTAMP_FORMAT).to_string()
    }

    pub fn context(&self) -> Context {
        let mut context = Context::new();
        context.insert("monitor_id", &self.monitor_id);
        context.insert("monitor_name", &self.monitor_name);
        context.insert("method", &self.method);
        context.insert("url", &self.url);
        context.insert("threshold", &format!("{:.0}", self.threshold));
        context.insert("success_rate", &self.formatted_rate());
        context.insert("window_start", &self.formatted_window_start());
        context.insert("window_end", &self.formatted_window_end());
        context
    }

    /// Plain-text message body shared by every channel.
    pub fn render_message(&self) -> Result<String, tera::Error> {
        Tera::one_off(MESSAGE_TEMPLATE, &self.context(), false)
    }
}
