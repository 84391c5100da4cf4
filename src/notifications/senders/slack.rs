use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use super::{NotificationSender, SenderError, ensure_success, require};
use crate::db::models::AlertsConfiguration;
use crate::notifications::models::{AlertNotification, Channel};

pub const DEFAULT_SLACK_API_URL: &str = "https://slack.com/api";

/// Posts alerts to a channel through the Slack Web API (`chat.postMessage`).
pub struct SlackSender {
    client: Client,
    api_url: String,
}

impl Default for SlackSender {
    fn default() -> Self {
        Self::new(Client::new(), DEFAULT_SLACK_API_URL)
    }
}

impl SlackSender {
    pub fn new(client: Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Serialize)]
struct PostMessage<'a> {
    channel: &'a str,
    text: &'a str,
}

#[derive(Deserialize)]
struct PostMessageResponse {
    ok: bool,
    #[serde(default)]
    error: Option<String>,
}

#[async_trait]
impl NotificationSender for SlackSender {
    fn channel(&self) -> Channel {
        Channel::Slack
    }

    #[instrument(skip_all, fields(monitor_id = notification.monitor_id))]
    async fn send(
        &self,
        config: &AlertsConfiguration,
        notification: &AlertNotification,
    ) -> Result<(), SenderError> {
        let token = require(&config.slack.token, "Slack token")?;
        let channel = require(&config.slack.channel_id, "Slack channel id")?;

        let text = format!("*{}*\n{}", notification.title(), notification.render_message()?);
        let payload = PostMessage {
            channel,
            text: &text,
        };

        let response = self
            .client
            .post(format!("{}/chat.postMessage", self.api_url))
            .bearer_auth(token)
            .json(&payload)
            .send()
            .await?;
        let response = ensure_success("Slack API", response).await?;

        // Slack reports most failures with a 200 and `ok: false`.
        let body: PostMessageResponse = response.json().await?;
        if !body.ok {
            return Err(SenderError::SendFailed(format!(
                "Slack API rejected the message: {}",
                body.error.unwrap_or_else(|| "unknown error".to_string())
            )));
        }
        debug!("Slack alert sent.");
        Ok(())
    }
}
