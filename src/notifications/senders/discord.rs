use async_trait::async_trait;
use reqwest::Client;
use serde_json::json;
use tracing::{debug, instrument};

use super::{NotificationSender, SenderError, ensure_success, require};
use crate::db::models::AlertsConfiguration;
use crate::notifications::models::{AlertNotification, Channel};

const EMBED_COLOR_RED: u32 = 0xE7_4C_3C;

/// Posts alerts as a single embed to the team's Discord webhook.
pub struct DiscordSender {
    client: Client,
}

impl Default for DiscordSender {
    fn default() -> Self {
        Self::new(Client::new())
    }
}

impl DiscordSender {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

fn embed_payload(notification: &AlertNotification, description: String) -> serde_json::Value {
    json!({
        "embeds": [{
            "title": notification.title(),
            "description": description,
            "color": EMBED_COLOR_RED,
            "fields": [
                {
                    "name": "Request",
                    "value": format!("{} {}", notification.method, notification.url),
                    "inline": false,
                },
                {
                    "name": "Success rate",
                    "value": format!("{}%", notification.formatted_rate()),
                    "inline": true,
                },
                {
                    "name": "Threshold",
                    "value": format!("{:.0}%", notification.threshold),
                    "inline": true,
                },
                {
                    "name": "Window",
                    "value": format!(
                        "{} to {}",
                        notification.formatted_window_start(),
                        notification.formatted_window_end()
                    ),
                    "inline": false,
                },
            ],
            "timestamp": notification.window_end.to_rfc3339(),
        }]
    })
}

#[async_trait]
impl NotificationSender for DiscordSender {
    fn channel(&self) -> Channel {
        Channel::Discord
    }

    #[instrument(skip_all, fields(monitor_id = notification.monitor_id))]
    async fn send(
        &self,
        config: &AlertsConfiguration,
        notification: &AlertNotification,
    ) -> Result<(), SenderError> {
        let webhook_url = require(&config.discord.webhook_url, "Discord webhook URL")?;
        let payload = embed_payload(notification, notification.render_message()?);

        let response = self.client.post(webhook_url).json(&payload).send().await?;
        ensure_success("Discord webhook", response).await?;
        debug!("Discord alert sent.");
        Ok(())
    }
}
