use async_trait::async_trait;
use reqwest::{Client, header};
use serde::Serialize;
use tracing::{debug, instrument};

use super::{NotificationSender, SenderError, ensure_success, require};
use crate::db::models::AlertsConfiguration;
use crate::notifications::models::{AlertNotification, Channel};

pub const DEFAULT_PAGERDUTY_API_URL: &str = "https://api.pagerduty.com";

const PAGERDUTY_ACCEPT: &str = "application/vnd.pagerduty+json;version=2";

/// Opens an incident on the team's PagerDuty service through the REST API.
pub struct PagerDutySender {
    client: Client,
    api_url: String,
}

impl Default for PagerDutySender {
    fn default() -> Self {
        Self::new(Client::new(), DEFAULT_PAGERDUTY_API_URL)
    }
}

impl PagerDutySender {
    pub fn new(client: Client, api_url: impl Into<String>) -> Self {
        Self {
            client,
            api_url: api_url.into().trim_end_matches('/').to_string(),
        }
    }
}

#[derive(Serialize)]
struct CreateIncident<'a> {
    incident: Incident<'a>,
}

#[derive(Serialize)]
struct Incident<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    title: String,
    service: Reference<'a>,
    body: IncidentBody,
}

#[derive(Serialize)]
struct Reference<'a> {
    id: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Serialize)]
struct IncidentBody {
    #[serde(rename = "type")]
    kind: &'static str,
    details: String,
}

#[async_trait]
impl NotificationSender for PagerDutySender {
    fn channel(&self) -> Channel {
        Channel::PagerDuty
    }

    #[instrument(skip_all, fields(monitor_id = notification.monitor_id))]
    async fn send(
        &self,
        config: &AlertsConfiguration,
        notification: &AlertNotification,
    ) -> Result<(), SenderError> {
        let settings = &config.pagerduty;
        let api_key = require(&settings.api_key, "PagerDuty API key")?;
        let service_id = require(&settings.service_id, "PagerDuty service id")?;
        let from_email = require(&settings.from_email, "PagerDuty requester email")?;

        let payload = CreateIncident {
            incident: Incident {
                kind: "incident",
                title: notification.title(),
                service: Reference {
                    id: service_id,
                    kind: "service_reference",
                },
                body: IncidentBody {
                    kind: "incident_body",
                    details: notification.render_message()?,
                },
            },
        };

        let response = self
            .client
            .post(format!("{}/incidents", self.api_url))
            .header(header::AUTHORIZATION, format!("Token token={api_key}"))
            .header(header::ACCEPT, PAGERDUTY_ACCEPT)
            .header(header::FROM, from_email)
            .json(&payload)
            .send()
            .await?;
        ensure_success("PagerDuty API", response).await?;
        debug!("PagerDuty incident created.");
        Ok(())
    }
}
