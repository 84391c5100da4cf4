use async_trait::async_trait;
use thiserror::Error;

use super::models::{AlertNotification, Channel};
use crate::db::models::AlertsConfiguration;

pub mod discord;
pub mod email;
pub mod pagerduty;
pub mod slack;

#[derive(Error, Debug)]
pub enum SenderError {
    #[error("Failed to send notification: {0}")]
    SendFailed(String),
    #[error("Invalid configuration for sender: {0}")]
    InvalidConfiguration(String),
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),
    #[error("Templating error: {0}")]
    TemplatingError(#[from] tera::Error),
}

/// Delivers an alert over one channel using the team's settings for it.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    fn channel(&self) -> Channel;

    /// Sends a notification.
    ///
    /// # Arguments
    ///
    /// * `config` - The team's alert settings; each sender reads its own section.
    /// * `notification` - Monitor, threshold, rate and window to report.
    async fn send(
        &self,
        config: &AlertsConfiguration,
        notification: &AlertNotification,
    ) -> Result<(), SenderError>;
}

/// Turns a non-success HTTP response into `SendFailed`, keeping the body for the log.
pub(crate) async fn ensure_success(
    service: &str,
    response: reqwest::Response,
) -> Result<reqwest::Response, SenderError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let error_body = response
        .text()
        .await
        .unwrap_or_else(|_| "Failed to read error body".to_string());
    Err(SenderError::SendFailed(format!(
        "{service} returned non-success status: {status}. Body: {error_body}"
    )))
}

pub(crate) fn require<'a>(value: &'a str, what: &str) -> Result<&'a str, SenderError> {
    if value.trim().is_empty() {
        Err(SenderError::InvalidConfiguration(format!("{what} is not set")))
    } else {
        Ok(value)
    }
}
