use async_trait::async_trait;
use lettre::message::Mailbox;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use tracing::{debug, instrument};

use super::{NotificationSender, SenderError, require};
use crate::db::models::{AlertsConfiguration, EmailSettings};
use crate::notifications::models::{AlertNotification, Channel};

/// Mails alerts through the team's SMTP relay (STARTTLS).
#[derive(Default)]
pub struct EmailSender;

impl EmailSender {
    pub fn new() -> Self {
        Self
    }
}

fn parse_mailbox(address: &str, what: &str) -> Result<Mailbox, SenderError> {
    require(address, what)?
        .parse::<Mailbox>()
        .map_err(|e| SenderError::InvalidConfiguration(format!("Invalid {what}: {e}")))
}

fn build_message(settings: &EmailSettings, notification: &AlertNotification) -> Result<Message, SenderError> {
    let from = parse_mailbox(&settings.from_address, "sender address")?;
    let to = parse_mailbox(&settings.to_address, "recipient address")?;

    Message::builder()
        .from(from)
        .to(to)
        .subject(notification.title())
        .header(ContentType::TEXT_PLAIN)
        .body(notification.render_message()?)
        .map_err(|e| SenderError::SendFailed(format!("Failed to build email: {e}")))
}

#[async_trait]
impl NotificationSender for EmailSender {
    fn channel(&self) -> Channel {
        Channel::Email
    }

    #[instrument(skip_all, fields(monitor_id = notification.monitor_id))]
    async fn send(
        &self,
        config: &AlertsConfiguration,
        notification: &AlertNotification,
    ) -> Result<(), SenderError> {
        let settings = &config.email;
        let host = require(&settings.smtp_host, "SMTP host")?;
        let email = build_message(settings, notification)?;

        let mut transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(host)
            .map_err(|e| SenderError::InvalidConfiguration(format!("Invalid SMTP relay: {e}")))?
            .port(settings.smtp_port);
        if !settings.smtp_user.is_empty() {
            transport = transport.credentials(Credentials::new(
                settings.smtp_user.clone(),
                settings.smtp_password.clone(),
            ));
        }

        transport
            .build()
            .send(email)
            .await
            .map_err(|e| SenderError::SendFailed(format!("Email send failed: {e}")))?;
        debug!("Email alert sent.");
        Ok(())
    }
}
