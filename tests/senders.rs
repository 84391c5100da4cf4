use apiwatch::alerting::SuccessRate;
use apiwatch::db::enums::{AssertionType, BodyType, HttpMethod, ScheduleInterval};
use apiwatch::db::models::{AlertsConfiguration, Monitor};
use apiwatch::notifications::AlertNotification;
use apiwatch::notifications::senders::discord::DiscordSender;
use apiwatch::notifications::senders::pagerduty::PagerDutySender;
use apiwatch::notifications::senders::slack::SlackSender;
use apiwatch::notifications::senders::{NotificationSender, SenderError};
use chrono::{TimeZone, Utc};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn notification() -> AlertNotification {
    let monitor = Monitor {
        id: 3,
        team_id: 1,
        name: "orders".to_string(),
        method: HttpMethod::Get,
        url: "https://shop.example/orders".to_string(),
        body_type: BodyType::Empty,
        schedule_interval: ScheduleInterval::FiveMinutes,
        previous_step_id: None,
        assertion_type: AssertionType::Disabled,
        assertion_value: String::new(),
        is_assertion_json_schema_only: false,
        last_notified: None,
    };
    let rate = SuccessRate::from_counts(
        1,
        1,
        Utc.with_ymd_and_hms(2024, 1, 1, 8, 0, 0).unwrap(),
        Utc.with_ymd_and_hms(2024, 1, 1, 9, 0, 0).unwrap(),
    );
    AlertNotification::new(&monitor, &config(), &rate)
}

fn config() -> AlertsConfiguration {
    let mut config = AlertsConfiguration::default_for_team(1);
    config.slack.active = true;
    config.slack.token = "xoxb-test".to_string();
    config.slack.channel_id = "C123".to_string();
    config.discord.active = true;
    config.pagerduty.active = true;
    config.pagerduty.api_key = "pd-key".to_string();
    config.pagerduty.service_id = "PSERVICE".to_string();
    config.pagerduty.from_email = "oncall@example.com".to_string();
    config
}

#[tokio::test]
async fn slack_posts_to_chat_post_message() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat.postMessage"))
        .and(header("authorization", "Bearer xoxb-test"))
        .and(body_partial_json(json!({"channel": "C123"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ok": true})))
        .expect(1)
        .mount(&server)
        .await;

    let sender = SlackSender::new(reqwest::Client::new(), server.uri());
    sender.send(&config(), &notification()).await.unwrap();
}

#[tokio::test]
async fn slack_error_payload_is_a_send_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"ok": false, "error": "channel_not_found"})),
        )
        .mount(&server)
        .await;

    let sender = SlackSender::new(reqwest::Client::new(), server.uri());
    let err = sender.send(&config(), &notification()).await.unwrap_err();
    assert!(matches!(err, SenderError::SendFailed(ref msg) if msg.contains("channel_not_found")));
}

#[tokio::test]
async fn slack_without_token_is_misconfigured() {
    let mut config = config();
    config.slack.token.clear();
    let sender = SlackSender::new(reqwest::Client::new(), "http://127.0.0.1:9");
    let err = sender.send(&config, &notification()).await.unwrap_err();
    assert!(matches!(err, SenderError::InvalidConfiguration(_)));
}

#[tokio::test]
async fn discord_posts_a_single_embed() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/webhooks/1/abc"))
        .and(body_partial_json(json!({"embeds": [{"title": "[apiwatch] orders is failing"}]})))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = config();
    config.discord.webhook_url = format!("{}/api/webhooks/1/abc", server.uri());
    DiscordSender::default()
        .send(&config, &notification())
        .await
        .unwrap();
}

#[tokio::test]
async fn discord_non_success_status_is_a_send_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string("Unknown Webhook"))
        .mount(&server)
        .await;

    let mut config = config();
    config.discord.webhook_url = server.uri();
    let err = DiscordSender::default()
        .send(&config, &notification())
        .await
        .unwrap_err();
    assert!(matches!(err, SenderError::SendFailed(ref msg) if msg.contains("Unknown Webhook")));
}

#[tokio::test]
async fn pagerduty_creates_an_incident_on_the_service() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/incidents"))
        .and(header("authorization", "Token token=pd-key"))
        .and(header("from", "oncall@example.com"))
        .and(body_partial_json(json!({
            "incident": {
                "type": "incident",
                "service": {"id": "PSERVICE", "type": "service_reference"}
            }
        })))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"incident": {"id": "Q1"}})))
        .expect(1)
        .mount(&server)
        .await;

    let sender = PagerDutySender::new(reqwest::Client::new(), server.uri());
    sender.send(&config(), &notification()).await.unwrap();
}
