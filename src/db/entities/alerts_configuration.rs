use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "alerts_configurations")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[sea_orm(unique)]
    pub team_id: i32,
    pub threshold_pct: i32,
    pub time_window: String,
    pub utc_offset: String,

    pub is_slack_active: bool,
    pub slack_token: String,
    pub slack_channel_id: String,

    pub is_discord_active: bool,
    pub discord_webhook_url: String,

    pub is_pagerduty_active: bool,
    pub pagerduty_api_key: String,
    pub pagerduty_service_id: String,
    pub pagerduty_from_email: String,

    pub is_email_active: bool,
    pub email_smtp_host: String,
    pub email_smtp_port: i32,
    pub email_smtp_user: String,
    pub email_smtp_password: String,
    pub email_from: String,
    pub email_to: String,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
