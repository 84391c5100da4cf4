use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "monitors")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    pub team_id: i32,
    pub name: String,
    pub method: String,
    pub url: String,
    pub body_type: String,
    pub schedule_interval_minutes: i32,
    #[sea_orm(nullable)]
    pub previous_step_id: Option<i32>,
    pub assertion_type: String,
    #[sea_orm(column_type = "Text")]
    pub assertion_value: String,
    pub is_assertion_json_schema_only: bool,
    #[sea_orm(nullable)]
    pub last_notified: Option<ChronoDateTimeUtc>,
    pub created_at: ChronoDateTimeUtc,
    pub updated_at: ChronoDateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::monitor_header::Entity")]
    MonitorHeader,
    #[sea_orm(has_many = "super::monitor_query_param::Entity")]
    MonitorQueryParam,
    #[sea_orm(has_many = "super::monitor_body_form::Entity")]
    MonitorBodyForm,
    #[sea_orm(has_one = "super::monitor_raw_body::Entity")]
    MonitorRawBody,
    #[sea_orm(has_many = "super::monitor_excluded_key::Entity")]
    MonitorExcludedKey,
    #[sea_orm(has_many = "super::monitor_result::Entity")]
    MonitorResult,
}

impl Related<super::monitor_header::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MonitorHeader.def()
    }
}

impl Related<super::monitor_query_param::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MonitorQueryParam.def()
    }
}

impl Related<super::monitor_body_form::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MonitorBodyForm.def()
    }
}

impl Related<super::monitor_raw_body::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MonitorRawBody.def()
    }
}

impl Related<super::monitor_excluded_key::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MonitorExcludedKey.def()
    }
}

impl Related<super::monitor_result::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::MonitorResult.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
