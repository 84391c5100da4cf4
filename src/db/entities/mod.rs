pub mod alerts_configuration;
pub mod monitor;
pub mod monitor_body_form;
pub mod monitor_excluded_key;
pub mod monitor_header;
pub mod monitor_query_param;
pub mod monitor_raw_body;
pub mod monitor_result;

pub mod prelude {
    pub use super::alerts_configuration::Entity as AlertsConfiguration;
    pub use super::monitor::Entity as Monitor;
    pub use super::monitor_body_form::Entity as MonitorBodyForm;
    pub use super::monitor_excluded_key::Entity as MonitorExcludedKey;
    pub use super::monitor_header::Entity as MonitorHeader;
    pub use super::monitor_query_param::Entity as MonitorQueryParam;
    pub use super::monitor_raw_body::Entity as MonitorRawBody;
    pub use super::monitor_result::Entity as MonitorResult;
}
