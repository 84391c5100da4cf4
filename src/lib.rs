pub mod config;
pub mod db;
pub mod lifecycle;
pub mod probe;
pub mod queue;
pub mod version;

pub mod alerting;
pub mod notifications;
