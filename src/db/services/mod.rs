pub mod monitor_service;

pub use monitor_service::*;
