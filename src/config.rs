//! Process configuration, layered as `.env` < TOML file < environment.

use serde::Deserialize;
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::notifications::senders::pagerduty::DEFAULT_PAGERDUTY_API_URL;
use crate::notifications::senders::slack::DEFAULT_SLACK_API_URL;

const DEFAULT_PROBE_WORKERS: u64 = 3;
const DEFAULT_ALERT_WORKERS: u64 = 1;
const DEFAULT_ALERT_CHECK_INTERVAL_SECS: u64 = 60;
const DEFAULT_SCHEDULER_TICK_SECS: u64 = 60;
const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse TOML from config file at {path}: {source}")]
    ParseFile {
        path: String,
        source: toml::de::Error,
    },
    #[error("Failed to load config from environment: {0}")]
    Environment(#[from] envy::Error),
    #[error("{0} is required")]
    Missing(&'static str),
}

#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub database_url: String,
    pub probe_workers: usize,
    /// Workers per alert channel.
    pub alert_workers: usize,
    pub alert_check_interval: Duration,
    pub scheduler_tick: Duration,
    pub request_timeout: Duration,
    pub log_dir: String,
    pub slack_api_url: String,
    pub pagerduty_api_url: String,
    /// Settings that held an unusable value and were replaced by their default.
    pub fallbacks: Vec<String>,
}

/// Integers may come from TOML as numbers or from the environment as text.
#[derive(Deserialize, Debug, Clone, PartialEq)]
#[serde(untagged)]
enum Setting {
    Number(i64),
    Text(String),
}

impl Setting {
    fn as_positive(&self) -> Option<u64> {
        let value = match self {
            Setting::Number(n) => u64::try_from(*n).ok(),
            Setting::Text(s) => s.trim().parse::<u64>().ok(),
        };
        value.filter(|v| *v > 0)
    }
}

// Partial config for layering
#[derive(Deserialize, Default, Debug)]
struct PartialEngineConfig {
    database_url: Option<String>,
    probe_workers: Option<Setting>,
    alert_workers: Option<Setting>,
    alert_check_interval: Option<Setting>,
    scheduler_tick: Option<Setting>,
    request_timeout: Option<Setting>,
    log_dir: Option<String>,
    slack_api_url: Option<String>,
    pagerduty_api_url: Option<String>,
}

fn default_log_dir() -> String {
    "logs".to_string()
}

fn positive_or_default(
    name: &str,
    env: Option<Setting>,
    file: Option<Setting>,
    default: u64,
    fallbacks: &mut Vec<String>,
) -> u64 {
    match env.or(file) {
        None => default,
        Some(setting) => setting.as_positive().unwrap_or_else(|| {
            fallbacks.push(format!("{name} is not a positive integer, using {default}"));
            default
        }),
    }
}

impl EngineConfig {
    pub fn load(config_path: Option<&str>) -> Result<Self, ConfigError> {
        dotenv::dotenv().ok();

        let file_config = match config_path {
            Some(path_str) => read_file_layer(Path::new(path_str))?,
            None => PartialEngineConfig::default(),
        };
        let env_config = envy::from_env::<PartialEngineConfig>()?;

        Self::merge(env_config, file_config)
    }

    // Environment overrides file.
    fn merge(env: PartialEngineConfig, file: PartialEngineConfig) -> Result<Self, ConfigError> {
        let mut fallbacks = Vec::new();

        let probe_workers = positive_or_default(
            "probe_workers",
            env.probe_workers,
            file.probe_workers,
            DEFAULT_PROBE_WORKERS,
            &mut fallbacks,
        );
        let alert_workers = positive_or_default(
            "alert_workers",
            env.alert_workers,
            file.alert_workers,
            DEFAULT_ALERT_WORKERS,
            &mut fallbacks,
        );
        let alert_check_interval = positive_or_default(
            "alert_check_interval",
            env.alert_check_interval,
            file.alert_check_interval,
            DEFAULT_ALERT_CHECK_INTERVAL_SECS,
            &mut fallbacks,
        );
        let scheduler_tick = positive_or_default(
            "scheduler_tick",
            env.scheduler_tick,
            file.scheduler_tick,
            DEFAULT_SCHEDULER_TICK_SECS,
            &mut fallbacks,
        );
        let request_timeout = positive_or_default(
            "request_timeout",
            env.request_timeout,
            file.request_timeout,
            DEFAULT_REQUEST_TIMEOUT_SECS,
            &mut fallbacks,
        );

        Ok(EngineConfig {
            database_url: env
                .database_url
                .or(file.database_url)
                .ok_or(ConfigError::Missing("DATABASE_URL"))?,
            probe_workers: probe_workers as usize,
            alert_workers: alert_workers as usize,
            alert_check_interval: Duration::from_secs(alert_check_interval),
            scheduler_tick: Duration::from_secs(scheduler_tick),
            request_timeout: Duration::from_secs(request_timeout),
            log_dir: env.log_dir.or(file.log_dir).unwrap_or_else(default_log_dir),
            slack_api_url: env
                .slack_api_url
                .or(file.slack_api_url)
                .unwrap_or_else(|| DEFAULT_SLACK_API_URL.to_string()),
            pagerduty_api_url: env
                .pagerduty_api_url
                .or(file.pagerduty_api_url)
                .unwrap_or_else(|| DEFAULT_PAGERDUTY_API_URL.to_string()),
            fallbacks,
        })
    }
}

fn read_file_layer(path: &Path) -> Result<PartialEngineConfig, ConfigError> {
    if !path.exists() {
        return Ok(PartialEngineConfig::default());
    }
    let contents = fs::read_to_string(path).map_err(|source| ConfigError::ReadFile {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::ParseFile {
        path: path.display().to_string(),
        source,
    })
}
