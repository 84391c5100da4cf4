use serde::{Deserialize, Serialize};
use std::{fmt, str::FromStr, time::Duration};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {kind} value: {value}")]
pub struct ParseEnumError {
    pub kind: &'static str,
    pub value: String,
}

impl ParseEnumError {
    fn new(kind: &'static str, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Patch,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl From<HttpMethod> for reqwest::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
            HttpMethod::Patch => reqwest::Method::PATCH,
            HttpMethod::Put => reqwest::Method::PUT,
            HttpMethod::Delete => reqwest::Method::DELETE,
        }
    }
}

impl FromStr for HttpMethod {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "GET" => Ok(HttpMethod::Get),
            "POST" => Ok(HttpMethod::Post),
            "PATCH" => Ok(HttpMethod::Patch),
            "PUT" => Ok(HttpMethod::Put),
            "DELETE" => Ok(HttpMethod::Delete),
            _ => Err(ParseEnumError::new("http method", s)),
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum BodyType {
    Empty,
    Form,
    Raw,
}

impl FromStr for BodyType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "EMPTY" => Ok(BodyType::Empty),
            "FORM" => Ok(BodyType::Form),
            "RAW" => Ok(BodyType::Raw),
            _ => Err(ParseEnumError::new("body type", s)),
        }
    }
}

impl fmt::Display for BodyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            BodyType::Empty => "EMPTY",
            BodyType::Form => "FORM",
            BodyType::Raw => "RAW",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssertionType {
    Disabled,
    Text,
    Json,
}

impl FromStr for AssertionType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "DISABLED" => Ok(AssertionType::Disabled),
            "TEXT" => Ok(AssertionType::Text),
            "JSON" => Ok(AssertionType::Json),
            _ => Err(ParseEnumError::new("assertion type", s)),
        }
    }
}

impl fmt::Display for AssertionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssertionType::Disabled => "DISABLED",
            AssertionType::Text => "TEXT",
            AssertionType::Json => "JSON",
        };
        f.write_str(s)
    }
}

/// How often a monitor is probed. Stored as a number of minutes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum ScheduleInterval {
    OneMinute,
    TwoMinutes,
    ThreeMinutes,
    FiveMinutes,
    TenMinutes,
    FifteenMinutes,
    ThirtyMinutes,
    SixtyMinutes,
}

impl ScheduleInterval {
    pub fn minutes(&self) -> i32 {
        match self {
            ScheduleInterval::OneMinute => 1,
            ScheduleInterval::TwoMinutes => 2,
            ScheduleInterval::ThreeMinutes => 3,
            ScheduleInterval::FiveMinutes => 5,
            ScheduleInterval::TenMinutes => 10,
            ScheduleInterval::FifteenMinutes => 15,
            ScheduleInterval::ThirtyMinutes => 30,
            ScheduleInterval::SixtyMinutes => 60,
        }
    }

    pub fn as_duration(&self) -> Duration {
        Duration::from_secs(self.minutes() as u64 * 60)
    }

    pub fn as_chrono(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.minutes() as i64)
    }
}

impl TryFrom<i32> for ScheduleInterval {
    type Error = ParseEnumError;

    fn try_from(minutes: i32) -> Result<Self, Self::Error> {
        match minutes {
            1 => Ok(ScheduleInterval::OneMinute),
            2 => Ok(ScheduleInterval::TwoMinutes),
            3 => Ok(ScheduleInterval::ThreeMinutes),
            5 => Ok(ScheduleInterval::FiveMinutes),
            10 => Ok(ScheduleInterval::TenMinutes),
            15 => Ok(ScheduleInterval::FifteenMinutes),
            30 => Ok(ScheduleInterval::ThirtyMinutes),
            60 => Ok(ScheduleInterval::SixtyMinutes),
            _ => Err(ParseEnumError::new("schedule interval", minutes.to_string())),
        }
    }
}

impl From<ScheduleInterval> for i32 {
    fn from(interval: ScheduleInterval) -> Self {
        interval.minutes()
    }
}

/// Trailing window used for success-rate aggregation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeWindow {
    #[serde(rename = "1H")]
    OneHour,
    #[serde(rename = "2H")]
    TwoHours,
    #[serde(rename = "3H")]
    ThreeHours,
    #[serde(rename = "6H")]
    SixHours,
    #[serde(rename = "12H")]
    TwelveHours,
    #[serde(rename = "24H")]
    TwentyFourHours,
}

impl TimeWindow {
    pub fn seconds(&self) -> i64 {
        match self {
            TimeWindow::OneHour => 3600,
            TimeWindow::TwoHours => 7200,
            TimeWindow::ThreeHours => 10800,
            TimeWindow::SixHours => 21600,
            TimeWindow::TwelveHours => 43200,
            TimeWindow::TwentyFourHours => 86400,
        }
    }

    pub fn as_chrono(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.seconds())
    }
}

impl FromStr for TimeWindow {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "1H" => Ok(TimeWindow::OneHour),
            "2H" => Ok(TimeWindow::TwoHours),
            "3H" => Ok(TimeWindow::ThreeHours),
            "6H" => Ok(TimeWindow::SixHours),
            "12H" => Ok(TimeWindow::TwelveHours),
            "24H" => Ok(TimeWindow::TwentyFourHours),
            _ => Err(ParseEnumError::new("time window", s)),
        }
    }
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TimeWindow::OneHour => "1H",
            TimeWindow::TwoHours => "2H",
            TimeWindow::ThreeHours => "3H",
            TimeWindow::SixHours => "6H",
            TimeWindow::TwelveHours => "12H",
            TimeWindow::TwentyFourHours => "24H",
        };
        f.write_str(s)
    }
}
