use crate::errors::{AppError, AppResult};
use chrono::NaiveDate;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub type EntityIndex = usize;

static SOURCE_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([A-Za-z][A-Za-z0-9_-]*)/([A-Za-z0-9][A-Za-z0-9._-]*)$").expect("valid source token regex")
});

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SourceId {
    channel: String,
    version: String,
}

impl SourceId {
    pub fn new(channel: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            channel: channel.into(),
            version: version.into(),
        }
    }

    pub fn channel(&self) -> &str {
        &self.channel
    }

    pub fn version(&self) -> &str {
        &self.version
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel, self.version)
    }
}

impl FromStr for SourceId {
    type Err = AppError;

    fn from_str(value: &str) -> AppResult<Self> {
        let caps = SOURCE_TOKEN_RE
            .captures(value.trim())
            .ok_or_else(|| AppError::Contract(format!("malformed source token: {:?}", value)))?;
        Ok(Self::new(&caps[1], &caps[2]))
    }
}

impl TryFrom<String> for SourceId {
    type Error = AppError;

    fn try_from(value: String) -> AppResult<Self> {
        value.parse()
    }
}

impl From<SourceId> for String {
    fn from(value: SourceId) -> Self {
        value.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum MetricKind {
    ValidationSuccess,
    PinningFailure,
}

impl MetricKind {
    pub const ALL: [MetricKind; 2] = [MetricKind::ValidationSuccess, MetricKind::PinningFailure];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::ValidationSuccess => "validationSuccess",
            Self::PinningFailure => "pinningFailure",
        }
    }

    pub fn from_measure(measure: &str, settings: &DashboardSettings) -> AppResult<Self> {
        if measure == settings.success_measure {
            Ok(Self::ValidationSuccess)
        } else if measure == settings.failure_measure {
            Ok(Self::PinningFailure)
        } else {
            Err(AppError::Contract(format!("unknown measure: {}", measure)))
        }
    }

    pub fn measure_name(self, settings: &DashboardSettings) -> &str {
        match self {
            Self::ValidationSuccess => &settings.success_measure,
            Self::PinningFailure => &settings.failure_measure,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceStatus {
    Pending,
    InProgress,
    Complete,
}

impl SourceStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::InProgress => "in-progress",
            Self::Complete => "complete",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SubRange {
    pub from: NaiveDate,
    pub to: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionPoint {
    pub date: NaiveDate,
    pub bins: Vec<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EvolutionChunk {
    pub sub_range: SubRange,
    pub points: Vec<EvolutionPoint>,
}

impl EvolutionChunk {
    pub fn spanning(points: Vec<EvolutionPoint>) -> Option<Self> {
        let from = points.iter().map(|point| point.date).min()?;
        let to = points.iter().map(|point| point.date).max()?;
        Some(Self {
            sub_range: SubRange { from, to },
            points,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RowStatus {
    NoData,
    NoFailures,
    OnlyFailures,
    Mixed,
}

impl RowStatus {
    pub fn classify(successes: u64, failures: u64) -> Self {
        match (successes, failures) {
            (0, 0) => Self::NoData,
            (_, 0) => Self::NoFailures,
            (0, _) => Self::OnlyFailures,
            _ => Self::Mixed,
        }
    }

    pub fn css_class(self) -> &'static str {
        match self {
            Self::NoData => "unusedCA",
            Self::NoFailures => "noFailures",
            Self::OnlyFailures => "onlyFailures",
            Self::Mixed => "someFailures",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub timestamp_ms: i64,
    pub count: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityDetail {
    pub index: EntityIndex,
    pub label: String,
    pub display_label: String,
    pub fingerprint: String,
    pub successes: u64,
    pub failures: u64,
    pub status: RowStatus,
    pub success_series: Vec<SeriesPoint>,
    pub failure_series: Vec<SeriesPoint>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceSnapshot {
    pub source: SourceId,
    pub status: SourceStatus,
    pub enabled: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DashboardSettings {
    pub max_label_len: usize,
    pub success_measure: String,
    pub failure_measure: String,
    pub channel_capacity: usize,
    pub default_sort_key: String,
    pub log_dir: Option<String>,
    pub log_filter: String,
}

impl Default for DashboardSettings {
    fn default() -> Self {
        Self {
            max_label_len: 50,
            success_measure: "CERT_VALIDATION_SUCCESS_BY_CA".to_string(),
            failure_measure: "CERT_PINNING_FAILURES_BY_CA".to_string(),
            channel_capacity: 256,
            default_sort_key: "index".to_string(),
            log_dir: None,
            log_filter: "info".to_string(),
        }
    }
}
