use crate::errors::{AppError, AppResult};
use crate::filter::enabled_total;
use crate::models::MetricKind;
use crate::sources::EnabledSet;
use crate::store::Entity;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SortKey {
    Index,
    Label,
    Successes,
    Failures,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Index => "index",
            Self::Label => "label",
            Self::Successes => "successes",
            Self::Failures => "failures",
        }
    }

    pub fn value(self, entity: &Entity, enabled: &impl EnabledSet) -> SortValue {
        match self {
            Self::Index => SortValue::Index(entity.index()),
            Self::Label => SortValue::Text(entity.label().to_string()),
            Self::Successes => SortValue::Count(enabled_total(entity, MetricKind::ValidationSuccess, enabled)),
            Self::Failures => SortValue::Count(enabled_total(entity, MetricKind::PinningFailure, enabled)),
        }
    }
}

impl FromStr for SortKey {
    type Err = AppError;

    fn from_str(value: &str) -> AppResult<Self> {
        match value {
            "index" => Ok(Self::Index),
            "label" | "name" => Ok(Self::Label),
            "successes" | "getEnabledSuccesses" => Ok(Self::Successes),
            "failures" | "getEnabledFailures" => Ok(Self::Failures),
            other => Err(AppError::Contract(format!("unknown sort key: {}", other))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub enum SortValue {
    Index(usize),
    Count(u64),
    Text(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn apply(self, ordering: Ordering) -> Ordering {
        match self {
            Self::Ascending => ordering,
            Self::Descending => ordering.reverse(),
        }
    }

    fn flipped(self) -> Self {
        match self {
            Self::Ascending => Self::Descending,
            Self::Descending => Self::Ascending,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SortState {
    pub key: SortKey,
    pub direction: SortDirection,
}

impl SortState {
    pub fn new(key: SortKey) -> Self {
        Self {
            key,
            direction: SortDirection::Ascending,
        }
    }

    pub fn select(&mut self, key: SortKey) {
        if key == self.key {
            self.direction = self.direction.flipped();
        } else {
            self.key = key;
            self.direction = SortDirection::Ascending;
        }
    }
}

impl Default for SortState {
    fn default() -> Self {
        Self::new(SortKey::Index)
    }
}

pub fn compare(
    a: &Entity,
    b: &Entity,
    key: SortKey,
    direction: SortDirection,
    enabled: &impl EnabledSet,
) -> Ordering {
    direction.apply(key.value(a, enabled).cmp(&key.value(b, enabled)))
}

pub fn sort_entities(entities: &mut [&Entity], state: SortState, enabled: &impl EnabledSet) {
    entities.sort_by(|a, b| compare(a, b, state.key, state.direction, enabled));
}
