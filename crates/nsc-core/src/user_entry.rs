use crate::treatments::{ContractError, EntityFamily};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Action {
    TtDeletedFromNs,
    CareportalDeletedFromNs,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::TtDeletedFromNs => "TT_DELETED_FROM_NS",
            Action::CareportalDeletedFromNs => "CAREPORTAL_DELETED_FROM_NS",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Action {
    type Err = ContractError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        match input.trim() {
            "TT_DELETED_FROM_NS" => Ok(Action::TtDeletedFromNs),
            "CAREPORTAL_DELETED_FROM_NS" => Ok(Action::CareportalDeletedFromNs),
            other => Err(ContractError::UnknownVariant {
                kind: "user entry action",
                value: other.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Units {
    #[serde(rename = "")]
    None,
    #[serde(rename = "mg/dl")]
    MgDl,
    #[serde(rename = "U")]
    U,
    #[serde(rename = "U/h")]
    UPerHour,
    #[serde(rename = "g")]
    G,
    #[serde(rename = "m")]
    M,
    #[serde(rename = "timestamp")]
    Timestamp,
    #[serde(rename = "therapy_event")]
    TherapyEvent,
}

impl Units {
    pub fn as_str(&self) -> &'static str {
        match self {
            Units::None => "",
            Units::MgDl => "mg/dl",
            Units::U => "U",
            Units::UPerHour => "U/h",
            Units::G => "g",
            Units::M => "m",
            Units::Timestamp => "timestamp",
            Units::TherapyEvent => "therapy_event",
        }
    }
}

/// Value carried by one audit tuple.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum EntryValue {
    Text(String),
    Decimal(f64),
    Integer(i64),
    Timestamp(DateTime<Utc>),
}

impl From<&str> for EntryValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for EntryValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<f64> for EntryValue {
    fn from(value: f64) -> Self {
        Self::Decimal(value)
    }
}

impl From<i64> for EntryValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<DateTime<Utc>> for EntryValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ValueWithUnit {
    pub value: EntryValue,
    pub unit: Units,
    pub shown: bool,
}

impl ValueWithUnit {
    pub fn new(value: impl Into<EntryValue>, unit: Units) -> Self {
        Self {
            value: value.into(),
            unit,
            shown: true,
        }
    }

    pub fn shown_if(mut self, condition: bool) -> Self {
        self.shown = condition;
        self
    }
}

/// One line of the audit trail.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UserEntry {
    pub timestamp: DateTime<Utc>,
    pub action: Action,
    pub family: EntityFamily,
    #[serde(default)]
    pub nightscout_id: Option<String>,
    pub values: Vec<ValueWithUnit>,
}

impl UserEntry {
    pub fn shown_values(&self) -> impl Iterator<Item = &ValueWithUnit> {
        self.values.iter().filter(|value| value.shown)
    }
}
