use crate::user_entry::{Action, Units, UserEntry, ValueWithUnit};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

const MS_PER_MINUTE: i64 = 60_000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContractError {
    #[error("unknown {kind}: {value}")]
    UnknownVariant { kind: &'static str, value: String },
}

/// Entity families reconciled against remote deletions.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(rename_all = "snake_case")]
pub enum EntityFamily {
    TemporaryTarget,
    TherapyEvent,
    Bolus,
    Carbs,
    TemporaryBasal,
    ExtendedBolus,
}

impl EntityFamily {
    /// Processing order for every batch record. Audit ordering depends on it.
    pub const ALL: [EntityFamily; 6] = [
        EntityFamily::TemporaryTarget,
        EntityFamily::TherapyEvent,
        EntityFamily::Bolus,
        EntityFamily::Carbs,
        EntityFamily::TemporaryBasal,
        EntityFamily::ExtendedBolus,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityFamily::TemporaryTarget => "temporary_target",
            EntityFamily::TherapyEvent => "therapy_event",
            EntityFamily::Bolus => "bolus",
            EntityFamily::Carbs => "carbs",
            EntityFamily::TemporaryBasal => "temporary_basal",
            EntityFamily::ExtendedBolus => "extended_bolus",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EntityFamily::TemporaryTarget => "temporary target",
            EntityFamily::TherapyEvent => "therapy event",
            EntityFamily::Bolus => "bolus",
            EntityFamily::Carbs => "carbs",
            EntityFamily::TemporaryBasal => "temporary basal",
            EntityFamily::ExtendedBolus => "extended bolus",
        }
    }
}

impl fmt::Display for EntityFamily {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityFamily {
    type Err = ContractError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        EntityFamily::ALL
            .into_iter()
            .find(|family| family.as_str() == input.trim())
            .ok_or_else(|| ContractError::UnknownVariant {
                kind: "entity family",
                value: input.to_string(),
            })
    }
}

/// Columns shared by every family.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RecordMeta {
    pub id: i64,
    #[serde(default)]
    pub nightscout_id: Option<String>,
    pub is_valid: bool,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
}

impl RecordMeta {
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            id: 0,
            nightscout_id: None,
            is_valid: true,
            timestamp,
            modified_at: None,
        }
    }

    pub fn with_nightscout_id(mut self, nightscout_id: impl Into<String>) -> Self {
        self.nightscout_id = Some(nightscout_id.into());
        self
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TemporaryTargetReason {
    Custom,
    Hypoglycemia,
    Activity,
    EatingSoon,
    Automation,
    Wear,
}

impl TemporaryTargetReason {
    const ALL: [TemporaryTargetReason; 6] = [
        TemporaryTargetReason::Custom,
        TemporaryTargetReason::Hypoglycemia,
        TemporaryTargetReason::Activity,
        TemporaryTargetReason::EatingSoon,
        TemporaryTargetReason::Automation,
        TemporaryTargetReason::Wear,
    ];

    pub fn text(&self) -> &'static str {
        match self {
            TemporaryTargetReason::Custom => "Custom",
            TemporaryTargetReason::Hypoglycemia => "Hypo",
            TemporaryTargetReason::Activity => "Activity",
            TemporaryTargetReason::EatingSoon => "Eating Soon",
            TemporaryTargetReason::Automation => "Automation",
            TemporaryTargetReason::Wear => "Wear",
        }
    }
}

impl FromStr for TemporaryTargetReason {
    type Err = ContractError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|reason| reason.text() == input)
            .ok_or_else(|| ContractError::UnknownVariant {
                kind: "temporary target reason",
                value: input.to_string(),
            })
    }
}

/// Careportal event types, stored by their Nightscout `eventType` text.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TherapyEventType {
    None,
    Note,
    Question,
    Announcement,
    CannulaChange,
    InsulinChange,
    PumpBatteryChange,
    SensorChange,
    SensorStart,
    FingerStick,
    Exercise,
    ApsOffline,
}

impl TherapyEventType {
    const ALL: [TherapyEventType; 12] = [
        TherapyEventType::None,
        TherapyEventType::Note,
        TherapyEventType::Question,
        TherapyEventType::Announcement,
        TherapyEventType::CannulaChange,
        TherapyEventType::InsulinChange,
        TherapyEventType::PumpBatteryChange,
        TherapyEventType::SensorChange,
        TherapyEventType::SensorStart,
        TherapyEventType::FingerStick,
        TherapyEventType::Exercise,
        TherapyEventType::ApsOffline,
    ];

    pub fn text(&self) -> &'static str {
        match self {
            TherapyEventType::None => "<none>",
            TherapyEventType::Note => "Note",
            TherapyEventType::Question => "Question",
            TherapyEventType::Announcement => "Announcement",
            TherapyEventType::CannulaChange => "Site Change",
            TherapyEventType::InsulinChange => "Insulin Change",
            TherapyEventType::PumpBatteryChange => "Pump Battery Change",
            TherapyEventType::SensorChange => "Sensor Change",
            TherapyEventType::SensorStart => "Sensor Start",
            TherapyEventType::FingerStick => "BG Check",
            TherapyEventType::Exercise => "Exercise",
            TherapyEventType::ApsOffline => "OpenAPS Offline",
        }
    }
}

impl FromStr for TherapyEventType {
    type Err = ContractError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|event_type| event_type.text() == input)
            .ok_or_else(|| ContractError::UnknownVariant {
                kind: "therapy event type",
                value: input.to_string(),
            })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemporaryTarget {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub reason: TemporaryTargetReason,
    pub low_target: f64,
    pub high_target: f64,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TherapyEvent {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub event_type: TherapyEventType,
    #[serde(default)]
    pub note: Option<String>,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Bolus {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub amount: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Carbs {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub amount: f64,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TemporaryBasal {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub rate: f64,
    pub duration_ms: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ExtendedBolus {
    #[serde(flatten)]
    pub meta: RecordMeta,
    pub amount: f64,
    pub duration_ms: i64,
}

/// Capabilities shared by the six family record types.
pub trait FamilyRecord {
    const FAMILY: EntityFamily;

    fn meta(&self) -> &RecordMeta;

    fn meta_mut(&mut self) -> &mut RecordMeta;

    /// Audit tuples describing the record's defining fields, in display order.
    fn removal_values(&self) -> Vec<ValueWithUnit>;

    fn removal_action(&self) -> Action {
        Action::CareportalDeletedFromNs
    }
}

impl FamilyRecord for TemporaryTarget {
    const FAMILY: EntityFamily = EntityFamily::TemporaryTarget;

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn removal_values(&self) -> Vec<ValueWithUnit> {
        vec![
            ValueWithUnit::new(self.reason.text(), Units::TherapyEvent),
            ValueWithUnit::new(self.low_target, Units::MgDl),
            ValueWithUnit::new(self.high_target, Units::MgDl)
                .shown_if(self.low_target != self.high_target),
            ValueWithUnit::new(self.duration_ms / MS_PER_MINUTE, Units::M)
                .shown_if(self.duration_ms != 0),
        ]
    }

    fn removal_action(&self) -> Action {
        Action::TtDeletedFromNs
    }
}

impl FamilyRecord for TherapyEvent {
    const FAMILY: EntityFamily = EntityFamily::TherapyEvent;

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn removal_values(&self) -> Vec<ValueWithUnit> {
        vec![
            ValueWithUnit::new(self.note.clone().unwrap_or_default(), Units::None),
            ValueWithUnit::new(self.meta.timestamp, Units::Timestamp),
            ValueWithUnit::new(self.event_type.text(), Units::TherapyEvent),
        ]
    }
}

impl FamilyRecord for Bolus {
    const FAMILY: EntityFamily = EntityFamily::Bolus;

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn removal_values(&self) -> Vec<ValueWithUnit> {
        vec![
            ValueWithUnit::new(self.meta.timestamp, Units::Timestamp),
            ValueWithUnit::new(self.amount, Units::U),
        ]
    }
}

impl FamilyRecord for Carbs {
    const FAMILY: EntityFamily = EntityFamily::Carbs;

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn removal_values(&self) -> Vec<ValueWithUnit> {
        vec![
            ValueWithUnit::new(self.meta.timestamp, Units::Timestamp),
            ValueWithUnit::new(self.amount, Units::G),
        ]
    }
}

impl FamilyRecord for TemporaryBasal {
    const FAMILY: EntityFamily = EntityFamily::TemporaryBasal;

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn removal_values(&self) -> Vec<ValueWithUnit> {
        vec![
            ValueWithUnit::new(self.meta.timestamp, Units::Timestamp),
            ValueWithUnit::new(self.rate, Units::UPerHour),
        ]
    }
}

impl FamilyRecord for ExtendedBolus {
    const FAMILY: EntityFamily = EntityFamily::ExtendedBolus;

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }

    fn meta_mut(&mut self) -> &mut RecordMeta {
        &mut self.meta
    }

    fn removal_values(&self) -> Vec<ValueWithUnit> {
        vec![
            ValueWithUnit::new(self.meta.timestamp, Units::Timestamp),
            ValueWithUnit::new(self.amount, Units::U),
        ]
    }
}

/// A record of any family, as returned by an invalidation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "family", rename_all = "snake_case")]
pub enum Treatment {
    TemporaryTarget(TemporaryTarget),
    TherapyEvent(TherapyEvent),
    Bolus(Bolus),
    Carbs(Carbs),
    TemporaryBasal(TemporaryBasal),
    ExtendedBolus(ExtendedBolus),
}

impl Treatment {
    pub fn family(&self) -> EntityFamily {
        match self {
            Treatment::TemporaryTarget(_) => EntityFamily::TemporaryTarget,
            Treatment::TherapyEvent(_) => EntityFamily::TherapyEvent,
            Treatment::Bolus(_) => EntityFamily::Bolus,
            Treatment::Carbs(_) => EntityFamily::Carbs,
            Treatment::TemporaryBasal(_) => EntityFamily::TemporaryBasal,
            Treatment::ExtendedBolus(_) => EntityFamily::ExtendedBolus,
        }
    }

    pub fn meta(&self) -> &RecordMeta {
        match self {
            Treatment::TemporaryTarget(record) => record.meta(),
            Treatment::TherapyEvent(record) => record.meta(),
            Treatment::Bolus(record) => record.meta(),
            Treatment::Carbs(record) => record.meta(),
            Treatment::TemporaryBasal(record) => record.meta(),
            Treatment::ExtendedBolus(record) => record.meta(),
        }
    }

    /// Builds the "deleted by Nightscout" audit entry for this record.
    pub fn removal_entry(&self, at: DateTime<Utc>) -> UserEntry {
        let (action, values) = match self {
            Treatment::TemporaryTarget(record) => (record.removal_action(), record.removal_values()),
            Treatment::TherapyEvent(record) => (record.removal_action(), record.removal_values()),
            Treatment::Bolus(record) => (record.removal_action(), record.removal_values()),
            Treatment::Carbs(record) => (record.removal_action(), record.removal_values()),
            Treatment::TemporaryBasal(record) => (record.removal_action(), record.removal_values()),
            Treatment::ExtendedBolus(record) => (record.removal_action(), record.removal_values()),
        };
        UserEntry {
            timestamp: at,
            action,
            family: self.family(),
            nightscout_id: self.meta().nightscout_id.clone(),
            values,
        }
    }
}

impl From<TemporaryTarget> for Treatment {
    fn from(record: TemporaryTarget) -> Self {
        Self::TemporaryTarget(record)
    }
}

impl From<TherapyEvent> for Treatment {
    fn from(record: TherapyEvent) -> Self {
        Self::TherapyEvent(record)
    }
}

impl From<Bolus> for Treatment {
    fn from(record: Bolus) -> Self {
        Self::Bolus(record)
    }
}

impl From<Carbs> for Treatment {
    fn from(record: Carbs) -> Self {
        Self::Carbs(record)
    }
}

impl From<TemporaryBasal> for Treatment {
    fn from(record: TemporaryBasal) -> Self {
        Self::TemporaryBasal(record)
    }
}

impl From<ExtendedBolus> for Treatment {
    fn from(record: ExtendedBolus) -> Self {
        Self::ExtendedBolus(record)
    }
}
