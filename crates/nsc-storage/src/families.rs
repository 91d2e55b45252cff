use crate::StorageError;
use nsc_core::treatments::{
    Bolus, Carbs, ExtendedBolus, FamilyRecord, RecordMeta, TemporaryBasal, TemporaryTarget,
    TemporaryTargetReason, TherapyEvent, TherapyEventType, Treatment,
};
use rusqlite::types::Value as SqlValue;
use rusqlite::Row;

/// Table descriptor for one entity family.
///
/// Every family table starts with the shared header columns
/// (`id, nightscout_id, is_valid, timestamp, modified_at`), followed by
/// `PAYLOAD_COLUMNS` in the order `payload_values` and `from_row` use.
pub trait StoredFamily: FamilyRecord + Into<Treatment> + Sized {
    const TABLE: &'static str;
    const PAYLOAD_COLUMNS: &'static [&'static str];

    fn payload_values(&self) -> Vec<SqlValue>;

    fn from_row(meta: RecordMeta, row: &Row<'_>, offset: usize) -> Result<Self, StorageError>;
}

impl StoredFamily for TemporaryTarget {
    const TABLE: &'static str = "temporary_targets";
    const PAYLOAD_COLUMNS: &'static [&'static str] =
        &["reason", "low_target", "high_target", "duration_ms"];

    fn payload_values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(self.reason.text().to_string()),
            SqlValue::Real(self.low_target),
            SqlValue::Real(self.high_target),
            SqlValue::Integer(self.duration_ms),
        ]
    }

    fn from_row(meta: RecordMeta, row: &Row<'_>, offset: usize) -> Result<Self, StorageError> {
        let reason: String = row.get(offset)?;
        Ok(Self {
            meta,
            reason: reason.parse::<TemporaryTargetReason>()?,
            low_target: row.get(offset + 1)?,
            high_target: row.get(offset + 2)?,
            duration_ms: row.get(offset + 3)?,
        })
    }
}

impl StoredFamily for TherapyEvent {
    const TABLE: &'static str = "therapy_events";
    const PAYLOAD_COLUMNS: &'static [&'static str] = &["event_type", "note", "duration_ms"];

    fn payload_values(&self) -> Vec<SqlValue> {
        vec![
            SqlValue::Text(self.event_type.text().to_string()),
            self.note.clone().map_or(SqlValue::Null, SqlValue::Text),
            SqlValue::Integer(self.duration_ms),
        ]
    }

    fn from_row(meta: RecordMeta, row: &Row<'_>, offset: usize) -> Result<Self, StorageError> {
        let event_type: String = row.get(offset)?;
        Ok(Self {
            meta,
            event_type: event_type.parse::<TherapyEventType>()?,
            note: row.get(offset + 1)?,
            duration_ms: row.get(offset + 2)?,
        })
    }
}

impl StoredFamily for Bolus {
    const TABLE: &'static str = "boluses";
    const PAYLOAD_COLUMNS: &'static [&'static str] = &["amount"];

    fn payload_values(&self) -> Vec<SqlValue> {
        vec![SqlValue::Real(self.amount)]
    }

    fn from_row(meta: RecordMeta, row: &Row<'_>, offset: usize) -> Result<Self, StorageError> {
        Ok(Self {
            meta,
            amount: row.get(offset)?,
        })
    }
}

impl StoredFamily for Carbs {
    const TABLE: &'static str = "carbs";
    const PAYLOAD_COLUMNS: &'static [&'static str] = &["amount", "duration_ms"];

    fn payload_values(&self) -> Vec<SqlValue> {
        vec![SqlValue::Real(self.amount), SqlValue::Integer(self.duration_ms)]
    }

    fn from_row(meta: RecordMeta, row: &Row<'_>, offset: usize) -> Result<Self, StorageError> {
        Ok(Self {
            meta,
            amount: row.get(offset)?,
            duration_ms: row.get(offset + 1)?,
        })
    }
}

impl StoredFamily for TemporaryBasal {
    const TABLE: &'static str = "temporary_basals";
    const PAYLOAD_COLUMNS: &'static [&'static str] = &["rate", "duration_ms"];

    fn payload_values(&self) -> Vec<SqlValue> {
        vec![SqlValue::Real(self.rate), SqlValue::Integer(self.duration_ms)]
    }

    fn from_row(meta: RecordMeta, row: &Row<'_>, offset: usize) -> Result<Self, StorageError> {
        Ok(Self {
            meta,
            rate: row.get(offset)?,
            duration_ms: row.get(offset + 1)?,
        })
    }
}

impl StoredFamily for ExtendedBolus {
    const TABLE: &'static str = "extended_boluses";
    const PAYLOAD_COLUMNS: &'static [&'static str] = &["amount", "duration_ms"];

    fn payload_values(&self) -> Vec<SqlValue> {
        vec![SqlValue::Real(self.amount), SqlValue::Integer(self.duration_ms)]
    }

    fn from_row(meta: RecordMeta, row: &Row<'_>, offset: usize) -> Result<Self, StorageError> {
        Ok(Self {
            meta,
            amount: row.get(offset)?,
            duration_ms: row.get(offset + 1)?,
        })
    }
}
