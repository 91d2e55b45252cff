mod families;

pub use families::StoredFamily;

use chrono::{DateTime, Utc};
use nsc_core::sync_contracts::BatchHandle;
use nsc_core::treatments::{
    Bolus, Carbs, ContractError, EntityFamily, ExtendedBolus, RecordMeta, TemporaryBasal,
    TemporaryTarget, TherapyEvent, Treatment,
};
use nsc_core::user_entry::{Action, UserEntry, ValueWithUnit};
use rusqlite::types::Value as SqlValue;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use serde_json::Value;
use std::path::Path;
use thiserror::Error;

pub const TREATMENT_SCHEMA_VERSION: i64 = 2;

const HEADER_COLUMNS: [&str; 5] = ["id", "nightscout_id", "is_valid", "timestamp", "modified_at"];

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    #[error("serialization error: {0}")]
    Serialization(String),
    #[error("contract error: {0}")]
    Contract(#[from] ContractError),
    #[error("timestamp parse error: {0}")]
    Timestamp(String),
    #[error("unsupported schema version {found}, max supported {supported}")]
    UnsupportedSchemaVersion { found: i64, supported: i64 },
}

/// Row of the deprecated profile switch table. It has no validity flag and is
/// removed physically.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileSwitch {
    pub id: i64,
    pub nightscout_id: Option<String>,
    pub ts: DateTime<Utc>,
    pub profile_name: String,
    pub duration_minutes: i64,
}

pub struct TreatmentStore {
    conn: Connection,
}

impl TreatmentStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn open_in_memory() -> Result<Self, StorageError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.migrate()?;
        Ok(store)
    }

    pub fn schema_version(&self) -> Result<i64, StorageError> {
        Ok(self
            .conn
            .query_row("PRAGMA user_version", [], |row| row.get(0))?)
    }

    pub fn migrate(&self) -> Result<(), StorageError> {
        let mut current = self.schema_version()?;
        if current > TREATMENT_SCHEMA_VERSION {
            return Err(StorageError::UnsupportedSchemaVersion {
                found: current,
                supported: TREATMENT_SCHEMA_VERSION,
            });
        }

        if current < 1 {
            let sql = include_str!("../migrations/0001_treatment_schema.sql");
            self.conn.execute_batch(sql)?;
            self.conn
                .execute("PRAGMA user_version = 1", [])
                .map(|_| ())?;
            current = 1;
        }

        if current < 2 {
            let sql = include_str!("../migrations/0002_pending_batches.sql");
            self.conn.execute_batch(sql)?;
            self.conn
                .execute("PRAGMA user_version = 2", [])
                .map(|_| ())?;
        }

        Ok(())
    }

    pub fn insert_record<F: StoredFamily>(&self, record: &F) -> Result<i64, StorageError> {
        let meta = record.meta();
        let columns = HEADER_COLUMNS[1..]
            .iter()
            .chain(F::PAYLOAD_COLUMNS)
            .copied()
            .collect::<Vec<_>>();
        let placeholders = (1..=columns.len())
            .map(|index| format!("?{index}"))
            .collect::<Vec<_>>();
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            F::TABLE,
            columns.join(", "),
            placeholders.join(", ")
        );

        let mut values = vec![
            meta.nightscout_id
                .clone()
                .map_or(SqlValue::Null, SqlValue::Text),
            SqlValue::Integer(i64::from(meta.is_valid)),
            SqlValue::Text(meta.timestamp.to_rfc3339()),
            meta.modified_at
                .map_or(SqlValue::Null, |ts| SqlValue::Text(ts.to_rfc3339())),
        ];
        values.extend(record.payload_values());

        self.conn.execute(&sql, params_from_iter(values))?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn record<F: StoredFamily>(&self, id: i64) -> Result<Option<F>, StorageError> {
        Ok(select_records::<F>(&self.conn, "WHERE id = ?1", params![id])?
            .into_iter()
            .next())
    }

    /// All rows of a family carrying `nightscout_id`, valid or not, oldest first.
    pub fn find_by_nightscout_id<F: StoredFamily>(
        &self,
        nightscout_id: &str,
    ) -> Result<Vec<F>, StorageError> {
        select_records::<F>(&self.conn, "WHERE nightscout_id = ?1", params![nightscout_id])
    }

    pub fn active_count<F: StoredFamily>(&self) -> Result<i64, StorageError> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE is_valid = 1", F::TABLE);
        Ok(self.conn.query_row(&sql, [], |row| row.get(0))?)
    }

    /// Flips every valid row of family `F` matching `nightscout_id` to invalid,
    /// inside one transaction, and returns the rows it transitioned.
    ///
    /// Nothing is applied if any update fails. Rows already invalid are not
    /// matched, so repeating the call returns an empty vector.
    pub fn invalidate_by_nightscout_id<F: StoredFamily>(
        &self,
        nightscout_id: &str,
    ) -> Result<Vec<F>, StorageError> {
        let tx = self.conn.unchecked_transaction()?;
        let mut matched = select_records::<F>(
            &tx,
            "WHERE nightscout_id = ?1 AND is_valid = 1",
            params![nightscout_id],
        )?;

        let modified_at = Utc::now();
        let update = format!(
            "UPDATE {} SET is_valid = 0, modified_at = ?1 WHERE id = ?2 AND is_valid = 1",
            F::TABLE
        );
        for record in &mut matched {
            let meta = record.meta_mut();
            tx.execute(&update, params![modified_at.to_rfc3339(), meta.id])?;
            meta.is_valid = false;
            meta.modified_at = Some(modified_at);
        }

        tx.commit()?;
        Ok(matched)
    }

    /// Runs the invalidation for `family` and widens the result to [`Treatment`].
    pub fn invalidate_family(
        &self,
        family: EntityFamily,
        nightscout_id: &str,
    ) -> Result<Vec<Treatment>, StorageError> {
        match family {
            EntityFamily::TemporaryTarget => {
                self.invalidate_as_treatments::<TemporaryTarget>(nightscout_id)
            }
            EntityFamily::TherapyEvent => self.invalidate_as_treatments::<TherapyEvent>(nightscout_id),
            EntityFamily::Bolus => self.invalidate_as_treatments::<Bolus>(nightscout_id),
            EntityFamily::Carbs => self.invalidate_as_treatments::<Carbs>(nightscout_id),
            EntityFamily::TemporaryBasal => {
                self.invalidate_as_treatments::<TemporaryBasal>(nightscout_id)
            }
            EntityFamily::ExtendedBolus => {
                self.invalidate_as_treatments::<ExtendedBolus>(nightscout_id)
            }
        }
    }

    fn invalidate_as_treatments<F: StoredFamily>(
        &self,
        nightscout_id: &str,
    ) -> Result<Vec<Treatment>, StorageError> {
        Ok(self
            .invalidate_by_nightscout_id::<F>(nightscout_id)?
            .into_iter()
            .map(Into::into)
            .collect())
    }

    pub fn insert_user_entry(&self, entry: &UserEntry) -> Result<i64, StorageError> {
        let values_json = serde_json::to_string(&entry.values)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.conn.execute(
            "
            INSERT INTO user_entries (ts, action, family, nightscout_id, values_json)
            VALUES (?1, ?2, ?3, ?4, ?5)
            ",
            params![
                entry.timestamp.to_rfc3339(),
                entry.action.as_str(),
                entry.family.as_str(),
                entry.nightscout_id,
                values_json,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    pub fn user_entries(&self) -> Result<Vec<UserEntry>, StorageError> {
        let mut statement = self.conn.prepare(
            "
            SELECT ts, action, family, nightscout_id, values_json
            FROM user_entries
            ORDER BY entry_id ASC
            ",
        )?;
        let rows = statement.query_map([], |row| {
            Ok((
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, Option<String>>(3)?,
                row.get::<_, String>(4)?,
            ))
        })?;

        let mut entries = Vec::new();
        for row in rows {
            let (ts, action_raw, family_raw, nightscout_id, values_json) = row?;
            let action = action_raw.parse::<Action>()?;
            let values: Vec<ValueWithUnit> = serde_json::from_str(&values_json)
                .map_err(|err| StorageError::Serialization(err.to_string()))?;
            entries.push(UserEntry {
                timestamp: parse_timestamp(ts)?,
                action,
                family: family_raw.parse::<EntityFamily>()?,
                nightscout_id,
                values,
            });
        }
        Ok(entries)
    }

    pub fn user_entry_count(&self) -> Result<i64, StorageError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM user_entries", [], |row| row.get(0))?)
    }

    pub fn insert_profile_switch(&self, switch: &ProfileSwitch) -> Result<i64, StorageError> {
        self.conn.execute(
            "
            INSERT INTO profile_switches (nightscout_id, ts, profile_name, duration_minutes)
            VALUES (?1, ?2, ?3, ?4)
            ",
            params![
                switch.nightscout_id,
                switch.ts.to_rfc3339(),
                switch.profile_name,
                switch.duration_minutes,
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    /// Physically deletes legacy profile switches by Nightscout id.
    pub fn delete_profile_switch_by_nightscout_id(
        &self,
        nightscout_id: &str,
    ) -> Result<usize, StorageError> {
        Ok(self.conn.execute(
            "DELETE FROM profile_switches WHERE nightscout_id = ?1",
            [nightscout_id],
        )?)
    }

    pub fn profile_switch_count(&self) -> Result<i64, StorageError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM profile_switches", [], |row| {
                row.get(0)
            })?)
    }

    /// Parks a JSON array for a later worker run and returns its handle.
    pub fn store_batch(&self, records: &[Value]) -> Result<BatchHandle, StorageError> {
        let payload_json = serde_json::to_string(records)
            .map_err(|err| StorageError::Serialization(err.to_string()))?;
        self.conn.execute(
            "INSERT INTO pending_batches (created_at, payload_json) VALUES (?1, ?2)",
            params![Utc::now().to_rfc3339(), payload_json],
        )?;
        Ok(BatchHandle(self.conn.last_insert_rowid()))
    }

    /// Reads a parked batch. The batch stays parked until acknowledged, so a failed or
    /// cancelled run can pick it up again.
    pub fn pickup_batch(&self, handle: BatchHandle) -> Result<Option<Vec<Value>>, StorageError> {
        let payload_json: Option<String> = self
            .conn
            .query_row(
                "SELECT payload_json FROM pending_batches WHERE handle = ?1",
                [handle.0],
                |row| row.get(0),
            )
            .optional()?;

        payload_json
            .map(|payload_json| {
                serde_json::from_str(&payload_json)
                    .map_err(|err| StorageError::Serialization(err.to_string()))
            })
            .transpose()
    }

    /// Drops a finished batch. Returns false when the handle was not parked.
    pub fn acknowledge_batch(&self, handle: BatchHandle) -> Result<bool, StorageError> {
        let deleted = self
            .conn
            .execute("DELETE FROM pending_batches WHERE handle = ?1", [handle.0])?;
        Ok(deleted > 0)
    }

    pub fn pending_batch_count(&self) -> Result<i64, StorageError> {
        Ok(self
            .conn
            .query_row("SELECT COUNT(*) FROM pending_batches", [], |row| row.get(0))?)
    }

    pub fn table_exists(&self, table_name: &str) -> Result<bool, StorageError> {
        let exists = self
            .conn
            .query_row(
                "
                SELECT 1
                FROM sqlite_master
                WHERE type='table' AND name = ?1
                LIMIT 1
                ",
                [table_name],
                |_| Ok(()),
            )
            .optional()?;
        Ok(exists.is_some())
    }
}

fn select_records<F: StoredFamily>(
    conn: &Connection,
    filter: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<F>, StorageError> {
    let columns = HEADER_COLUMNS
        .iter()
        .chain(F::PAYLOAD_COLUMNS)
        .copied()
        .collect::<Vec<_>>()
        .join(", ");
    let sql = format!("SELECT {columns} FROM {} {filter} ORDER BY id ASC", F::TABLE);
    let mut statement = conn.prepare(&sql)?;
    let mut rows = statement.query(params)?;

    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let timestamp: String = row.get(3)?;
        let modified_at: Option<String> = row.get(4)?;
        let meta = RecordMeta {
            id: row.get(0)?,
            nightscout_id: row.get(1)?,
            is_valid: row.get(2)?,
            timestamp: parse_timestamp(timestamp)?,
            modified_at: modified_at.map(parse_timestamp).transpose()?,
        };
        records.push(F::from_row(meta, row, HEADER_COLUMNS.len())?);
    }
    Ok(records)
}

fn parse_timestamp(value: String) -> Result<DateTime<Utc>, StorageError> {
    DateTime::parse_from_rfc3339(&value)
        .map(|timestamp| timestamp.with_timezone(&Utc))
        .map_err(|err| StorageError::Timestamp(err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use nsc_core::treatments::{FamilyRecord, TemporaryTargetReason, TherapyEventType};
    use serde_json::json;
    use tempfile::NamedTempFile;

    const NS_ID: &str = "607415f0b4d3a3a0e6b1c2d3";

    fn ts() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 4, 12, 9, 30, 0)
            .single()
            .expect("valid timestamp")
    }

    fn bolus(nightscout_id: &str, amount: f64) -> Bolus {
        Bolus {
            meta: RecordMeta::new(ts()).with_nightscout_id(nightscout_id),
            amount,
        }
    }

    #[test]
    fn migration_creates_treatment_tables() {
        let db = TreatmentStore::open_in_memory().expect("open db");

        for table in [
            "temporary_targets",
            "therapy_events",
            "boluses",
            "carbs",
            "temporary_basals",
            "extended_boluses",
            "user_entries",
            "profile_switches",
            "pending_batches",
        ] {
            assert!(db.table_exists(table).expect("table check"), "{table}");
        }

        assert_eq!(
            db.schema_version().expect("schema version"),
            TREATMENT_SCHEMA_VERSION
        );
    }

    #[test]
    fn reopening_file_store_keeps_schema_and_rows() {
        let file = NamedTempFile::new().expect("temp db");
        {
            let db = TreatmentStore::open(file.path()).expect("open db");
            db.insert_record(&bolus(NS_ID, 2.0)).expect("insert bolus");
        }
        let db = TreatmentStore::open(file.path()).expect("reopen db");
        assert_eq!(db.active_count::<Bolus>().expect("count"), 1);
        assert_eq!(
            db.schema_version().expect("schema version"),
            TREATMENT_SCHEMA_VERSION
        );
    }

    #[test]
    fn invalidation_flips_flag_and_is_idempotent() {
        let db = TreatmentStore::open_in_memory().expect("open db");
        let id = db.insert_record(&bolus(NS_ID, 3.5)).expect("insert bolus");

        let first = db
            .invalidate_by_nightscout_id::<Bolus>(NS_ID)
            .expect("invalidate");
        assert_eq!(first.len(), 1);
        assert_eq!(first[0].meta.id, id);
        assert!(!first[0].meta.is_valid);
        assert!(first[0].meta.modified_at.is_some());
        assert_eq!(first[0].amount, 3.5);

        let stored = db.record::<Bolus>(id).expect("load").expect("row present");
        assert!(!stored.meta.is_valid);
        assert_eq!(stored.amount, 3.5);

        let second = db
            .invalidate_by_nightscout_id::<Bolus>(NS_ID)
            .expect("invalidate again");
        assert!(second.is_empty());
        assert_eq!(db.find_by_nightscout_id::<Bolus>(NS_ID).expect("find").len(), 1);
    }

    #[test]
    fn invalidation_only_touches_requested_family() {
        let db = TreatmentStore::open_in_memory().expect("open db");
        db.insert_record(&bolus(NS_ID, 1.0)).expect("insert bolus");
        db.insert_record(&Carbs {
            meta: RecordMeta::new(ts()).with_nightscout_id(NS_ID),
            amount: 30.0,
            duration_ms: 0,
        })
        .expect("insert carbs");

        let invalidated = db
            .invalidate_family(EntityFamily::Carbs, NS_ID)
            .expect("invalidate carbs");
        assert_eq!(invalidated.len(), 1);
        assert_eq!(invalidated[0].family(), EntityFamily::Carbs);
        assert_eq!(db.active_count::<Carbs>().expect("count carbs"), 0);
        assert_eq!(db.active_count::<Bolus>().expect("count boluses"), 1);
    }

    #[test]
    fn unmatched_id_is_an_empty_success() {
        let db = TreatmentStore::open_in_memory().expect("open db");
        db.insert_record(&bolus(NS_ID, 1.0)).expect("insert bolus");
        for family in EntityFamily::ALL {
            assert!(db
                .invalidate_family(family, "000000000000000000000000")
                .expect("invalidate")
                .is_empty());
        }
        assert_eq!(db.active_count::<Bolus>().expect("count"), 1);
    }

    #[test]
    fn partial_unique_index_rejects_second_active_row() {
        let db = TreatmentStore::open_in_memory().expect("open db");
        db.insert_record(&bolus(NS_ID, 1.0)).expect("insert bolus");
        assert!(db.insert_record(&bolus(NS_ID, 2.0)).is_err());

        db.invalidate_by_nightscout_id::<Bolus>(NS_ID)
            .expect("invalidate");
        db.insert_record(&bolus(NS_ID, 2.0))
            .expect("active slot is free again");
    }

    #[test]
    fn corrupted_duplicates_are_all_invalidated() {
        let db = TreatmentStore::open_in_memory().expect("open db");
        db.conn
            .execute_batch("DROP INDEX idx_boluses_active_ns")
            .expect("drop index");
        db.insert_record(&bolus(NS_ID, 1.0)).expect("insert first");
        db.insert_record(&bolus(NS_ID, 1.0)).expect("insert duplicate");

        let invalidated = db
            .invalidate_by_nightscout_id::<Bolus>(NS_ID)
            .expect("invalidate");
        assert_eq!(invalidated.len(), 2);
        assert_eq!(db.active_count::<Bolus>().expect("count"), 0);
    }

    #[test]
    fn failed_update_rolls_back_whole_transaction() {
        let db = TreatmentStore::open_in_memory().expect("open db");
        db.conn
            .execute_batch("DROP INDEX idx_boluses_active_ns")
            .expect("drop index");
        db.insert_record(&bolus(NS_ID, 1.0)).expect("insert first");
        let second = db.insert_record(&bolus(NS_ID, 1.0)).expect("insert second");
        db.conn
            .execute_batch(&format!(
                "
                CREATE TRIGGER fail_second_bolus BEFORE UPDATE ON boluses
                WHEN OLD.id = {second}
                BEGIN
                    SELECT RAISE(ABORT, 'injected failure');
                END;
                "
            ))
            .expect("create trigger");

        let err = db
            .invalidate_by_nightscout_id::<Bolus>(NS_ID)
            .expect_err("update should fail");
        assert!(err.to_string().contains("injected failure"));
        assert_eq!(db.active_count::<Bolus>().expect("count"), 2);
    }

    #[test]
    fn every_family_roundtrips_payload_columns() {
        let db = TreatmentStore::open_in_memory().expect("open db");
        let target = TemporaryTarget {
            meta: RecordMeta::new(ts()).with_nightscout_id("tt"),
            reason: TemporaryTargetReason::Activity,
            low_target: 140.0,
            high_target: 160.0,
            duration_ms: 3_600_000,
        };
        let event = TherapyEvent {
            meta: RecordMeta::new(ts()).with_nightscout_id("te"),
            event_type: TherapyEventType::Note,
            note: Some("pizza".to_string()),
            duration_ms: 0,
        };
        let basal = TemporaryBasal {
            meta: RecordMeta::new(ts()).with_nightscout_id("tb"),
            rate: 0.8,
            duration_ms: 1_800_000,
        };
        let extended = ExtendedBolus {
            meta: RecordMeta::new(ts()).with_nightscout_id("eb"),
            amount: 2.4,
            duration_ms: 7_200_000,
        };
        db.insert_record(&target).expect("insert target");
        db.insert_record(&event).expect("insert event");
        db.insert_record(&basal).expect("insert basal");
        db.insert_record(&extended).expect("insert extended");

        let loaded_target = db
            .invalidate_by_nightscout_id::<TemporaryTarget>("tt")
            .expect("invalidate target");
        assert_eq!(loaded_target[0].reason, TemporaryTargetReason::Activity);
        assert_eq!(loaded_target[0].high_target, 160.0);
        let loaded_event = db
            .invalidate_by_nightscout_id::<TherapyEvent>("te")
            .expect("invalidate event");
        assert_eq!(loaded_event[0].note.as_deref(), Some("pizza"));
        assert_eq!(loaded_event[0].meta().timestamp, ts());
        let loaded_basal = db
            .invalidate_by_nightscout_id::<TemporaryBasal>("tb")
            .expect("invalidate basal");
        assert_eq!(loaded_basal[0].rate, 0.8);
        let loaded_extended = db
            .invalidate_by_nightscout_id::<ExtendedBolus>("eb")
            .expect("invalidate extended");
        assert_eq!(loaded_extended[0].duration_ms, 7_200_000);
    }

    #[test]
    fn user_entries_roundtrip_in_insertion_order() {
        let db = TreatmentStore::open_in_memory().expect("open db");
        let first = Treatment::from(bolus(NS_ID, 3.5)).removal_entry(ts());
        let second = Treatment::from(Carbs {
            meta: RecordMeta::new(ts()),
            amount: 12.0,
            duration_ms: 0,
        })
        .removal_entry(ts());
        db.insert_user_entry(&first).expect("insert first");
        db.insert_user_entry(&second).expect("insert second");

        let entries = db.user_entries().expect("load entries");
        assert_eq!(entries, vec![first, second]);
        assert_eq!(db.user_entry_count().expect("count"), 2);
    }

    #[test]
    fn unknown_action_in_audit_row_is_a_contract_error() {
        let db = TreatmentStore::open_in_memory().expect("open db");
        db.conn
            .execute(
                "INSERT INTO user_entries (ts, action, family, nightscout_id, values_json)
                 VALUES (?1, 'BOLUS', 'bolus', NULL, '[]')",
                [ts().to_rfc3339()],
            )
            .expect("insert raw entry");

        let err = db.user_entries().expect_err("unknown action");
        assert!(matches!(
            err,
            StorageError::Contract(ContractError::UnknownVariant {
                kind: "user entry action",
                ..
            })
        ));
    }

    #[test]
    fn batch_stays_parked_until_acknowledged() {
        let db = TreatmentStore::open_in_memory().expect("open db");
        let handle = db
            .store_batch(&[json!({"_id": "abc"}), json!({})])
            .expect("store batch");
        assert_eq!(db.pending_batch_count().expect("count"), 1);

        let first = db
            .pickup_batch(handle)
            .expect("pickup")
            .expect("batch present");
        let second = db
            .pickup_batch(handle)
            .expect("second pickup")
            .expect("batch still present");
        assert_eq!(first.len(), 2);
        assert_eq!(first, second);

        assert!(db.acknowledge_batch(handle).expect("acknowledge"));
        assert!(db.pickup_batch(handle).expect("after ack").is_none());
        assert!(!db.acknowledge_batch(handle).expect("acknowledge twice"));
        assert_eq!(db.pending_batch_count().expect("count"), 0);
        assert!(db.pickup_batch(BatchHandle(-1)).expect("unknown").is_none());
    }

    #[test]
    fn profile_switch_delete_is_physical() {
        let db = TreatmentStore::open_in_memory().expect("open db");
        db.insert_profile_switch(&ProfileSwitch {
            id: 0,
            nightscout_id: Some(NS_ID.to_string()),
            ts: ts(),
            profile_name: "Weekday".to_string(),
            duration_minutes: 0,
        })
        .expect("insert switch");

        assert_eq!(
            db.delete_profile_switch_by_nightscout_id(NS_ID)
                .expect("delete"),
            1
        );
        assert_eq!(db.profile_switch_count().expect("count"), 0);
        assert_eq!(
            db.delete_profile_switch_by_nightscout_id(NS_ID)
                .expect("delete again"),
            0
        );
    }
}
