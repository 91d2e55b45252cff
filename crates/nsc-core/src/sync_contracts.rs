use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

pub const NIGHTSCOUT_ID_FIELD: &str = "_id";
pub const NIGHTSCOUT_ID_LEN: usize = 24;
pub const OUTPUT_ERROR_KEY: &str = "Error";
pub const MISSING_INPUT_DATA: &str = "missing input data";
pub const DEFAULT_REMOVAL_WINDOW_HOURS: i64 = 24;

/// Local policy deciding whether remote data is applied at all.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AcceptancePolicy {
    pub upload_only: bool,
    pub engineering_mode: bool,
    pub nsclient_build: bool,
}

impl Default for AcceptancePolicy {
    fn default() -> Self {
        Self {
            upload_only: true,
            engineering_mode: false,
            nsclient_build: false,
        }
    }
}

impl AcceptancePolicy {
    pub fn accepts_remote_data(&self) -> bool {
        (!self.upload_only && self.engineering_mode) || self.nsclient_build
    }
}

/// Opaque key for a batch parked in the batch store.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(transparent)]
pub struct BatchHandle(pub i64);

impl fmt::Display for BatchHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returns the Nightscout `_id` of a batch element, if it carries a non-empty string one.
pub fn extract_nightscout_id(record: &Value) -> Option<&str> {
    record
        .get(NIGHTSCOUT_ID_FIELD)
        .and_then(Value::as_str)
        .filter(|id| !id.is_empty())
}

/// Nightscout ids are 24-character Mongo object ids.
pub fn is_valid_nightscout_id(id: &str) -> bool {
    id.len() == NIGHTSCOUT_ID_LEN
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum WorkOutcome {
    Success,
    Failure { output: BTreeMap<String, String> },
}

impl WorkOutcome {
    pub fn failure(message: impl Into<String>) -> Self {
        let mut output = BTreeMap::new();
        output.insert(OUTPUT_ERROR_KEY.to_string(), message.into());
        Self::Failure { output }
    }

    pub fn missing_input() -> Self {
        Self::failure(MISSING_INPUT_DATA)
    }

    pub fn is_success(&self) -> bool {
        matches!(self, WorkOutcome::Success)
    }

    pub fn error_message(&self) -> Option<&str> {
        match self {
            WorkOutcome::Success => None,
            WorkOutcome::Failure { output } => output.get(OUTPUT_ERROR_KEY).map(String::as_str),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TreatmentTriage {
    pub removed: Vec<Value>,
    pub added_or_updated: Vec<Value>,
}

/// Splits a downloaded treatments array by its `action` field.
///
/// Removals older than `window` are dropped, as are unknown actions and non-object elements.
/// A window reaching past the earliest representable instant keeps every removal.
pub fn triage_treatments(
    treatments: &[Value],
    now: DateTime<Utc>,
    window: Duration,
) -> TreatmentTriage {
    let cutoff_ms = now
        .checked_sub_signed(window)
        .map_or(i64::MIN, |cutoff| cutoff.timestamp_millis());
    let mut triage = TreatmentTriage::default();

    for treatment in treatments {
        if !treatment.is_object() {
            continue;
        }
        let mills = treatment.get("mills").and_then(Value::as_i64).unwrap_or(0);
        match treatment.get("action").and_then(Value::as_str) {
            None | Some("update") => triage.added_or_updated.push(treatment.clone()),
            Some("remove") if mills > cutoff_ms => triage.removed.push(treatment.clone()),
            Some(_) => {}
        }
    }

    triage
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2021, 4, 12, 12, 0, 0)
            .single()
            .expect("valid timestamp")
    }

    #[test]
    fn acceptance_requires_engineering_download_or_nsclient() {
        assert!(!AcceptancePolicy::default().accepts_remote_data());
        assert!(AcceptancePolicy {
            upload_only: false,
            engineering_mode: true,
            nsclient_build: false,
        }
        .accepts_remote_data());
        assert!(!AcceptancePolicy {
            upload_only: false,
            engineering_mode: false,
            nsclient_build: false,
        }
        .accepts_remote_data());
        assert!(AcceptancePolicy {
            upload_only: true,
            engineering_mode: false,
            nsclient_build: true,
        }
        .accepts_remote_data());
    }

    #[test]
    fn extract_id_requires_non_empty_string() {
        assert_eq!(extract_nightscout_id(&json!({"_id": "abc"})), Some("abc"));
        assert_eq!(extract_nightscout_id(&json!({"_id": ""})), None);
        assert_eq!(extract_nightscout_id(&json!({"_id": 12})), None);
        assert_eq!(extract_nightscout_id(&json!({})), None);
        assert_eq!(extract_nightscout_id(&json!("abc")), None);
    }

    #[test]
    fn failure_outcome_exposes_error_key() {
        let outcome = WorkOutcome::missing_input();
        assert!(!outcome.is_success());
        assert_eq!(outcome.error_message(), Some("missing input data"));
        assert_eq!(WorkOutcome::Success.error_message(), None);
    }

    #[test]
    fn triage_keeps_only_recent_removals() {
        let recent = (now() - Duration::hours(2)).timestamp_millis();
        let stale = (now() - Duration::hours(30)).timestamp_millis();
        let treatments = vec![
            json!({"_id": "a", "action": "remove", "mills": recent}),
            json!({"_id": "b", "action": "remove", "mills": stale}),
            json!({"_id": "c", "action": "update", "mills": recent}),
            json!({"_id": "d", "mills": recent}),
            json!({"_id": "e", "action": "bogus"}),
            json!(42),
        ];

        let triage = triage_treatments(&treatments, now(), Duration::hours(24));
        let removed = triage
            .removed
            .iter()
            .filter_map(extract_nightscout_id)
            .collect::<Vec<_>>();
        let changed = triage
            .added_or_updated
            .iter()
            .filter_map(extract_nightscout_id)
            .collect::<Vec<_>>();
        assert_eq!(removed, vec!["a"]);
        assert_eq!(changed, vec!["c", "d"]);
    }

    #[test]
    fn triage_window_past_earliest_instant_keeps_all_removals() {
        let treatments = vec![json!({"_id": "a", "action": "remove", "mills": 0})];
        let triage = triage_treatments(&treatments, now(), Duration::hours(10_000_000_000));
        assert_eq!(triage.removed.len(), 1);
    }

    #[test]
    fn object_id_length_check() {
        assert!(is_valid_nightscout_id("607415f0b4d3a3a0e6b1c2d3"));
        assert!(!is_valid_nightscout_id("abc"));
    }
}
