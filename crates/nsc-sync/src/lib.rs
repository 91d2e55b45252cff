mod aggregator;
mod worker;

pub use aggregator::{ErrorAggregator, FamilyFailure};
pub use worker::{RemovalPorts, RemovalReport, RemovalRun, RemovalWorker, CANCELLED};

use nsc_core::sync_contracts::{AcceptancePolicy, BatchHandle};
use nsc_core::treatments::{EntityFamily, Treatment};
use nsc_core::user_entry::UserEntry;
use nsc_storage::{StorageError, TreatmentStore};
use serde_json::Value;
use tracing::{debug, warn};

pub trait AcceptanceGate {
    fn accepts_remote_data(&self) -> bool;
}

/// Resolves a batch handle to its records. `None` means the payload is gone.
///
/// `pickup` leaves the batch in place; only `acknowledge` drops it, after a run
/// that finished with `Success`. Anything else keeps the batch for a retry.
pub trait BatchSource {
    fn pickup(&self, handle: BatchHandle) -> Option<Vec<Value>>;
    fn acknowledge(&self, handle: BatchHandle);
}

/// One atomic invalidation against a single family's store.
pub trait TreatmentInvalidator {
    fn invalidate(
        &self,
        family: EntityFamily,
        nightscout_id: &str,
    ) -> Result<Vec<Treatment>, StorageError>;
}

pub trait UserEntryLogger {
    fn log(&self, entry: &UserEntry) -> Result<(), StorageError>;
}

/// Deletion path for profile switches kept outside the invalidation contract.
/// Callers do not observe its outcome.
pub trait LegacyProfileSwitchDeleter {
    fn delete_profile_switch_by_id(&self, nightscout_id: &str);
}

impl AcceptanceGate for AcceptancePolicy {
    fn accepts_remote_data(&self) -> bool {
        AcceptancePolicy::accepts_remote_data(self)
    }
}

impl BatchSource for TreatmentStore {
    fn pickup(&self, handle: BatchHandle) -> Option<Vec<Value>> {
        match self.pickup_batch(handle) {
            Ok(records) => records,
            Err(err) => {
                warn!(event = "batch_pickup_error", batch = %handle, error = %err);
                None
            }
        }
    }

    fn acknowledge(&self, handle: BatchHandle) {
        match self.acknowledge_batch(handle) {
            Ok(true) => debug!(event = "batch_acknowledged", batch = %handle),
            Ok(false) => debug!(event = "batch_already_gone", batch = %handle),
            Err(err) => warn!(event = "batch_acknowledge_error", batch = %handle, error = %err),
        }
    }
}

impl TreatmentInvalidator for TreatmentStore {
    fn invalidate(
        &self,
        family: EntityFamily,
        nightscout_id: &str,
    ) -> Result<Vec<Treatment>, StorageError> {
        self.invalidate_family(family, nightscout_id)
    }
}

impl UserEntryLogger for TreatmentStore {
    fn log(&self, entry: &UserEntry) -> Result<(), StorageError> {
        self.insert_user_entry(entry).map(|_| ())
    }
}

impl LegacyProfileSwitchDeleter for TreatmentStore {
    fn delete_profile_switch_by_id(&self, nightscout_id: &str) {
        match self.delete_profile_switch_by_nightscout_id(nightscout_id) {
            Ok(0) => {}
            Ok(deleted) => {
                debug!(event = "profile_switch_deleted", nightscout_id, deleted);
            }
            Err(err) => {
                debug!(event = "profile_switch_delete_error", nightscout_id, error = %err);
            }
        }
    }
}
