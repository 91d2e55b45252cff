use crate::aggregator::ErrorAggregator;
use crate::{
    AcceptanceGate, BatchSource, LegacyProfileSwitchDeleter, TreatmentInvalidator,
    UserEntryLogger,
};
use chrono::Utc;
use nsc_core::sync_contracts::{
    extract_nightscout_id, is_valid_nightscout_id, AcceptancePolicy, BatchHandle, WorkOutcome,
};
use nsc_core::treatments::{EntityFamily, Treatment};
use nsc_storage::TreatmentStore;
use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

pub const CANCELLED: &str = "cancelled";

/// External collaborators of a removal run.
#[derive(Clone, Copy)]
pub struct RemovalPorts<'a> {
    pub gate: &'a dyn AcceptanceGate,
    pub batches: &'a dyn BatchSource,
    pub invalidator: &'a dyn TreatmentInvalidator,
    pub audit: &'a dyn UserEntryLogger,
    pub legacy: &'a dyn LegacyProfileSwitchDeleter,
}

impl<'a> RemovalPorts<'a> {
    /// Wires every port except the gate to one SQLite store.
    pub fn from_store(policy: &'a AcceptancePolicy, store: &'a TreatmentStore) -> Self {
        Self {
            gate: policy,
            batches: store,
            invalidator: store,
            audit: store,
            legacy: store,
        }
    }
}

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize)]
pub struct RemovalReport {
    pub gate_rejected: bool,
    pub records_seen: usize,
    pub records_skipped: usize,
    pub invalidated: BTreeMap<EntityFamily, usize>,
    pub audit_entries_written: usize,
    pub audit_failures: usize,
    pub family_errors: usize,
    pub cancelled: bool,
    pub acknowledged: bool,
}

impl RemovalReport {
    pub fn invalidated_total(&self) -> usize {
        self.invalidated.values().sum()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RemovalRun {
    pub outcome: WorkOutcome,
    pub report: RemovalReport,
}

/// Applies one batch of Nightscout removals to the local families.
///
/// The run is sequential: one record at a time, one family at a time, in
/// [`EntityFamily::ALL`] order. A family failure is aggregated and the run moves
/// on; only a missing batch payload stops it before the first record. The batch
/// is acknowledged only when the run ends in `Success`, so a cancelled or failed
/// run can be repeated with the same handle.
pub struct RemovalWorker<'a> {
    ports: RemovalPorts<'a>,
    cancel: Option<Arc<AtomicBool>>,
}

impl<'a> RemovalWorker<'a> {
    pub fn new(ports: RemovalPorts<'a>) -> Self {
        Self {
            ports,
            cancel: None,
        }
    }

    /// Checked between records; a set flag stops the run before the next one.
    pub fn with_cancel_flag(mut self, cancel: Arc<AtomicBool>) -> Self {
        self.cancel = Some(cancel);
        self
    }

    pub fn do_work(&self, handle: BatchHandle) -> WorkOutcome {
        self.run(handle).outcome
    }

    pub fn run(&self, handle: BatchHandle) -> RemovalRun {
        let mut report = RemovalReport::default();

        if !self.ports.gate.accepts_remote_data() {
            debug!(event = "removal_gate_rejected", batch = %handle);
            report.gate_rejected = true;
            return RemovalRun {
                outcome: WorkOutcome::Success,
                report,
            };
        }

        let Some(records) = self.ports.batches.pickup(handle) else {
            error!(event = "removal_missing_input", batch = %handle);
            return RemovalRun {
                outcome: WorkOutcome::missing_input(),
                report,
            };
        };

        info!(event = "removal_start", batch = %handle, records = records.len());

        let mut errors = ErrorAggregator::default();
        for record in &records {
            if self.is_cancelled() {
                warn!(
                    event = "removal_cancelled",
                    batch = %handle,
                    processed = report.records_seen,
                    remaining = records.len() - report.records_seen,
                );
                report.cancelled = true;
                break;
            }
            report.records_seen += 1;

            let Some(nightscout_id) = extract_nightscout_id(record) else {
                report.records_skipped += 1;
                continue;
            };
            if !is_valid_nightscout_id(nightscout_id) {
                debug!(event = "removal_unusual_id", nightscout_id);
            }

            for family in EntityFamily::ALL {
                match self.ports.invalidator.invalidate(family, nightscout_id) {
                    Ok(invalidated) => {
                        if !invalidated.is_empty() {
                            *report.invalidated.entry(family).or_default() += invalidated.len();
                        }
                        for treatment in &invalidated {
                            self.emit_removal_entry(treatment, &mut report);
                        }
                    }
                    Err(err) => {
                        error!(
                            event = "removal_invalidate_error",
                            family = %family,
                            nightscout_id,
                            error = %err,
                        );
                        errors.record(family, nightscout_id, err.to_string());
                    }
                }
            }

            self.ports.legacy.delete_profile_switch_by_id(nightscout_id);
        }

        report.family_errors = errors.len();
        let outcome = if report.cancelled && errors.is_empty() {
            WorkOutcome::failure(CANCELLED)
        } else {
            errors.into_outcome()
        };
        if outcome.is_success() {
            self.ports.batches.acknowledge(handle);
            report.acknowledged = true;
        }

        info!(
            event = "removal_finished",
            batch = %handle,
            success = outcome.is_success(),
            records_seen = report.records_seen,
            records_skipped = report.records_skipped,
            invalidated = report.invalidated_total(),
            family_errors = report.family_errors,
            audit_failures = report.audit_failures,
        );

        RemovalRun { outcome, report }
    }

    // Audit failures never undo the committed invalidation or fail the run.
    fn emit_removal_entry(&self, treatment: &Treatment, report: &mut RemovalReport) {
        let entry = treatment.removal_entry(Utc::now());
        match self.ports.audit.log(&entry) {
            Ok(()) => report.audit_entries_written += 1,
            Err(err) => {
                report.audit_failures += 1;
                warn!(
                    event = "removal_audit_error",
                    family = %entry.family,
                    action = %entry.action,
                    record_id = treatment.meta().id,
                    error = %err,
                );
            }
        }
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .is_some_and(|cancel| cancel.load(Ordering::SeqCst))
    }
}
