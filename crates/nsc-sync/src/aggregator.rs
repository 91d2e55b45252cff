use nsc_core::sync_contracts::WorkOutcome;
use nsc_core::treatments::EntityFamily;
use serde::Serialize;
use std::fmt;
use tracing::warn;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyFailure {
    pub family: EntityFamily,
    pub nightscout_id: String,
    pub message: String,
}

impl fmt::Display for FamilyFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "error while invalidating {} {}: {}",
            self.family.label(),
            self.nightscout_id,
            self.message
        )
    }
}

/// Collects per-family failures for one run without interrupting it.
#[derive(Debug, Default)]
pub struct ErrorAggregator {
    failures: Vec<FamilyFailure>,
}

impl ErrorAggregator {
    pub fn record(
        &mut self,
        family: EntityFamily,
        nightscout_id: impl Into<String>,
        message: impl Into<String>,
    ) {
        self.failures.push(FamilyFailure {
            family,
            nightscout_id: nightscout_id.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn failures(&self) -> &[FamilyFailure] {
        &self.failures
    }

    /// `Success` when nothing failed, otherwise `Failure` carrying the most recent error.
    /// Earlier failures only reach the log.
    pub fn into_outcome(self) -> WorkOutcome {
        let Some(last) = self.failures.last() else {
            return WorkOutcome::Success;
        };

        if self.failures.len() > 1 {
            for failure in &self.failures[..self.failures.len() - 1] {
                warn!(
                    event = "removal_failure_suppressed",
                    family = %failure.family,
                    nightscout_id = %failure.nightscout_id,
                    error = %failure.message,
                );
            }
        }
        WorkOutcome::failure(last.to_string())
    }
}
