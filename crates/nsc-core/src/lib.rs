pub mod sync_contracts;
pub mod treatments;
pub mod user_entry;

pub use sync_contracts::{
    extract_nightscout_id, is_valid_nightscout_id, triage_treatments, AcceptancePolicy,
    BatchHandle, TreatmentTriage, WorkOutcome,
};
pub use treatments::{
    Bolus, Carbs, ContractError, EntityFamily, ExtendedBolus, FamilyRecord, RecordMeta,
    TemporaryBasal, TemporaryTarget, TemporaryTargetReason, TherapyEvent, TherapyEventType,
    Treatment,
};
pub use user_entry::{Action, EntryValue, Units, UserEntry, ValueWithUnit};
