//! Schema sync: plan against a snapshot, then create what is missing

pub mod execution;
pub mod plan;
pub mod report;
pub mod types;

#[cfg(test)]
pub mod testing;

pub use execution::{execute_plan, prepare_plan, run_sync};
pub use plan::{PlannedStep, StepAction, SyncPlan, build_plan};
pub use report::{PhaseSummary, SyncReport};
pub use types::{ObjectKind, SkipReason, SyncEvent, SyncOutcome};
