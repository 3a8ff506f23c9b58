//! Keeping the plan coherent against a moving task source.
//!
//! The tracker rewrites task data underneath us while the UI side applies
//! optimistic mutations of its own; this module owns the reconciliation
//! ledger, the snapshot merge, and the scheduler that decides when the
//! planning pipeline re-runs.

pub mod ledger;
pub mod merge;
pub mod scheduler;
pub mod source;

pub use ledger::UpdateLedger;
pub use scheduler::{PlanEvent, Scheduler, SchedulerOptions, Trigger};
pub use source::{ChangeSignal, SourceError, TaskFilters, TaskSource};
