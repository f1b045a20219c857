//! Event-to-directory reconciliation.

pub mod groups;
pub mod orchestrator;

pub use groups::{GroupReconciler, GroupUpdateForm};
pub use orchestrator::{Outcome, ReconcileError, Reconciler, SkipReason, Stage};
