pub mod reconcile_ctx;
pub mod reconcile_flow;
pub mod submission_flow;

pub use reconcile_ctx::ReconcileCtx;
pub use reconcile_flow::{ReconcileEngine, ReconcileOutcome, ReconcileReport};
pub use submission_flow::{score_entries, SubmissionFlow};
