//! Interactive day scheduling and utilization reporting.
//!
//! [`AssignmentScheduler`] turns user gestures (place, move, postpone,
//! status change) into [`MutationPlan`]s after validation, conflict and
//! capacity checks. [`UtilizationReporter`] summarizes a day snapshot.
//!
//! Both are synchronous and side-effect free; [`crate::service`] applies
//! plans against the repositories.

mod engine;
mod plan;
mod report;

pub use engine::AssignmentScheduler;
pub use plan::{Mutation, MutationPlan};
pub use report::{DayReport, LaneReport, LoadLevel, UtilizationReporter};
