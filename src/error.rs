//! Error taxonomy of the planner.
//!
//! Validation and conflict rejections are raised before any mutation is
//! produced. Repository failures pass through unchanged.

use chrono::{NaiveDate, NaiveDateTime};

use crate::capacity::CapacityWarning;
use crate::repository::RepositoryError;
use crate::validation::ValidationError;

/// Result type for planner operations.
pub type SchedulerResult<T> = Result<T, SchedulerError>;

#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Missing reference, inactive technician or illegal transition.
    #[error("validation failed: {0}")]
    Validation(#[from] ValidationError),

    /// Candidate interval overlaps a non-cancelled assignment on the lane.
    #[error(
        "technician '{technician_id}' is already booked between {start} and {end} (conflicts with {})",
        .conflicting.join(", ")
    )]
    Conflict {
        technician_id: String,
        start: NaiveDateTime,
        end: NaiveDateTime,
        conflicting: Vec<String>,
    },

    /// Only raised under [`CapacityPolicy::Block`](crate::config::CapacityPolicy::Block).
    #[error(
        "technician '{}' would be planned {} AW over a capacity of {} AW on {}",
        .0.technician_id, .0.planned_aw, .0.capacity_aw, .0.date
    )]
    CapacityExceeded(CapacityWarning),

    /// Only raised under [`OverflowPolicy::Reject`](crate::config::OverflowPolicy::Reject).
    #[error("assignment {start} - {end} runs past closing time {closing}")]
    OutsideWorkingHours {
        start: NaiveDateTime,
        end: NaiveDateTime,
        closing: NaiveDateTime,
    },

    /// The day snapshot could not be loaded.
    #[error("failed to load day snapshot for {date}: {source}")]
    DataLoad {
        date: NaiveDate,
        #[source]
        source: RepositoryError,
    },

    /// Collaborator failure while applying a plan.
    #[error(transparent)]
    Store(#[from] RepositoryError),
}

impl SchedulerError {
    /// Whether this is a local rejection that left no state behind.
    pub fn is_rejection(&self) -> bool {
        matches!(
            self,
            Self::Validation(_)
                | Self::Conflict { .. }
                | Self::CapacityExceeded(_)
                | Self::OutsideWorkingHours { .. }
        )
    }
}
