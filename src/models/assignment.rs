//! Schedule assignment model.
//!
//! An assignment records that an appointment occupies a technician lane
//! during `[start_time, end_time)` on one day.
//!
//! # Status Machine
//!
//! ```text
//! Scheduled ──► InProgress ──► Completed
//!     │
//!     └──► Cancelled
//! ```
//!
//! `Completed` and `Cancelled` are final.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Aw;
use crate::grid::TimeWindow;

/// An appointment-technician-time assignment.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ScheduleAssignment {
    /// Unique assignment identifier.
    pub id: String,
    /// Assigned appointment.
    pub appointment_id: String,
    /// Technician lane.
    pub technician_id: String,
    /// Start time (inclusive).
    pub start_time: NaiveDateTime,
    /// End time (exclusive).
    pub end_time: NaiveDateTime,
    /// Appointment estimate at placement time. Never follows later edits
    /// of the appointment.
    pub aw_planned: Aw,
    pub status: AssignmentStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl AssignmentStatus {
    /// Whether `self → next` is an allowed transition.
    pub fn can_transition_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Scheduled, Self::InProgress)
                | (Self::InProgress, Self::Completed)
                | (Self::Scheduled, Self::Cancelled)
        )
    }

    #[inline]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled)
    }
}

impl ScheduleAssignment {
    /// Creates a scheduled assignment.
    pub fn new(
        id: impl Into<String>,
        appointment_id: impl Into<String>,
        technician_id: impl Into<String>,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
        aw_planned: Aw,
    ) -> Self {
        Self {
            id: id.into(),
            appointment_id: appointment_id.into(),
            technician_id: technician_id.into(),
            start_time,
            end_time,
            aw_planned,
            status: AssignmentStatus::Scheduled,
            created_at: Utc::now(),
        }
    }

    /// Sets the status.
    pub fn with_status(mut self, status: AssignmentStatus) -> Self {
        self.status = status;
        self
    }

    /// Whether this assignment occupies its lane (anything but cancelled).
    #[inline]
    pub fn is_active(&self) -> bool {
        self.status != AssignmentStatus::Cancelled
    }

    /// Calendar day of the assignment.
    #[inline]
    pub fn date(&self) -> NaiveDate {
        self.start_time.date()
    }

    /// Occupied interval.
    pub fn window(&self) -> TimeWindow {
        TimeWindow::new(self.start_time, self.end_time)
    }

    /// Length of the interval in minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.end_time - self.start_time).num_minutes()
    }

    /// Whether this assignment sits on the given lane and day.
    pub fn is_on(&self, technician_id: &str, date: NaiveDate) -> bool {
        self.technician_id == technician_id && self.date() == date
    }
}
