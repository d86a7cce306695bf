//! Create and patch payloads handed to the repositories.
//!
//! The engine never mutates stored entities. It describes changes with
//! these payloads and the caller applies them.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use super::{Appointment, AppointmentStatus, AssignmentStatus, Aw, ScheduleAssignment};

/// Input for creating an assignment. The store assigns the id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAssignment {
    pub appointment_id: String,
    pub technician_id: String,
    pub start_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
    pub aw_planned: Aw,
    pub status: AssignmentStatus,
}

impl NewAssignment {
    /// Materializes the assignment under the given id.
    pub fn into_assignment(self, id: impl Into<String>) -> ScheduleAssignment {
        ScheduleAssignment::new(
            id,
            self.appointment_id,
            self.technician_id,
            self.start_time,
            self.end_time,
            self.aw_planned,
        )
        .with_status(self.status)
    }
}

/// Partial update of an assignment. `None` fields are left untouched.
///
/// There is no `aw_planned` field: it is fixed at creation.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AssignmentPatch {
    pub technician_id: Option<String>,
    pub start_time: Option<NaiveDateTime>,
    pub end_time: Option<NaiveDateTime>,
    pub status: Option<AssignmentStatus>,
}

impl AssignmentPatch {
    pub fn status(status: AssignmentStatus) -> Self {
        Self {
            status: Some(status),
            ..Default::default()
        }
    }

    /// Moves the assignment to another lane and interval.
    pub fn relocate(
        technician_id: impl Into<String>,
        start_time: NaiveDateTime,
        end_time: NaiveDateTime,
    ) -> Self {
        Self {
            technician_id: Some(technician_id.into()),
            start_time: Some(start_time),
            end_time: Some(end_time),
            status: None,
        }
    }

    /// Patch that puts every patchable field back to `original`.
    pub fn restore_from(original: &ScheduleAssignment) -> Self {
        Self {
            technician_id: Some(original.technician_id.clone()),
            start_time: Some(original.start_time),
            end_time: Some(original.end_time),
            status: Some(original.status),
        }
    }

    pub fn apply_to(&self, assignment: &mut ScheduleAssignment) {
        if let Some(technician_id) = &self.technician_id {
            assignment.technician_id = technician_id.clone();
        }
        if let Some(start) = self.start_time {
            assignment.start_time = start;
        }
        if let Some(end) = self.end_time {
            assignment.end_time = end;
        }
        if let Some(status) = self.status {
            assignment.status = status;
        }
    }
}

/// Tri-state update for nullable fields.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "snake_case")]
pub enum FieldUpdate<T> {
    #[default]
    Keep,
    Set(T),
    Clear,
}

impl<T: Clone> FieldUpdate<T> {
    fn apply(&self, field: &mut Option<T>) {
        match self {
            Self::Keep => {}
            Self::Set(value) => *field = Some(value.clone()),
            Self::Clear => *field = None,
        }
    }

    fn restoring(original: &Option<T>) -> Self {
        match original {
            Some(value) => Self::Set(value.clone()),
            None => Self::Clear,
        }
    }
}

/// Partial update of an appointment, limited to the fields the planner owns.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct AppointmentPatch {
    pub status: Option<AppointmentStatus>,
    pub scheduled_at: FieldUpdate<NaiveDateTime>,
}

impl AppointmentPatch {
    /// Marks the appointment scheduled at `start`.
    pub fn scheduled(start: NaiveDateTime) -> Self {
        Self {
            status: Some(AppointmentStatus::Scheduled),
            scheduled_at: FieldUpdate::Set(start),
        }
    }

    /// Returns the appointment to the unscheduled backlog.
    pub fn unscheduled() -> Self {
        Self {
            status: Some(AppointmentStatus::New),
            scheduled_at: FieldUpdate::Clear,
        }
    }

    /// Updates only the scheduled start.
    pub fn rescheduled(start: NaiveDateTime) -> Self {
        Self {
            status: None,
            scheduled_at: FieldUpdate::Set(start),
        }
    }

    pub fn restore_from(original: &Appointment) -> Self {
        Self {
            status: Some(original.status),
            scheduled_at: FieldUpdate::restoring(&original.scheduled_at),
        }
    }

    pub fn apply_to(&self, appointment: &mut Appointment) {
        if let Some(status) = self.status {
            appointment.status = status;
        }
        self.scheduled_at.apply(&mut appointment.scheduled_at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::at;

    #[test]
    fn test_assignment_patch_apply() {
        let mut a = ScheduleAssignment::new("S1", "A1", "T1", at(9, 0), at(10, 0), 10);
        let original = a.clone();

        AssignmentPatch::relocate("T2", at(11, 0), at(12, 0)).apply_to(&mut a);
        assert_eq!(a.technician_id, "T2");
        assert_eq!(a.start_time, at(11, 0));
        assert_eq!(a.end_time, at(12, 0));
        assert_eq!(a.aw_planned, 10);

        AssignmentPatch::restore_from(&original).apply_to(&mut a);
        assert_eq!(a, original);
    }

    #[test]
    fn test_appointment_patch_clears_schedule() {
        let mut appt = Appointment::new("A1", 10);
        AppointmentPatch::scheduled(at(9, 0)).apply_to(&mut appt);
        assert_eq!(appt.status, AppointmentStatus::Scheduled);
        assert_eq!(appt.scheduled_at, Some(at(9, 0)));

        AppointmentPatch::unscheduled().apply_to(&mut appt);
        assert_eq!(appt.status, AppointmentStatus::New);
        assert_eq!(appt.scheduled_at, None);
    }

    #[test]
    fn test_keep_leaves_field() {
        let mut appt = Appointment::new("A1", 10).with_scheduled_at(at(8, 0));
        let patch = AppointmentPatch {
            status: Some(AppointmentStatus::InProgress),
            scheduled_at: FieldUpdate::Keep,
        };
        patch.apply_to(&mut appt);
        assert_eq!(appt.scheduled_at, Some(at(8, 0)));
        assert_eq!(appt.status, AppointmentStatus::InProgress);
    }
}
