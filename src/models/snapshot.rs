//! Day snapshot: the unit of input for every planner computation.
//!
//! A snapshot joins the active technicians with the appointments,
//! assignments and absences of one calendar date. It is only built from a
//! complete fetch of all collections (see [`crate::loader`]).

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::{Absence, Appointment, ScheduleAssignment, Technician};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DaySnapshot {
    /// The planned day.
    pub date: NaiveDate,
    pub technicians: Vec<Technician>,
    pub appointments: Vec<Appointment>,
    pub assignments: Vec<ScheduleAssignment>,
    pub absences: Vec<Absence>,
}

impl DaySnapshot {
    /// Creates an empty snapshot for `date`.
    pub fn new(date: NaiveDate) -> Self {
        Self {
            date,
            technicians: Vec::new(),
            appointments: Vec::new(),
            assignments: Vec::new(),
            absences: Vec::new(),
        }
    }

    pub fn with_technician(mut self, technician: Technician) -> Self {
        self.technicians.push(technician);
        self
    }

    pub fn with_appointment(mut self, appointment: Appointment) -> Self {
        self.appointments.push(appointment);
        self
    }

    pub fn with_assignment(mut self, assignment: ScheduleAssignment) -> Self {
        self.assignments.push(assignment);
        self
    }

    pub fn with_absence(mut self, absence: Absence) -> Self {
        self.absences.push(absence);
        self
    }

    pub fn technician(&self, id: &str) -> Option<&Technician> {
        self.technicians.iter().find(|t| t.id == id)
    }

    pub fn appointment(&self, id: &str) -> Option<&Appointment> {
        self.appointments.iter().find(|a| a.id == id)
    }

    pub fn assignment(&self, id: &str) -> Option<&ScheduleAssignment> {
        self.assignments.iter().find(|a| a.id == id)
    }

    /// Non-cancelled assignments on a technician's lane for this day.
    pub fn lane_assignments(&self, technician_id: &str) -> Vec<&ScheduleAssignment> {
        self.assignments
            .iter()
            .filter(|a| a.is_active() && a.is_on(technician_id, self.date))
            .collect()
    }

    /// Absences of a technician on this day.
    pub fn absences_for(&self, technician_id: &str) -> Vec<&Absence> {
        self.absences
            .iter()
            .filter(|a| a.applies_to(technician_id, self.date))
            .collect()
    }

    /// The non-cancelled assignment holding an appointment, if any.
    pub fn active_assignment_for(&self, appointment_id: &str) -> Option<&ScheduleAssignment> {
        self.assignments
            .iter()
            .find(|a| a.is_active() && a.appointment_id == appointment_id)
    }

    /// Active technicians, in snapshot order.
    pub fn active_technicians(&self) -> impl Iterator<Item = &Technician> {
        self.technicians.iter().filter(|t| t.active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{assignment, day, sample_snapshot};
    use crate::models::{AbsenceKind, AssignmentStatus};

    #[test]
    fn test_lane_assignments_skip_cancelled_and_other_days() {
        let other_day = day().succ_opt().unwrap();
        let snap = sample_snapshot()
            .with_assignment(assignment("S1", "X", "T1", (9, 0), (10, 0), 10))
            .with_assignment(
                assignment("S2", "Y", "T1", (10, 0), (11, 0), 10)
                    .with_status(AssignmentStatus::Cancelled),
            )
            .with_assignment(ScheduleAssignment::new(
                "S3",
                "Z",
                "T1",
                other_day.and_hms_opt(9, 0, 0).unwrap(),
                other_day.and_hms_opt(10, 0, 0).unwrap(),
                10,
            ));

        let lane = snap.lane_assignments("T1");
        assert_eq!(lane.len(), 1);
        assert_eq!(lane[0].id, "S1");
        assert!(snap.lane_assignments("T2").is_empty());
    }

    #[test]
    fn test_lookups() {
        let snap = sample_snapshot()
            .with_assignment(assignment("S1", "X", "T1", (9, 0), (10, 0), 10))
            .with_absence(Absence::full_day("AB1", "T2", day(), AbsenceKind::Sick));

        assert!(snap.technician("T1").is_some());
        assert!(snap.technician("T9").is_none());
        assert_eq!(snap.appointment("X").map(|a| a.aw_estimate), Some(10));
        assert_eq!(snap.active_assignment_for("X").map(|a| a.id.as_str()), Some("S1"));
        assert!(snap.active_assignment_for("Y").is_none());
        assert_eq!(snap.absences_for("T2").len(), 1);
        assert!(snap.absences_for("T1").is_empty());
    }
}
