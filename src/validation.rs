//! Validation errors and day-snapshot integrity checks.
//!
//! [`ValidationError`] is the rejection the engine raises for bad requests
//! (unknown references, illegal status transitions). [`validate_snapshot`]
//! checks a loaded day snapshot against the planner's invariants:
//! - Duplicate IDs
//! - Assignments referencing unknown appointments or technicians
//! - Empty or inverted intervals, intervals spanning two days
//! - Overlapping non-cancelled assignments on one lane
//! - Appointments held by more than one non-cancelled assignment

use std::collections::{HashMap, HashSet};

use crate::conflict;
use crate::grid;
use crate::models::{AssignmentStatus, DaySnapshot, ScheduleAssignment};

/// Validation result.
pub type ValidationResult = Result<(), Vec<ValidationError>>;

/// A validation error.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{message}")]
pub struct ValidationError {
    /// Error category.
    pub kind: ValidationErrorKind,
    /// Human-readable description.
    pub message: String,
}

/// Categories of validation errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// Two entities share the same ID.
    DuplicateId,
    /// Referenced appointment does not exist.
    UnknownAppointment,
    /// Referenced technician does not exist.
    UnknownTechnician,
    /// Referenced assignment does not exist.
    UnknownAssignment,
    /// Technician exists but is not active.
    InactiveTechnician,
    /// Assignment status change not allowed by the state machine.
    IllegalTransition,
    /// Appointment already holds a non-cancelled assignment.
    AlreadyScheduled,
    /// Appointment is done, delivered or cancelled.
    NotSchedulable,
    /// Interval is empty, inverted, or spans two days.
    InvalidInterval,
    /// Two non-cancelled assignments overlap on one lane.
    OverlappingAssignments,
    /// The entity changed between read and write.
    ConcurrentModification,
}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn unknown_appointment(id: &str) -> Self {
        Self::new(
            ValidationErrorKind::UnknownAppointment,
            format!("Unknown appointment '{id}'"),
        )
    }

    pub fn unknown_technician(id: &str) -> Self {
        Self::new(
            ValidationErrorKind::UnknownTechnician,
            format!("Unknown technician '{id}'"),
        )
    }

    pub fn unknown_assignment(id: &str) -> Self {
        Self::new(
            ValidationErrorKind::UnknownAssignment,
            format!("Unknown assignment '{id}'"),
        )
    }

    pub fn illegal_transition(id: &str, from: AssignmentStatus, to: AssignmentStatus) -> Self {
        Self::new(
            ValidationErrorKind::IllegalTransition,
            format!("Assignment '{id}' cannot change from {from:?} to {to:?}"),
        )
    }
}

/// Validates a day snapshot.
///
/// Checks:
/// 1. No duplicate technician, appointment, assignment or absence IDs
/// 2. Every assignment references a known appointment and technician
/// 3. Every assignment has `start < end` on a single day
/// 4. No two non-cancelled assignments overlap on one lane
/// 5. No appointment has more than one non-cancelled assignment
///
/// # Returns
/// `Ok(())` if all checks pass, `Err(errors)` with all detected issues.
pub fn validate_snapshot(snapshot: &DaySnapshot) -> ValidationResult {
    let mut errors = Vec::new();

    check_unique(
        "technician",
        snapshot.technicians.iter().map(|t| t.id.as_str()),
        &mut errors,
    );
    check_unique(
        "appointment",
        snapshot.appointments.iter().map(|a| a.id.as_str()),
        &mut errors,
    );
    check_unique(
        "assignment",
        snapshot.assignments.iter().map(|a| a.id.as_str()),
        &mut errors,
    );
    check_unique(
        "absence",
        snapshot.absences.iter().map(|a| a.id.as_str()),
        &mut errors,
    );

    let appointment_ids: HashSet<&str> =
        snapshot.appointments.iter().map(|a| a.id.as_str()).collect();
    let technician_ids: HashSet<&str> =
        snapshot.technicians.iter().map(|t| t.id.as_str()).collect();

    for a in &snapshot.assignments {
        if !appointment_ids.contains(a.appointment_id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownAppointment,
                format!(
                    "Assignment '{}' references unknown appointment '{}'",
                    a.id, a.appointment_id
                ),
            ));
        }
        if !technician_ids.contains(a.technician_id.as_str()) {
            errors.push(ValidationError::new(
                ValidationErrorKind::UnknownTechnician,
                format!(
                    "Assignment '{}' references unknown technician '{}'",
                    a.id, a.technician_id
                ),
            ));
        }
        if a.start_time >= a.end_time || !grid::within_day(a.start_time, a.end_time) {
            errors.push(ValidationError::new(
                ValidationErrorKind::InvalidInterval,
                format!(
                    "Assignment '{}' has invalid interval {} - {}",
                    a.id, a.start_time, a.end_time
                ),
            ));
        }
    }

    check_overlaps(&snapshot.assignments, &mut errors);
    check_single_active(&snapshot.assignments, &mut errors);

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_unique<'a>(
    entity: &str,
    ids: impl Iterator<Item = &'a str>,
    errors: &mut Vec<ValidationError>,
) {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            errors.push(ValidationError::new(
                ValidationErrorKind::DuplicateId,
                format!("Duplicate {entity} ID: {id}"),
            ));
        }
    }
}

/// Pairwise overlap check per (technician, day) lane.
fn check_overlaps(assignments: &[ScheduleAssignment], errors: &mut Vec<ValidationError>) {
    let mut lanes: HashMap<(&str, chrono::NaiveDate), Vec<&ScheduleAssignment>> = HashMap::new();
    for a in assignments.iter().filter(|a| a.is_active()) {
        lanes
            .entry((a.technician_id.as_str(), a.date()))
            .or_default()
            .push(a);
    }

    for lane in lanes.values_mut() {
        lane.sort_by(|a, b| a.start_time.cmp(&b.start_time).then_with(|| a.id.cmp(&b.id)));
        for (i, a) in lane.iter().enumerate() {
            for b in &lane[i + 1..] {
                if b.start_time >= a.end_time {
                    break;
                }
                if conflict::overlaps(a.start_time, a.end_time, b.start_time, b.end_time) {
                    errors.push(ValidationError::new(
                        ValidationErrorKind::OverlappingAssignments,
                        format!(
                            "Assignments '{}' and '{}' overlap on technician '{}'",
                            a.id, b.id, a.technician_id
                        ),
                    ));
                }
            }
        }
    }
}

fn check_single_active(assignments: &[ScheduleAssignment], errors: &mut Vec<ValidationError>) {
    let mut holders: HashMap<&str, usize> = HashMap::new();
    for a in assignments.iter().filter(|a| a.is_active()) {
        *holders.entry(a.appointment_id.as_str()).or_insert(0) += 1;
    }
    let mut duplicated: Vec<_> = holders.into_iter().filter(|&(_, n)| n > 1).collect();
    duplicated.sort();
    for (appointment_id, count) in duplicated {
        errors.push(ValidationError::new(
            ValidationErrorKind::AlreadyScheduled,
            format!("Appointment '{appointment_id}' has {count} active assignments"),
        ));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{assignment, at, sample_snapshot};
    use crate::models::{Appointment, Technician};

    #[test]
    fn test_valid_snapshot() {
        let snap = sample_snapshot()
            .with_assignment(assignment("S1", "X", "T1", (9, 0), (10, 0), 10))
            .with_assignment(assignment("S2", "Y", "T1", (10, 0), (11, 0), 10))
            .with_assignment(assignment("S3", "Z", "T2", (9, 0), (11, 0), 20));
        assert!(validate_snapshot(&snap).is_ok());
    }

    #[test]
    fn test_duplicate_ids() {
        let snap = sample_snapshot()
            .with_technician(Technician::new("T1", 10))
            .with_appointment(Appointment::new("X", 5));

        let errors = validate_snapshot(&snap).unwrap_err();
        assert_eq!(
            errors
                .iter()
                .filter(|e| e.kind == ValidationErrorKind::DuplicateId)
                .count(),
            2
        );
        assert!(errors.iter().any(|e| e.message.contains("technician")));
    }

    #[test]
    fn test_unknown_references() {
        let snap = sample_snapshot()
            .with_assignment(assignment("S1", "NOPE", "T9", (9, 0), (10, 0), 10));
        let errors = validate_snapshot(&snap).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::UnknownAppointment));
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::UnknownTechnician));
    }

    #[test]
    fn test_inverted_interval() {
        let snap = sample_snapshot()
            .with_assignment(assignment("S1", "X", "T1", (10, 0), (9, 0), 10));
        let errors = validate_snapshot(&snap).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::InvalidInterval));
    }

    #[test]
    fn test_overlap_detected() {
        let snap = sample_snapshot()
            .with_assignment(assignment("S1", "X", "T1", (9, 0), (10, 0), 10))
            .with_assignment(assignment("S2", "Y", "T1", (9, 30), (10, 30), 10));
        let errors = validate_snapshot(&snap).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].kind, ValidationErrorKind::OverlappingAssignments);
    }

    #[test]
    fn test_cancelled_overlap_allowed() {
        let snap = sample_snapshot()
            .with_assignment(assignment("S1", "X", "T1", (9, 0), (10, 0), 10))
            .with_assignment(
                assignment("S2", "Y", "T1", (9, 30), (10, 30), 10)
                    .with_status(AssignmentStatus::Cancelled),
            );
        assert!(validate_snapshot(&snap).is_ok());
    }

    #[test]
    fn test_double_assignment_of_appointment() {
        let snap = sample_snapshot()
            .with_assignment(assignment("S1", "X", "T1", (9, 0), (10, 0), 10))
            .with_assignment(assignment("S2", "X", "T2", (9, 0), (10, 0), 10));
        let errors = validate_snapshot(&snap).unwrap_err();
        assert!(errors
            .iter()
            .any(|e| e.kind == ValidationErrorKind::AlreadyScheduled));
    }

    #[test]
    fn test_midnight_end_is_same_day() {
        let mut late = assignment("S1", "X", "T1", (23, 0), (23, 30), 5);
        late.end_time = at(0, 0) + chrono::Duration::days(1);
        let snap = sample_snapshot().with_assignment(late);
        assert!(validate_snapshot(&snap).is_ok());
    }

    #[test]
    fn test_error_display() {
        let err = ValidationError::unknown_technician("T9");
        assert_eq!(err.to_string(), "Unknown technician 'T9'");
        assert_eq!(err.kind, ValidationErrorKind::UnknownTechnician);
    }
}
