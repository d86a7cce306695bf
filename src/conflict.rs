//! Double-booking detection on a technician lane.
//!
//! Intervals are half-open: `[s, e)`. A candidate `[start, end)` conflicts
//! with an existing assignment iff `start < e && end > s`, so an assignment
//! ending exactly when another starts is not a conflict.
//!
//! Cancelled assignments never take part. All checks are linear scans over
//! the lane; a day lane holds a few dozen entries at most.

use chrono::{NaiveDate, NaiveDateTime};

use crate::grid::TimeGrid;
use crate::models::{Aw, ScheduleAssignment};

/// Half-open overlap test.
#[inline]
pub fn overlaps(
    start: NaiveDateTime,
    end: NaiveDateTime,
    other_start: NaiveDateTime,
    other_end: NaiveDateTime,
) -> bool {
    start < other_end && end > other_start
}

/// Whether `[start, end)` overlaps any non-cancelled assignment in `existing`.
pub fn has_conflict<'a, I>(start: NaiveDateTime, end: NaiveDateTime, existing: I) -> bool
where
    I: IntoIterator<Item = &'a ScheduleAssignment>,
{
    existing
        .into_iter()
        .any(|a| a.is_active() && overlaps(start, end, a.start_time, a.end_time))
}

/// Like [`has_conflict`], ignoring the assignment with id `exclude_id`.
///
/// Used when moving an assignment: it must not clash with itself.
pub fn has_conflict_excluding<'a, I>(
    start: NaiveDateTime,
    end: NaiveDateTime,
    existing: I,
    exclude_id: &str,
) -> bool
where
    I: IntoIterator<Item = &'a ScheduleAssignment>,
{
    has_conflict(
        start,
        end,
        existing.into_iter().filter(|a| a.id != exclude_id),
    )
}

/// All non-cancelled assignments overlapping `[start, end)`.
pub fn find_conflicts<'a, I>(
    start: NaiveDateTime,
    end: NaiveDateTime,
    existing: I,
) -> Vec<&'a ScheduleAssignment>
where
    I: IntoIterator<Item = &'a ScheduleAssignment>,
{
    existing
        .into_iter()
        .filter(|a| a.is_active() && overlaps(start, end, a.start_time, a.end_time))
        .collect()
}

/// Earliest slot on `date` where `aw` fits before closing without conflict.
pub fn first_free_slot<'a, I>(
    grid: &TimeGrid,
    date: NaiveDate,
    aw: Aw,
    existing: I,
) -> Option<NaiveDateTime>
where
    I: IntoIterator<Item = &'a ScheduleAssignment>,
{
    let lane: Vec<&ScheduleAssignment> = existing.into_iter().filter(|a| a.is_active()).collect();
    let closing = grid.closing(date);

    grid.slots(date).find(|&start| {
        let end = grid.calculate_end_time(start, aw);
        end <= closing && !has_conflict(start, end, lane.iter().copied())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{assignment, at, day};
    use crate::models::AssignmentStatus;

    #[test]
    fn test_touching_boundary_is_not_conflict() {
        let existing = vec![assignment("S1", "X", "T1", (9, 0), (10, 0), 10)];
        assert!(!has_conflict(at(10, 0), at(11, 0), &existing));
        assert!(!has_conflict(at(8, 0), at(9, 0), &existing));
    }

    #[test]
    fn test_partial_overlap_is_conflict() {
        let existing = vec![assignment("S1", "X", "T1", (10, 30), (11, 30), 10)];
        assert!(has_conflict(at(10, 0), at(11, 0), &existing));
        assert!(has_conflict(at(11, 0), at(12, 0), &existing));
    }

    #[test]
    fn test_containment_is_conflict() {
        let existing = vec![assignment("S1", "X", "T1", (9, 0), (12, 0), 30)];
        assert!(has_conflict(at(10, 0), at(10, 30), &existing));
        assert!(has_conflict(at(8, 0), at(13, 0), &existing));
    }

    #[test]
    fn test_cancelled_ignored() {
        let existing = vec![assignment("S1", "X", "T1", (9, 0), (10, 0), 10)
            .with_status(AssignmentStatus::Cancelled)];
        assert!(!has_conflict(at(9, 0), at(10, 0), &existing));
        assert!(find_conflicts(at(9, 0), at(10, 0), &existing).is_empty());
    }

    #[test]
    fn test_excluding_self() {
        let existing = vec![
            assignment("S1", "X", "T1", (9, 0), (10, 0), 10),
            assignment("S2", "Y", "T1", (11, 0), (12, 0), 10),
        ];
        // Shift S1 by 30 minutes: only overlaps itself
        assert!(has_conflict(at(9, 30), at(10, 30), &existing));
        assert!(!has_conflict_excluding(at(9, 30), at(10, 30), &existing, "S1"));
        // Into S2's slot still conflicts
        assert!(has_conflict_excluding(at(10, 30), at(11, 30), &existing, "S1"));
    }

    #[test]
    fn test_find_conflicts_lists_all() {
        let existing = vec![
            assignment("S1", "X", "T1", (9, 0), (10, 0), 10),
            assignment("S2", "Y", "T1", (10, 0), (11, 0), 10),
            assignment("S3", "Z", "T1", (12, 0), (13, 0), 10),
        ];
        let ids: Vec<_> = find_conflicts(at(9, 30), at(10, 30), &existing)
            .into_iter()
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(ids, vec!["S1", "S2"]);
    }

    #[test]
    fn test_idempotent() {
        let existing = vec![assignment("S1", "X", "T1", (10, 30), (11, 30), 10)];
        let first = has_conflict(at(10, 0), at(11, 0), &existing);
        for _ in 0..10 {
            assert_eq!(has_conflict(at(10, 0), at(11, 0), &existing), first);
        }
    }

    #[test]
    fn test_first_free_slot() {
        let grid = TimeGrid::default();
        let existing = vec![
            assignment("S1", "X", "T1", (8, 0), (9, 0), 10),
            assignment("S2", "Y", "T1", (9, 30), (10, 0), 5),
        ];
        // 30 min fits 09:00-09:30 exactly
        assert_eq!(first_free_slot(&grid, day(), 5, &existing), Some(at(9, 0)));
        // 60 min only after 10:00
        assert_eq!(first_free_slot(&grid, day(), 10, &existing), Some(at(10, 0)));
        // longer than the working day
        assert_eq!(first_free_slot(&grid, day(), 101, &existing), None);
    }
}
