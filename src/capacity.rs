//! Technician capacity accounting in AW.
//!
//! Capacity for a day starts at the technician's `aw_capacity_per_day` and
//! is reduced by two sources:
//!
//! 1. **Absences**: any full-day absence removes the whole capacity; partial
//!    absences remove their stated AW.
//! 2. **Assignments**: every non-cancelled assignment removes its
//!    `aw_planned`.
//!
//! Available AW never goes below zero. All functions here are pure and take
//! collections already scoped to one technician and day; [`TechnicianLane`]
//! does the scoping from a [`DaySnapshot`].

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::{Absence, Aw, DaySnapshot, ScheduleAssignment, Technician};

/// Informational notice that a lane is planned beyond its capacity.
///
/// Never blocks a placement unless the capacity policy says so.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapacityWarning {
    pub technician_id: String,
    pub date: NaiveDate,
    /// Planned AW including the triggering placement.
    pub planned_aw: Aw,
    /// Capacity after absences.
    pub capacity_aw: Aw,
}

impl CapacityWarning {
    /// AW planned beyond capacity.
    pub fn excess_aw(&self) -> Aw {
        self.planned_aw.saturating_sub(self.capacity_aw)
    }
}

/// AW removed from `capacity_per_day` by `absences`.
pub fn absence_deduction<'a, I>(capacity_per_day: Aw, absences: I) -> Aw
where
    I: IntoIterator<Item = &'a Absence>,
{
    let mut deduction: Aw = 0;
    for absence in absences {
        match absence.aw_impact {
            None => return capacity_per_day,
            Some(aw) => deduction = deduction.saturating_add(aw),
        }
    }
    deduction.min(capacity_per_day)
}

/// Capacity left after absences, before any assignment.
pub fn effective_capacity<'a, I>(capacity_per_day: Aw, absences: I) -> Aw
where
    I: IntoIterator<Item = &'a Absence>,
{
    capacity_per_day.saturating_sub(absence_deduction(capacity_per_day, absences))
}

/// Sum of `aw_planned` over non-cancelled assignments.
pub fn planned_aw<'a, I>(assignments: I) -> Aw
where
    I: IntoIterator<Item = &'a ScheduleAssignment>,
{
    assignments
        .into_iter()
        .filter(|a| a.is_active())
        .fold(0, |sum: Aw, a| sum.saturating_add(a.aw_planned))
}

/// AW still free: capacity − absences − planned work, clamped at 0.
pub fn available_aw<'a, A, S>(capacity_per_day: Aw, absences: A, assignments: S) -> Aw
where
    A: IntoIterator<Item = &'a Absence>,
    S: IntoIterator<Item = &'a ScheduleAssignment>,
{
    effective_capacity(capacity_per_day, absences).saturating_sub(planned_aw(assignments))
}

/// Planned share of capacity in percent. 0 for zero capacity.
pub fn utilization(planned: Aw, capacity_per_day: Aw) -> f64 {
    if capacity_per_day == 0 {
        return 0.0;
    }
    f64::from(planned) / f64::from(capacity_per_day) * 100.0
}

/// One technician's timeline for the snapshot day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TechnicianLane {
    pub technician_id: String,
    pub technician_name: String,
    pub date: NaiveDate,
    /// Nominal daily capacity.
    pub capacity_aw: Aw,
    /// Capacity after absences.
    pub effective_capacity_aw: Aw,
    pub planned_aw: Aw,
    pub available_aw: Aw,
    /// Planned vs. nominal capacity, in percent.
    pub utilization: f64,
    /// A full-day absence applies.
    pub absent: bool,
    /// Non-cancelled assignments, ordered by start time.
    pub assignments: Vec<ScheduleAssignment>,
}

impl TechnicianLane {
    /// Builds the lane of `technician` from `snapshot`.
    pub fn build(technician: &Technician, snapshot: &DaySnapshot) -> Self {
        let absences = snapshot.absences_for(&technician.id);
        let mut assignments: Vec<ScheduleAssignment> = snapshot
            .lane_assignments(&technician.id)
            .into_iter()
            .cloned()
            .collect();
        assignments.sort_by_key(|a| a.start_time);

        let capacity = technician.aw_capacity_per_day;
        let effective = effective_capacity(capacity, absences.iter().copied());
        let planned = planned_aw(&assignments);

        Self {
            technician_id: technician.id.clone(),
            technician_name: technician.name.clone(),
            date: snapshot.date,
            capacity_aw: capacity,
            effective_capacity_aw: effective,
            planned_aw: planned,
            available_aw: available_aw(capacity, absences.iter().copied(), &assignments),
            utilization: utilization(planned, capacity),
            absent: absences.iter().any(|a| a.is_full_day()),
            assignments,
        }
    }

    /// Planned work exceeds capacity after absences.
    pub fn is_overbooked(&self) -> bool {
        self.planned_aw > self.effective_capacity_aw
    }

    /// Warning for the current plan, if overbooked.
    pub fn capacity_warning(&self) -> Option<CapacityWarning> {
        self.warning_with(0)
    }

    /// Warning if `extra_aw` were added to this lane.
    pub fn warning_with(&self, extra_aw: Aw) -> Option<CapacityWarning> {
        let planned = self.planned_aw.saturating_add(extra_aw);
        (planned > self.effective_capacity_aw).then(|| CapacityWarning {
            technician_id: self.technician_id.clone(),
            date: self.date,
            planned_aw: planned,
            capacity_aw: self.effective_capacity_aw,
        })
    }
}

/// Lanes of all active technicians, in snapshot order.
pub fn lanes(snapshot: &DaySnapshot) -> Vec<TechnicianLane> {
    snapshot
        .active_technicians()
        .map(|t| TechnicianLane::build(t, snapshot))
        .collect()
}
