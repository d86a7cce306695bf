//! Interactive assignment scheduler.
//!
//! # Operations
//!
//! | Operation | Emits |
//! |-----------|-------|
//! | `place` | create assignment + appointment → scheduled |
//! | `move_assignment` | assignment lane/interval patch + appointment start patch |
//! | `postpone` | assignment → cancelled + appointment → new, unscheduled |
//! | `advance_status` | assignment status patch |
//!
//! Every operation reads a [`DaySnapshot`] and returns a [`MutationPlan`] or
//! a rejection. Rejections never come with partial writes. Only time overlap
//! blocks by default; capacity overflow yields a [`CapacityWarning`] unless
//! [`CapacityPolicy::Block`] is configured.

use chrono::NaiveDateTime;
use tracing::{debug, warn};

use super::plan::{Mutation, MutationPlan};
use crate::capacity::{CapacityWarning, TechnicianLane};
use crate::config::{CapacityPolicy, OverflowPolicy, PlannerConfig};
use crate::conflict;
use crate::error::{SchedulerError, SchedulerResult};
use crate::grid::{self, DropPosition, TimeGrid};
use crate::models::{
    AppointmentPatch, AssignmentPatch, AssignmentStatus, Aw, DaySnapshot, NewAssignment,
    ScheduleAssignment, Technician,
};
use crate::validation::{ValidationError, ValidationErrorKind};

/// Side-effect free scheduling engine for one day view.
///
/// # Example
///
/// ```
/// use workshop_planner::grid::DropPosition;
/// use workshop_planner::models::{Appointment, DaySnapshot, Technician};
/// use workshop_planner::scheduler::AssignmentScheduler;
/// use chrono::NaiveDate;
///
/// let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
/// let snapshot = DaySnapshot::new(date)
///     .with_technician(Technician::new("T1", 40))
///     .with_appointment(Appointment::new("X", 10));
///
/// let scheduler = AssignmentScheduler::default();
/// let plan = scheduler
///     .place(&snapshot, "X", "T1", &DropPosition::at(9, 0).unwrap())
///     .unwrap();
/// let created = plan.created_assignment().unwrap();
/// assert_eq!(created.end_time, date.and_hms_opt(10, 0, 0).unwrap());
/// ```
#[derive(Debug, Clone, Default)]
pub struct AssignmentScheduler {
    grid: TimeGrid,
    capacity_policy: CapacityPolicy,
    overflow_policy: OverflowPolicy,
}

impl AssignmentScheduler {
    /// Creates a scheduler with default policies.
    pub fn new(grid: TimeGrid) -> Self {
        Self {
            grid,
            capacity_policy: CapacityPolicy::default(),
            overflow_policy: OverflowPolicy::default(),
        }
    }

    pub fn from_config(config: &PlannerConfig) -> Self {
        Self::new(config.grid())
            .with_capacity_policy(config.capacity_policy)
            .with_overflow_policy(config.overflow_policy)
    }

    pub fn with_capacity_policy(mut self, policy: CapacityPolicy) -> Self {
        self.capacity_policy = policy;
        self
    }

    pub fn with_overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    /// Places an unscheduled appointment on a technician lane.
    ///
    /// The plan holds the new assignment and the appointment patch; both
    /// must be applied together.
    pub fn place(
        &self,
        snapshot: &DaySnapshot,
        appointment_id: &str,
        technician_id: &str,
        drop: &DropPosition,
    ) -> SchedulerResult<MutationPlan> {
        let appointment = snapshot
            .appointment(appointment_id)
            .ok_or_else(|| ValidationError::unknown_appointment(appointment_id))?;
        let technician = active_technician(snapshot, technician_id)?;

        if !appointment.is_schedulable() {
            return Err(ValidationError::new(
                ValidationErrorKind::NotSchedulable,
                format!(
                    "Appointment '{}' is {:?} and cannot be scheduled",
                    appointment.id, appointment.status
                ),
            )
            .into());
        }
        if let Some(existing) = snapshot.active_assignment_for(appointment_id) {
            return Err(ValidationError::new(
                ValidationErrorKind::AlreadyScheduled,
                format!(
                    "Appointment '{}' is already assigned ('{}')",
                    appointment_id, existing.id
                ),
            )
            .into());
        }

        let (start, end) = self.interval(snapshot, drop, appointment.aw_estimate)?;
        let lane = snapshot.lane_assignments(technician_id);
        self.ensure_free(technician_id, start, end, lane, None)?;
        let warning = self.check_capacity(snapshot, technician, appointment.aw_estimate, None)?;

        debug!(
            appointment_id,
            technician_id,
            %start,
            %end,
            aw = appointment.aw_estimate,
            "placement accepted"
        );

        let mut plan = MutationPlan::new().with_warning(warning);
        plan.push(Mutation::CreateAssignment(NewAssignment {
            appointment_id: appointment.id.clone(),
            technician_id: technician.id.clone(),
            start_time: start,
            end_time: end,
            aw_planned: appointment.aw_estimate,
            status: AssignmentStatus::Scheduled,
        }));
        plan.push(Mutation::UpdateAppointment {
            id: appointment.id.clone(),
            patch: AppointmentPatch::scheduled(start),
        });
        Ok(plan)
    }

    /// Moves an assignment to another slot, possibly on another lane.
    ///
    /// The interval length follows the assignment's `aw_planned`, not the
    /// appointment's current estimate.
    pub fn move_assignment(
        &self,
        snapshot: &DaySnapshot,
        assignment_id: &str,
        technician_id: &str,
        drop: &DropPosition,
    ) -> SchedulerResult<MutationPlan> {
        let assignment = find_assignment(snapshot, assignment_id)?;
        if assignment.status.is_terminal() {
            return Err(ValidationError::new(
                ValidationErrorKind::IllegalTransition,
                format!(
                    "Assignment '{}' is {:?} and cannot be moved",
                    assignment.id, assignment.status
                ),
            )
            .into());
        }
        let technician = active_technician(snapshot, technician_id)?;

        let (start, end) = self.interval(snapshot, drop, assignment.aw_planned)?;
        let lane = snapshot.lane_assignments(technician_id);
        self.ensure_free(technician_id, start, end, lane, Some(assignment_id))?;

        let warning = if technician.id == assignment.technician_id {
            None
        } else {
            self.check_capacity(
                snapshot,
                technician,
                assignment.aw_planned,
                Some(assignment_id),
            )?
        };

        debug!(
            assignment_id,
            from = %assignment.technician_id,
            to = technician_id,
            %start,
            %end,
            "move accepted"
        );

        let mut plan = MutationPlan::new().with_warning(warning);
        plan.push(Mutation::UpdateAssignment {
            id: assignment.id.clone(),
            patch: AssignmentPatch::relocate(technician.id.clone(), start, end),
        });
        plan.push(Mutation::UpdateAppointment {
            id: assignment.appointment_id.clone(),
            patch: AppointmentPatch::rescheduled(start),
        });
        Ok(plan)
    }

    /// Cancels a scheduled assignment and returns its appointment to the
    /// backlog.
    pub fn postpone(
        &self,
        snapshot: &DaySnapshot,
        assignment_id: &str,
    ) -> SchedulerResult<MutationPlan> {
        let assignment = find_assignment(snapshot, assignment_id)?;
        ensure_transition(assignment, AssignmentStatus::Cancelled)?;

        debug!(assignment_id, appointment_id = %assignment.appointment_id, "postpone accepted");

        let mut plan = MutationPlan::new();
        plan.push(Mutation::UpdateAssignment {
            id: assignment.id.clone(),
            patch: AssignmentPatch::status(AssignmentStatus::Cancelled),
        });
        plan.push(Mutation::UpdateAppointment {
            id: assignment.appointment_id.clone(),
            patch: AppointmentPatch::unscheduled(),
        });
        Ok(plan)
    }

    /// Moves an assignment along its status machine.
    pub fn advance_status(
        &self,
        snapshot: &DaySnapshot,
        assignment_id: &str,
        status: AssignmentStatus,
    ) -> SchedulerResult<MutationPlan> {
        let assignment = find_assignment(snapshot, assignment_id)?;
        ensure_transition(assignment, status)?;

        debug!(assignment_id, from = ?assignment.status, to = ?status, "status change accepted");

        let mut plan = MutationPlan::new();
        plan.push(Mutation::UpdateAssignment {
            id: assignment.id.clone(),
            patch: AssignmentPatch::status(status),
        });
        Ok(plan)
    }

    /// Snapped start and AW-derived end for a drop on the snapshot day.
    fn interval(
        &self,
        snapshot: &DaySnapshot,
        drop: &DropPosition,
        aw: Aw,
    ) -> SchedulerResult<(NaiveDateTime, NaiveDateTime)> {
        let raw = self.grid.position_to_time(snapshot.date, drop);
        let start = self.grid.snap_to_grid(raw);
        let end = self.grid.calculate_end_time(start, aw);

        if end <= start {
            return Err(ValidationError::new(
                ValidationErrorKind::InvalidInterval,
                format!("Zero-length interval at {start}: nothing to schedule"),
            )
            .into());
        }
        if !grid::within_day(start, end) {
            warn!(%start, %end, "placement runs past midnight");
            return Err(ValidationError::new(
                ValidationErrorKind::InvalidInterval,
                format!("Interval {start} - {end} spans two days"),
            )
            .into());
        }
        if self.overflow_policy == OverflowPolicy::Reject
            && self.grid.runs_past_closing(snapshot.date, end)
        {
            let closing = self.grid.closing(snapshot.date);
            warn!(%start, %end, %closing, "placement runs past closing");
            return Err(SchedulerError::OutsideWorkingHours {
                start,
                end,
                closing,
            });
        }
        Ok((start, end))
    }

    fn ensure_free(
        &self,
        technician_id: &str,
        start: NaiveDateTime,
        end: NaiveDateTime,
        lane: Vec<&ScheduleAssignment>,
        exclude_id: Option<&str>,
    ) -> SchedulerResult<()> {
        let candidates = lane
            .into_iter()
            .filter(|a| exclude_id.map_or(true, |id| a.id != id));
        let clashes = conflict::find_conflicts(start, end, candidates);
        if clashes.is_empty() {
            return Ok(());
        }

        let conflicting: Vec<String> = clashes.iter().map(|a| a.id.clone()).collect();
        warn!(technician_id, %start, %end, ?conflicting, "placement conflicts");
        Err(SchedulerError::Conflict {
            technician_id: technician_id.to_string(),
            start,
            end,
            conflicting,
        })
    }

    /// Capacity check for adding `aw` to a lane; `exclude_id` is left out of
    /// the current plan (the assignment being moved onto this lane).
    fn check_capacity(
        &self,
        snapshot: &DaySnapshot,
        technician: &Technician,
        aw: Aw,
        exclude_id: Option<&str>,
    ) -> SchedulerResult<Option<CapacityWarning>> {
        let mut lane = TechnicianLane::build(technician, snapshot);
        if let Some(id) = exclude_id {
            if let Some(pos) = lane.assignments.iter().position(|a| a.id == id) {
                let removed = lane.assignments.remove(pos);
                lane.planned_aw = lane.planned_aw.saturating_sub(removed.aw_planned);
            }
        }

        let Some(warning) = lane.warning_with(aw) else {
            return Ok(None);
        };
        match self.capacity_policy {
            CapacityPolicy::Warn => {
                warn!(
                    technician_id = %warning.technician_id,
                    planned = warning.planned_aw,
                    capacity = warning.capacity_aw,
                    "lane over capacity"
                );
                Ok(Some(warning))
            }
            CapacityPolicy::Block => Err(SchedulerError::CapacityExceeded(warning)),
        }
    }
}

fn active_technician<'a>(
    snapshot: &'a DaySnapshot,
    technician_id: &str,
) -> SchedulerResult<&'a Technician> {
    let technician = snapshot
        .technician(technician_id)
        .ok_or_else(|| ValidationError::unknown_technician(technician_id))?;
    if !technician.active {
        return Err(ValidationError::new(
            ValidationErrorKind::InactiveTechnician,
            format!("Technician '{technician_id}' is not active"),
        )
        .into());
    }
    Ok(technician)
}

fn find_assignment<'a>(
    snapshot: &'a DaySnapshot,
    assignment_id: &str,
) -> SchedulerResult<&'a ScheduleAssignment> {
    snapshot
        .assignment(assignment_id)
        .ok_or_else(|| ValidationError::unknown_assignment(assignment_id).into())
}

fn ensure_transition(
    assignment: &ScheduleAssignment,
    next: AssignmentStatus,
) -> SchedulerResult<()> {
    if assignment.status.can_transition_to(next) {
        Ok(())
    } else {
        warn!(
            assignment_id = %assignment.id,
            from = ?assignment.status,
            to = ?next,
            "illegal transition"
        );
        Err(ValidationError::illegal_transition(&assignment.id, assignment.status, next).into())
    }
}
