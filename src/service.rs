//! Planner service: runs scheduler decisions against the repositories.
//!
//! Every write operation follows the same sequence:
//!
//! 1. lock the affected (technician, day) lanes
//! 2. load a fresh day snapshot
//! 3. ask [`AssignmentScheduler`] for a [`MutationPlan`]
//! 4. apply the plan all-or-nothing
//! 5. publish [`PlannerEvent`]s
//!
//! Lane locks make the check-then-act of steps 2-4 atomic with respect to
//! other service calls. Moves lock both lanes, always in key order.
//!
//! If a write fails halfway through a plan, the writes already done are
//! undone in reverse order and the original error is returned.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{NaiveDate, NaiveDateTime};
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{error, info, warn};

use crate::capacity::CapacityWarning;
use crate::config::PlannerConfig;
use crate::conflict;
use crate::error::{SchedulerError, SchedulerResult};
use crate::events::{EventBus, PlannerEvent};
use crate::grid::DropPosition;
use crate::loader::fetch_day;
use crate::models::{
    AppointmentPatch, AssignmentPatch, AssignmentStatus, Aw, DaySnapshot, ScheduleAssignment,
};
use crate::repository::{Repositories, RepositoryError, RepositoryResult};
use crate::scheduler::{
    AssignmentScheduler, DayReport, Mutation, MutationPlan, UtilizationReporter,
};
use crate::validation::{ValidationError, ValidationErrorKind};

type LaneKey = (String, NaiveDate);

/// Async mutexes keyed by lane.
#[derive(Default)]
struct LaneLocks {
    lanes: parking_lot::Mutex<HashMap<LaneKey, Arc<Mutex<()>>>>,
}

impl LaneLocks {
    /// Locks every lane in `keys`, in sorted order.
    async fn acquire(&self, mut keys: Vec<LaneKey>) -> Vec<OwnedMutexGuard<()>> {
        keys.sort();
        keys.dedup();

        let handles: Vec<Arc<Mutex<()>>> = {
            let mut lanes = self.lanes.lock();
            // Unreferenced entries are neither held nor awaited.
            lanes.retain(|_, lock| Arc::strong_count(lock) > 1);
            keys.into_iter()
                .map(|key| lanes.entry(key).or_default().clone())
                .collect()
        };

        let mut guards = Vec::with_capacity(handles.len());
        for handle in handles {
            guards.push(handle.lock_owned().await);
        }
        guards
    }
}

/// Result of an applied operation.
#[derive(Debug, Clone, PartialEq)]
pub struct ScheduleOutcome {
    /// Assignments as stored after the operation.
    pub assignments: Vec<ScheduleAssignment>,
    pub warnings: Vec<CapacityWarning>,
}

impl ScheduleOutcome {
    /// The assignment the operation was about.
    pub fn assignment(&self) -> Option<&ScheduleAssignment> {
        self.assignments.first()
    }
}

pub struct PlannerService {
    repos: Repositories,
    scheduler: AssignmentScheduler,
    reporter: UtilizationReporter,
    locks: LaneLocks,
    events: EventBus,
}

impl PlannerService {
    pub fn new(repos: Repositories, config: &PlannerConfig) -> Self {
        Self {
            repos,
            scheduler: AssignmentScheduler::from_config(config),
            reporter: UtilizationReporter::new(config.high_load_threshold),
            locks: LaneLocks::default(),
            events: EventBus::default(),
        }
    }

    /// Publishes on `events` instead of a private bus.
    pub fn with_events(mut self, events: EventBus) -> Self {
        self.events = events;
        self
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    pub fn scheduler(&self) -> &AssignmentScheduler {
        &self.scheduler
    }

    /// Places an appointment on a technician lane of `date`.
    #[tracing::instrument(skip(self))]
    pub async fn place(
        &self,
        date: NaiveDate,
        appointment_id: &str,
        technician_id: &str,
        drop: DropPosition,
    ) -> SchedulerResult<ScheduleOutcome> {
        let _lanes = self
            .locks
            .acquire(vec![(technician_id.to_string(), date)])
            .await;
        let snapshot = self.snapshot(date).await?;

        let plan = self
            .scheduler
            .place(&snapshot, appointment_id, technician_id, &drop)
            .inspect_err(|e| warn!(error = %e, "placement rejected"))?;
        let outcome = self.apply_plan(&snapshot, plan).await?;

        if let Some(created) = outcome.assignment() {
            info!(assignment_id = %created.id, "appointment placed");
            self.events
                .publish(PlannerEvent::AssignmentPlaced(created.clone()));
        }
        self.publish_warnings(&outcome);
        Ok(outcome)
    }

    /// Moves an assignment to another slot or lane of `date`.
    #[tracing::instrument(skip(self))]
    pub async fn move_assignment(
        &self,
        date: NaiveDate,
        assignment_id: &str,
        technician_id: &str,
        drop: DropPosition,
    ) -> SchedulerResult<ScheduleOutcome> {
        let (_lanes, snapshot) = self
            .lock_assignment(date, assignment_id, Some(technician_id))
            .await?;

        let plan = self
            .scheduler
            .move_assignment(&snapshot, assignment_id, technician_id, &drop)
            .inspect_err(|e| warn!(error = %e, "move rejected"))?;
        let outcome = self.apply_plan(&snapshot, plan).await?;

        if let Some(moved) = outcome.assignment() {
            info!(
                technician_id = %moved.technician_id,
                start = %moved.start_time,
                "assignment moved"
            );
            self.events
                .publish(PlannerEvent::AssignmentMoved(moved.clone()));
        }
        self.publish_warnings(&outcome);
        Ok(outcome)
    }

    /// Cancels an assignment and returns its appointment to the backlog.
    #[tracing::instrument(skip(self))]
    pub async fn postpone(
        &self,
        date: NaiveDate,
        assignment_id: &str,
    ) -> SchedulerResult<ScheduleOutcome> {
        let (_lanes, snapshot) = self.lock_assignment(date, assignment_id, None).await?;

        let plan = self
            .scheduler
            .postpone(&snapshot, assignment_id)
            .inspect_err(|e| warn!(error = %e, "postpone rejected"))?;
        let outcome = self.apply_plan(&snapshot, plan).await?;

        if let Some(cancelled) = outcome.assignment() {
            info!("assignment postponed");
            self.events.publish(PlannerEvent::AssignmentPostponed {
                assignment_id: cancelled.id.clone(),
                appointment_id: cancelled.appointment_id.clone(),
            });
        }
        Ok(outcome)
    }

    #[tracing::instrument(skip(self))]
    pub async fn advance_status(
        &self,
        date: NaiveDate,
        assignment_id: &str,
        status: AssignmentStatus,
    ) -> SchedulerResult<ScheduleOutcome> {
        let (_lanes, snapshot) = self.lock_assignment(date, assignment_id, None).await?;

        let plan = self
            .scheduler
            .advance_status(&snapshot, assignment_id, status)
            .inspect_err(|e| warn!(error = %e, "status change rejected"))?;
        let outcome = self.apply_plan(&snapshot, plan).await?;

        if let Some(updated) = outcome.assignment() {
            info!(status = ?updated.status, "assignment status changed");
            self.events.publish(PlannerEvent::AssignmentStatusChanged {
                assignment_id: updated.id.clone(),
                status: updated.status,
            });
        }
        Ok(outcome)
    }

    /// Utilization report of `date`.
    pub async fn day_report(&self, date: NaiveDate) -> SchedulerResult<DayReport> {
        let snapshot = self.snapshot(date).await?;
        Ok(self.reporter.report(&snapshot))
    }

    /// Earliest slot on a technician's lane where `aw` fits before closing.
    pub async fn next_free_slot(
        &self,
        date: NaiveDate,
        technician_id: &str,
        aw: Aw,
    ) -> SchedulerResult<Option<NaiveDateTime>> {
        let snapshot = self.snapshot(date).await?;
        if snapshot.technician(technician_id).is_none() {
            return Err(ValidationError::unknown_technician(technician_id).into());
        }
        Ok(conflict::first_free_slot(
            self.scheduler.grid(),
            date,
            aw,
            snapshot.lane_assignments(technician_id),
        ))
    }

    async fn snapshot(&self, date: NaiveDate) -> SchedulerResult<DaySnapshot> {
        fetch_day(&self.repos, date)
            .await
            .map_err(|source| SchedulerError::DataLoad { date, source })
    }

    /// Locks the lane holding `assignment_id` (plus `target` if given) and
    /// returns a snapshot read under the locks.
    async fn lock_assignment(
        &self,
        date: NaiveDate,
        assignment_id: &str,
        target: Option<&str>,
    ) -> SchedulerResult<(Vec<OwnedMutexGuard<()>>, DaySnapshot)> {
        let owner = self
            .snapshot(date)
            .await?
            .assignment(assignment_id)
            .map(|a| a.technician_id.clone())
            .ok_or_else(|| ValidationError::unknown_assignment(assignment_id))?;

        let mut keys = vec![(owner.clone(), date)];
        keys.extend(target.map(|t| (t.to_string(), date)));
        let guards = self.locks.acquire(keys).await;

        let snapshot = self.snapshot(date).await?;
        let still_owned = snapshot
            .assignment(assignment_id)
            .is_some_and(|a| a.technician_id == owner);
        if !still_owned {
            warn!(assignment_id, "assignment changed lane while waiting for lock");
            return Err(ValidationError::new(
                ValidationErrorKind::ConcurrentModification,
                format!("Assignment '{assignment_id}' was modified concurrently, reload and retry"),
            )
            .into());
        }
        Ok((guards, snapshot))
    }

    /// Applies every mutation or none of them.
    async fn apply_plan(
        &self,
        snapshot: &DaySnapshot,
        plan: MutationPlan,
    ) -> SchedulerResult<ScheduleOutcome> {
        let mut undo: Vec<Mutation> = Vec::with_capacity(plan.mutations.len());
        let mut assignments = Vec::new();

        for mutation in &plan.mutations {
            match self.write(snapshot, mutation).await {
                Ok((inverse, assignment)) => {
                    undo.push(inverse);
                    assignments.extend(assignment);
                }
                Err(err) => {
                    warn!(error = %err, applied = undo.len(), "plan failed, compensating");
                    self.compensate(undo).await;
                    return Err(err.into());
                }
            }
        }

        info!(mutations = plan.mutations.len(), "plan applied");
        Ok(ScheduleOutcome {
            assignments,
            warnings: plan.warnings,
        })
    }

    /// Performs one write and returns the mutation that undoes it.
    ///
    /// Originals are taken from the pre-write `snapshot`.
    async fn write(
        &self,
        snapshot: &DaySnapshot,
        mutation: &Mutation,
    ) -> RepositoryResult<(Mutation, Option<ScheduleAssignment>)> {
        let inverse = match mutation {
            Mutation::CreateAssignment(_) => None,
            Mutation::UpdateAssignment { id, .. } => {
                let original = snapshot
                    .assignment(id)
                    .ok_or_else(|| RepositoryError::not_found("assignment", id))?;
                Some(Mutation::UpdateAssignment {
                    id: id.clone(),
                    patch: AssignmentPatch::restore_from(original),
                })
            }
            Mutation::UpdateAppointment { id, .. } => {
                let original = snapshot
                    .appointment(id)
                    .ok_or_else(|| RepositoryError::not_found("appointment", id))?;
                Some(Mutation::UpdateAppointment {
                    id: id.clone(),
                    patch: AppointmentPatch::restore_from(original),
                })
            }
        };

        let stored = self.store(mutation).await?;
        let inverse = match (inverse, &stored) {
            (Some(inverse), _) => inverse,
            // A created assignment is undone by cancelling it.
            (None, Some(created)) => Mutation::UpdateAssignment {
                id: created.id.clone(),
                patch: AssignmentPatch::status(AssignmentStatus::Cancelled),
            },
            (None, None) => {
                return Err(RepositoryError::ConstraintViolation(
                    "created assignment was not returned by the store".into(),
                ));
            }
        };
        Ok((inverse, stored))
    }

    /// Sends one mutation to its repository.
    async fn store(&self, mutation: &Mutation) -> RepositoryResult<Option<ScheduleAssignment>> {
        match mutation {
            Mutation::CreateAssignment(new) => {
                let created = self.repos.assignments.create_assignment(new).await?;
                Ok(Some(created))
            }
            Mutation::UpdateAssignment { id, patch } => {
                let updated = self.repos.assignments.update_assignment(id, patch).await?;
                Ok(Some(updated))
            }
            Mutation::UpdateAppointment { id, patch } => {
                self.repos.appointments.update_appointment(id, patch).await?;
                Ok(None)
            }
        }
    }

    /// Writes `undo` in reverse order. Failures are logged and skipped.
    async fn compensate(&self, undo: Vec<Mutation>) {
        for mutation in undo.into_iter().rev() {
            if let Err(err) = self.store(&mutation).await {
                error!(error = %err, ?mutation, "compensation failed");
            }
        }
    }

    fn publish_warnings(&self, outcome: &ScheduleOutcome) {
        for warning in &outcome.warnings {
            self.events
                .publish(PlannerEvent::CapacityWarning(warning.clone()));
        }
    }
}
