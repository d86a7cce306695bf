//! Repository traits for planner persistence.
//!
//! Each collection the planner reads or writes has its own async trait, so
//! backends can be swapped per collection. [`InMemoryStore`] implements all
//! of them and is the development and test backend.
//!
//! Reads are scoped to one calendar date. Writes take the create/patch
//! payloads from [`crate::models`] and return the stored entity.
//!
//! # Store constraints
//!
//! The in-memory store rejects writes that would break a lane, the same way
//! a database exclusion constraint would:
//! - two non-cancelled assignments overlapping on one (technician, day)
//! - an appointment held by two non-cancelled assignments
//! - an empty or inverted interval, or one spanning two days

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::RwLock;
use uuid::Uuid;

use crate::conflict;
use crate::grid;
use crate::models::{
    Absence, Appointment, AppointmentPatch, AssignmentPatch, DaySnapshot, NewAssignment,
    ScheduleAssignment, Technician,
};

/// Result type for repository operations.
pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    #[error("{entity} '{id}' not found")]
    NotFound { entity: &'static str, id: String },

    #[error("constraint violation: {0}")]
    ConstraintViolation(String),

    #[error("store unavailable: {0}")]
    Unavailable(String),
}

impl RepositoryError {
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }
}

#[async_trait]
pub trait AppointmentRepository: Send + Sync {
    /// Appointments relevant to `date`: those scheduled on it plus the
    /// unscheduled backlog.
    async fn appointments_for_date(&self, date: NaiveDate) -> RepositoryResult<Vec<Appointment>>;

    /// Applies `patch` and returns the updated appointment.
    async fn update_appointment(
        &self,
        id: &str,
        patch: &AppointmentPatch,
    ) -> RepositoryResult<Appointment>;
}

#[async_trait]
pub trait AssignmentRepository: Send + Sync {
    /// All assignments starting on `date`, cancelled ones included.
    async fn assignments_for_date(
        &self,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<ScheduleAssignment>>;

    /// Stores a new assignment under a fresh id.
    async fn create_assignment(&self, new: &NewAssignment) -> RepositoryResult<ScheduleAssignment>;

    async fn update_assignment(
        &self,
        id: &str,
        patch: &AssignmentPatch,
    ) -> RepositoryResult<ScheduleAssignment>;
}

#[async_trait]
pub trait TechnicianRepository: Send + Sync {
    async fn active_technicians(&self) -> RepositoryResult<Vec<Technician>>;
}

#[async_trait]
pub trait AbsenceRepository: Send + Sync {
    async fn absences_for_date(&self, date: NaiveDate) -> RepositoryResult<Vec<Absence>>;
}

/// The four collaborators the planner needs, behind trait objects.
#[derive(Clone)]
pub struct Repositories {
    pub appointments: Arc<dyn AppointmentRepository>,
    pub assignments: Arc<dyn AssignmentRepository>,
    pub technicians: Arc<dyn TechnicianRepository>,
    pub absences: Arc<dyn AbsenceRepository>,
}

impl Repositories {
    /// Uses one backend for every collection.
    pub fn from_store<S>(store: Arc<S>) -> Self
    where
        S: AppointmentRepository
            + AssignmentRepository
            + TechnicianRepository
            + AbsenceRepository
            + 'static,
    {
        Self {
            appointments: store.clone(),
            assignments: store.clone(),
            technicians: store.clone(),
            absences: store,
        }
    }
}

/// In-memory backend.
///
/// Cloning shares the underlying data.
#[derive(Debug, Clone, Default)]
pub struct InMemoryStore {
    data: Arc<RwLock<StoreData>>,
}

#[derive(Debug)]
struct StoreData {
    technicians: Vec<Technician>,
    appointments: HashMap<String, Appointment>,
    assignments: Vec<ScheduleAssignment>,
    absences: Vec<Absence>,
    available: bool,
}

impl Default for StoreData {
    fn default() -> Self {
        Self {
            technicians: Vec::new(),
            appointments: HashMap::new(),
            assignments: Vec::new(),
            absences: Vec::new(),
            available: true,
        }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a store with every entity of `snapshot`.
    pub fn from_snapshot(snapshot: &DaySnapshot) -> Self {
        let store = Self::new();
        {
            let mut data = store.data.write();
            data.technicians = snapshot.technicians.clone();
            data.appointments = snapshot
                .appointments
                .iter()
                .map(|a| (a.id.clone(), a.clone()))
                .collect();
            data.assignments = snapshot.assignments.clone();
            data.absences = snapshot.absences.clone();
        }
        store
    }

    pub fn with_technician(self, technician: Technician) -> Self {
        self.data.write().technicians.push(technician);
        self
    }

    pub fn with_appointment(self, appointment: Appointment) -> Self {
        self.data
            .write()
            .appointments
            .insert(appointment.id.clone(), appointment);
        self
    }

    /// Adds an assignment as is, without constraint checks.
    pub fn with_assignment(self, assignment: ScheduleAssignment) -> Self {
        self.data.write().assignments.push(assignment);
        self
    }

    pub fn with_absence(self, absence: Absence) -> Self {
        self.data.write().absences.push(absence);
        self
    }

    /// Simulates an outage: every call fails with `Unavailable` while unset.
    pub fn set_available(&self, available: bool) {
        self.data.write().available = available;
    }

    pub fn appointment(&self, id: &str) -> Option<Appointment> {
        self.data.read().appointments.get(id).cloned()
    }

    pub fn assignment(&self, id: &str) -> Option<ScheduleAssignment> {
        self.data.read().assignments.iter().find(|a| a.id == id).cloned()
    }

    /// Every stored assignment, in insertion order.
    pub fn assignments(&self) -> Vec<ScheduleAssignment> {
        self.data.read().assignments.clone()
    }
}

impl StoreData {
    fn ensure_available(&self) -> RepositoryResult<()> {
        if self.available {
            Ok(())
        } else {
            Err(RepositoryError::Unavailable("in-memory store is offline".into()))
        }
    }

    /// Checks `candidate` against every other stored assignment.
    fn check_constraints(&self, candidate: &ScheduleAssignment) -> RepositoryResult<()> {
        if candidate.start_time >= candidate.end_time
            || !grid::within_day(candidate.start_time, candidate.end_time)
        {
            return Err(RepositoryError::ConstraintViolation(format!(
                "assignment interval {} - {} is empty or spans two days",
                candidate.start_time, candidate.end_time
            )));
        }
        if !candidate.is_active() {
            return Ok(());
        }

        let others = self
            .assignments
            .iter()
            .filter(|a| a.id != candidate.id && a.is_active());
        for other in others {
            if other.appointment_id == candidate.appointment_id {
                return Err(RepositoryError::ConstraintViolation(format!(
                    "appointment '{}' already held by assignment '{}'",
                    candidate.appointment_id, other.id
                )));
            }
            if other.is_on(&candidate.technician_id, candidate.date())
                && conflict::overlaps(
                    candidate.start_time,
                    candidate.end_time,
                    other.start_time,
                    other.end_time,
                )
            {
                return Err(RepositoryError::ConstraintViolation(format!(
                    "assignment overlaps '{}' on technician '{}'",
                    other.id, other.technician_id
                )));
            }
        }
        Ok(())
    }
}

#[async_trait]
impl AppointmentRepository for InMemoryStore {
    async fn appointments_for_date(&self, date: NaiveDate) -> RepositoryResult<Vec<Appointment>> {
        let data = self.data.read();
        data.ensure_available()?;
        let mut appointments: Vec<Appointment> = data
            .appointments
            .values()
            .filter(|a| match a.scheduled_at {
                Some(start) => start.date() == date,
                None => !a.status.is_terminal(),
            })
            .cloned()
            .collect();
        appointments.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(appointments)
    }

    async fn update_appointment(
        &self,
        id: &str,
        patch: &AppointmentPatch,
    ) -> RepositoryResult<Appointment> {
        let mut data = self.data.write();
        data.ensure_available()?;
        let appointment = data
            .appointments
            .get_mut(id)
            .ok_or_else(|| RepositoryError::not_found("appointment", id))?;
        patch.apply_to(appointment);
        Ok(appointment.clone())
    }
}

#[async_trait]
impl AssignmentRepository for InMemoryStore {
    async fn assignments_for_date(
        &self,
        date: NaiveDate,
    ) -> RepositoryResult<Vec<ScheduleAssignment>> {
        let data = self.data.read();
        data.ensure_available()?;
        Ok(data
            .assignments
            .iter()
            .filter(|a| a.date() == date)
            .cloned()
            .collect())
    }

    async fn create_assignment(
        &self,
        new: &NewAssignment,
    ) -> RepositoryResult<ScheduleAssignment> {
        let mut data = self.data.write();
        data.ensure_available()?;
        if !data.appointments.contains_key(&new.appointment_id) {
            return Err(RepositoryError::not_found("appointment", &new.appointment_id));
        }
        if !data.technicians.iter().any(|t| t.id == new.technician_id) {
            return Err(RepositoryError::not_found("technician", &new.technician_id));
        }

        let assignment = new.clone().into_assignment(Uuid::new_v4().to_string());
        data.check_constraints(&assignment)?;
        data.assignments.push(assignment.clone());
        Ok(assignment)
    }

    async fn update_assignment(
        &self,
        id: &str,
        patch: &AssignmentPatch,
    ) -> RepositoryResult<ScheduleAssignment> {
        let mut data = self.data.write();
        data.ensure_available()?;
        let index = data
            .assignments
            .iter()
            .position(|a| a.id == id)
            .ok_or_else(|| RepositoryError::not_found("assignment", id))?;

        let mut updated = data.assignments[index].clone();
        patch.apply_to(&mut updated);
        data.check_constraints(&updated)?;
        data.assignments[index] = updated.clone();
        Ok(updated)
    }
}

#[async_trait]
impl TechnicianRepository for InMemoryStore {
    async fn active_technicians(&self) -> RepositoryResult<Vec<Technician>> {
        let data = self.data.read();
        data.ensure_available()?;
        Ok(data.technicians.iter().filter(|t| t.active).cloned().collect())
    }
}

#[async_trait]
impl AbsenceRepository for InMemoryStore {
    async fn absences_for_date(&self, date: NaiveDate) -> RepositoryResult<Vec<Absence>> {
        let data = self.data.read();
        data.ensure_available()?;
        Ok(data
            .absences
            .iter()
            .filter(|a| a.date == date)
            .cloned()
            .collect())
    }
}
