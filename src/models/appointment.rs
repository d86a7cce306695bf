//! Appointment (service job) model.
//!
//! Appointments are created and edited by the CRUD layer. The planner only
//! reads them and patches `status` / `scheduled_at` when placing or
//! postponing.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use super::Aw;

/// A service appointment waiting for (or holding) a technician slot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Appointment {
    /// Unique appointment identifier.
    pub id: String,
    /// Short description of the job.
    pub title: String,
    /// Customer reference.
    pub customer_id: String,
    /// Vehicle reference.
    pub vehicle_id: String,
    /// Estimated labor in AW.
    pub aw_estimate: Aw,
    pub priority: Priority,
    pub status: AppointmentStatus,
    /// Skills a technician should have (informational, never matched).
    pub required_skills: BTreeSet<String>,
    pub flags: BTreeSet<AppointmentFlag>,
    /// Time promised to the customer.
    pub sla_promised_at: Option<NaiveDateTime>,
    /// Start of the active assignment, if any.
    pub scheduled_at: Option<NaiveDateTime>,
    pub notes: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Priority {
    Low,
    #[default]
    Normal,
    High,
    Urgent,
}

/// Execution status of an appointment.
///
/// Only `New` and `Scheduled` are driven by the planner; the remaining
/// statuses are set by the workshop floor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentStatus {
    #[default]
    New,
    Scheduled,
    InProgress,
    Paused,
    WaitingParts,
    Done,
    Delivered,
    Cancelled,
}

/// Markers attached to an appointment.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AppointmentFlag {
    /// The vehicle is physically at the workshop.
    VehicleOnsite,
    /// Parts have been ordered and are not yet in stock.
    PartsOrdered,
    /// Domain-specific flag.
    Custom(String),
}

impl AppointmentStatus {
    /// Whether the job is finished or abandoned.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Delivered | Self::Cancelled)
    }
}

impl Appointment {
    /// Creates a new, unscheduled appointment.
    pub fn new(id: impl Into<String>, aw_estimate: Aw) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            customer_id: String::new(),
            vehicle_id: String::new(),
            aw_estimate,
            priority: Priority::Normal,
            status: AppointmentStatus::New,
            required_skills: BTreeSet::new(),
            flags: BTreeSet::new(),
            sla_promised_at: None,
            scheduled_at: None,
            notes: String::new(),
            created_at: Utc::now(),
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    /// Sets customer and vehicle references.
    pub fn with_customer(
        mut self,
        customer_id: impl Into<String>,
        vehicle_id: impl Into<String>,
    ) -> Self {
        self.customer_id = customer_id.into();
        self.vehicle_id = vehicle_id.into();
        self
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_status(mut self, status: AppointmentStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_skill(mut self, skill: impl Into<String>) -> Self {
        self.required_skills.insert(skill.into());
        self
    }

    pub fn with_flag(mut self, flag: AppointmentFlag) -> Self {
        self.flags.insert(flag);
        self
    }

    pub fn with_sla(mut self, promised_at: NaiveDateTime) -> Self {
        self.sla_promised_at = Some(promised_at);
        self
    }

    pub fn with_scheduled_at(mut self, start: NaiveDateTime) -> Self {
        self.scheduled_at = Some(start);
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn has_flag(&self, flag: &AppointmentFlag) -> bool {
        self.flags.contains(flag)
    }

    /// Whether the appointment may still be put on a lane.
    pub fn is_schedulable(&self) -> bool {
        !self.status.is_terminal()
    }
}
