//! Workshop planning domain models.
//!
//! Provides the data types the day planner reads and writes. Everything the
//! engine computes is a function of a [`DaySnapshot`] built from these types.
//!
//! # Domain Mappings
//!
//! | workshop-planner | Generic scheduling |
//! |------------------|--------------------|
//! | Appointment | Task / Job |
//! | Technician | Human resource |
//! | Absence | Blocked period |
//! | ScheduleAssignment | Assignment (resource × time) |
//! | DaySnapshot | Single-day problem instance |
//!
//! # Time Model
//! All timestamps are workshop-local `NaiveDateTime` values. Labor is measured
//! in AW (Arbeitswert), see [`crate::grid::AW_MINUTES`].

mod absence;
mod appointment;
mod assignment;
mod patch;
mod snapshot;
mod technician;

pub use absence::{Absence, AbsenceKind};
pub use appointment::{Appointment, AppointmentFlag, AppointmentStatus, Priority};
pub use assignment::{AssignmentStatus, ScheduleAssignment};
pub use patch::{AppointmentPatch, AssignmentPatch, FieldUpdate, NewAssignment};
pub use snapshot::DaySnapshot;
pub use technician::Technician;

/// Labor amount in AW units (1 AW = 6 minutes).
pub type Aw = u32;
