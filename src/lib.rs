//! Day-level capacity planner for workshop technicians.
//!
//! Places service appointments on per-technician day lanes, measured in AW
//! (Arbeitswert, 1 AW = 6 minutes), detects double bookings, tracks lane
//! capacity against absences, and reports utilization.
//!
//! # Modules
//!
//! - **`models`**: Domain types: `Appointment`, `Technician`, `Absence`,
//!   `ScheduleAssignment`, `DaySnapshot`, create/patch payloads
//! - **`grid`**: Working hours, 15-minute slots, AW ↔ time conversion
//! - **`capacity`**: Available AW, utilization, per-technician lanes
//! - **`conflict`**: Half-open interval overlap detection
//! - **`scheduler`**: Place / move / postpone / status decisions as mutation
//!   plans, plus the day utilization report
//! - **`validation`**: Snapshot integrity checks and rejection errors
//! - **`repository`**: Async persistence traits and an in-memory store
//! - **`loader`**: Concurrent day fetch with stale-response discarding
//! - **`service`**: Lane-locked, all-or-nothing application of plans
//! - **`events`**: Change notifications for views
//! - **`config`**: TOML-loadable planner settings
//!
//! # Architecture
//!
//! Everything below `service` is synchronous and side-effect free: the
//! engine reads a [`models::DaySnapshot`] and returns a
//! [`scheduler::MutationPlan`] or a rejection. `service` is the only layer
//! that writes.
//!
//! ```
//! use chrono::NaiveDate;
//! use workshop_planner::capacity::TechnicianLane;
//! use workshop_planner::models::{Absence, AbsenceKind, DaySnapshot, Technician};
//!
//! let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
//! let snapshot = DaySnapshot::new(date)
//!     .with_technician(Technician::new("T1", 40))
//!     .with_absence(Absence::partial("AB1", "T1", date, AbsenceKind::Training, 10));
//!
//! let lane = TechnicianLane::build(&snapshot.technicians[0], &snapshot);
//! assert_eq!(lane.available_aw, 30);
//! ```

pub mod capacity;
pub mod config;
pub mod conflict;
pub mod error;
pub mod events;
pub mod grid;
pub mod loader;
pub mod models;
pub mod repository;
pub mod scheduler;
pub mod service;
pub mod validation;

#[cfg(test)]
mod fixtures;

pub use config::PlannerConfig;
pub use error::{SchedulerError, SchedulerResult};
pub use service::PlannerService;
