//! Day-level utilization report.
//!
//! # Metrics
//!
//! | Metric | Definition |
//! |--------|-----------|
//! | Lane utilization | planned AW / `aw_capacity_per_day` × 100 |
//! | Total planned | Σ planned AW over active lanes |
//! | Total available | Σ available AW over active lanes |
//! | Total capacity | Σ `aw_capacity_per_day` over active technicians |
//! | Overall utilization | total planned / total capacity × 100 (0 if no capacity) |
//! | Waiting customers | appointments with status `new` |
//! | Vehicles on site | appointments flagged `vehicle_onsite` |
//! | Pending parts | appointments flagged `parts_ordered` |
//!
//! Reports are recomputed from the snapshot on every call.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::capacity::{self, CapacityWarning, TechnicianLane};
use crate::models::{AppointmentFlag, AppointmentStatus, Aw, DaySnapshot};

/// Coloring hint for a lane.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadLevel {
    Normal,
    /// Utilization at or above the high-load threshold.
    High,
    /// Planned AW exceeds capacity after absences.
    Overbooked,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LaneReport {
    pub lane: TechnicianLane,
    pub load: LoadLevel,
}

/// Aggregated figures for one day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DayReport {
    pub date: NaiveDate,
    pub lanes: Vec<LaneReport>,
    pub total_planned_aw: Aw,
    pub total_available_aw: Aw,
    pub total_capacity_aw: Aw,
    /// Percent.
    pub overall_utilization: f64,
    pub waiting_customers: usize,
    pub vehicles_onsite: usize,
    pub pending_parts: usize,
    /// One entry per overbooked lane.
    pub warnings: Vec<CapacityWarning>,
}

impl DayReport {
    pub fn lane(&self, technician_id: &str) -> Option<&LaneReport> {
        self.lanes
            .iter()
            .find(|l| l.lane.technician_id == technician_id)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct UtilizationReporter {
    high_load_threshold: f64,
}

impl Default for UtilizationReporter {
    fn default() -> Self {
        Self::new(85.0)
    }
}

impl UtilizationReporter {
    pub fn new(high_load_threshold: f64) -> Self {
        Self {
            high_load_threshold,
        }
    }

    /// Classifies a lane.
    pub fn load_level(&self, lane: &TechnicianLane) -> LoadLevel {
        if lane.is_overbooked() {
            LoadLevel::Overbooked
        } else if lane.utilization >= self.high_load_threshold {
            LoadLevel::High
        } else {
            LoadLevel::Normal
        }
    }

    /// Computes the report for `snapshot`.
    pub fn report(&self, snapshot: &DaySnapshot) -> DayReport {
        let lanes = capacity::lanes(snapshot);

        let mut total_planned: Aw = 0;
        let mut total_available: Aw = 0;
        let mut total_capacity: Aw = 0;
        let mut warnings = Vec::new();
        for lane in &lanes {
            total_planned = total_planned.saturating_add(lane.planned_aw);
            total_available = total_available.saturating_add(lane.available_aw);
            total_capacity = total_capacity.saturating_add(lane.capacity_aw);
            warnings.extend(lane.capacity_warning());
        }

        let count_flag = |flag: &AppointmentFlag| {
            snapshot
                .appointments
                .iter()
                .filter(|a| a.has_flag(flag))
                .count()
        };

        DayReport {
            date: snapshot.date,
            total_planned_aw: total_planned,
            total_available_aw: total_available,
            total_capacity_aw: total_capacity,
            overall_utilization: capacity::utilization(total_planned, total_capacity),
            waiting_customers: snapshot
                .appointments
                .iter()
                .filter(|a| a.status == AppointmentStatus::New)
                .count(),
            vehicles_onsite: count_flag(&AppointmentFlag::VehicleOnsite),
            pending_parts: count_flag(&AppointmentFlag::PartsOrdered),
            warnings,
            lanes: lanes
                .into_iter()
                .map(|lane| LaneReport {
                    load: self.load_level(&lane),
                    lane,
                })
                .collect(),
        }
    }
}
