//! Technician model.
//!
//! Technicians are the lanes of the day view. Each has a daily labor
//! capacity in AW; absences reduce it for individual days.

use serde::{Deserialize, Serialize};

use super::Aw;

/// A workshop technician.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Technician {
    /// Unique technician identifier.
    pub id: String,
    /// Display name.
    pub name: String,
    /// Inactive technicians get no lane and cannot receive work.
    pub active: bool,
    /// Labor capacity per working day (AW).
    pub aw_capacity_per_day: Aw,
}

impl Technician {
    /// Creates an active technician with the given daily capacity.
    pub fn new(id: impl Into<String>, aw_capacity_per_day: Aw) -> Self {
        Self {
            id: id.into(),
            name: String::new(),
            active: true,
            aw_capacity_per_day,
        }
    }

    /// Sets the display name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Marks the technician inactive.
    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}
