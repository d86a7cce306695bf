//! Technician absence model.
//!
//! An absence without an AW impact blocks the whole day; an absence with an
//! AW impact removes that amount from the day's capacity.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::Aw;

/// A technician absence on a single day.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Absence {
    pub id: String,
    pub technician_id: String,
    pub date: NaiveDate,
    pub kind: AbsenceKind,
    /// AW removed from capacity. `None` = full-day absence.
    pub aw_impact: Option<Aw>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbsenceKind {
    Vacation,
    Sick,
    Training,
    Other,
}

impl Absence {
    /// Creates a full-day absence.
    pub fn full_day(
        id: impl Into<String>,
        technician_id: impl Into<String>,
        date: NaiveDate,
        kind: AbsenceKind,
    ) -> Self {
        Self {
            id: id.into(),
            technician_id: technician_id.into(),
            date,
            kind,
            aw_impact: None,
        }
    }

    /// Creates a partial absence removing `aw_impact` from the day.
    pub fn partial(
        id: impl Into<String>,
        technician_id: impl Into<String>,
        date: NaiveDate,
        kind: AbsenceKind,
        aw_impact: Aw,
    ) -> Self {
        Self {
            aw_impact: Some(aw_impact),
            ..Self::full_day(id, technician_id, date, kind)
        }
    }

    #[inline]
    pub fn is_full_day(&self) -> bool {
        self.aw_impact.is_none()
    }

    /// Whether this absence applies to the given technician and day.
    pub fn applies_to(&self, technician_id: &str, date: NaiveDate) -> bool {
        self.technician_id == technician_id && self.date == date
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absence_kinds() {
        let date = NaiveDate::from_ymd_opt(2026, 3, 2).unwrap();
        let full = Absence::full_day("AB1", "T1", date, AbsenceKind::Vacation);
        let partial = Absence::partial("AB2", "T1", date, AbsenceKind::Training, 20);

        assert!(full.is_full_day());
        assert!(!partial.is_full_day());
        assert_eq!(partial.aw_impact, Some(20));
        assert!(full.applies_to("T1", date));
        assert!(!full.applies_to("T2", date));
        assert!(!full.applies_to("T1", date.succ_opt().unwrap()));
    }
}
