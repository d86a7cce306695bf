//! Shared test data.

use chrono::{NaiveDate, NaiveDateTime};

use crate::models::{Appointment, Aw, DaySnapshot, ScheduleAssignment, Technician};

pub(crate) fn day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2026, 3, 2).unwrap()
}

pub(crate) fn at(hour: u32, minute: u32) -> NaiveDateTime {
    day().and_hms_opt(hour, minute, 0).unwrap()
}

pub(crate) fn assignment(
    id: &str,
    appointment_id: &str,
    technician_id: &str,
    start: (u32, u32),
    end: (u32, u32),
    aw: Aw,
) -> ScheduleAssignment {
    ScheduleAssignment::new(
        id,
        appointment_id,
        technician_id,
        at(start.0, start.1),
        at(end.0, end.1),
        aw,
    )
}

/// T1 (40 AW), T2 (48 AW); appointments X, Y (10 AW) and Z (20 AW).
pub(crate) fn sample_snapshot() -> DaySnapshot {
    DaySnapshot::new(day())
        .with_technician(Technician::new("T1", 40).with_name("Anna"))
        .with_technician(Technician::new("T2", 48).with_name("Ben"))
        .with_appointment(Appointment::new("X", 10).with_title("Oil change"))
        .with_appointment(Appointment::new("Y", 10).with_title("Tyre swap"))
        .with_appointment(Appointment::new("Z", 20).with_title("Brake service"))
}
