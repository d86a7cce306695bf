//! Working-hours grid and AW time arithmetic.
//!
//! Converts between clock time, lane positions and AW durations for a
//! single workshop day.
//!
//! # Time Model
//! All times are workshop-local. A day's lane spans
//! `[start_hour:00, end_hour:00)`; placements snap to `slot_minutes`
//! boundaries measured from the opening time.
//!
//! # AW
//! One AW (Arbeitswert) is [`AW_MINUTES`] minutes of technician work. The
//! value is a trade convention and not configurable.

use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};

use crate::models::Aw;

/// Minutes of work per AW.
pub const AW_MINUTES: i64 = 6;

/// Default placement granularity.
pub const DEFAULT_SLOT_MINUTES: u32 = 15;

/// A time interval [start, end).
///
/// Half-open interval: includes start, excludes end.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeWindow {
    /// Interval start (inclusive).
    pub start: NaiveDateTime,
    /// Interval end (exclusive).
    pub end: NaiveDateTime,
}

impl TimeWindow {
    /// Creates a new time window.
    pub fn new(start: NaiveDateTime, end: NaiveDateTime) -> Self {
        Self { start, end }
    }

    /// Duration of this window in minutes.
    #[inline]
    pub fn duration_minutes(&self) -> i64 {
        (self.end - self.start).num_minutes()
    }

    /// Whether a timestamp falls within this window.
    #[inline]
    pub fn contains(&self, time: NaiveDateTime) -> bool {
        time >= self.start && time < self.end
    }

    /// Whether two windows overlap. Touching windows do not.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.start < other.end && other.start < self.end
    }
}

/// Daily opening hours, e.g. 8–18.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkingHours {
    /// Opening hour (0-23).
    pub start_hour: u32,
    /// Closing hour (1-24), exclusive.
    pub end_hour: u32,
}

impl WorkingHours {
    pub fn new(start_hour: u32, end_hour: u32) -> Self {
        Self {
            start_hour,
            end_hour,
        }
    }

    /// Length of the working day in minutes.
    pub fn minutes(&self) -> i64 {
        (i64::from(self.end_hour) - i64::from(self.start_hour)) * 60
    }
}

impl Default for WorkingHours {
    fn default() -> Self {
        Self::new(8, 18)
    }
}

/// Where an appointment was dropped on a lane.
///
/// Produced by the UI adapter; the engine only sees the resulting time.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub enum DropPosition {
    /// Horizontal offset inside a lane that spans the working window.
    Offset {
        /// Offset from the lane's left edge (px).
        x: f64,
        /// Rendered lane width (px).
        lane_width: f64,
    },
    /// Explicit clock time (keyboard entry, API callers).
    Clock(NaiveTime),
}

impl DropPosition {
    /// Drop at an explicit clock time.
    pub fn at(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self::Clock)
    }
}

/// Working-hours window plus slot granularity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct TimeGrid {
    hours: WorkingHours,
    slot_minutes: u32,
}

impl TimeGrid {
    /// Creates a grid. A zero slot size falls back to the default.
    pub fn new(hours: WorkingHours, slot_minutes: u32) -> Self {
        let slot_minutes = if slot_minutes == 0 {
            DEFAULT_SLOT_MINUTES
        } else {
            slot_minutes
        };
        Self {
            hours,
            slot_minutes,
        }
    }

    #[inline]
    pub fn working_hours(&self) -> WorkingHours {
        self.hours
    }

    #[inline]
    pub fn slot_minutes(&self) -> u32 {
        self.slot_minutes
    }

    /// Opening time on `date`.
    pub fn opening(&self, date: NaiveDate) -> NaiveDateTime {
        midnight(date) + Duration::hours(i64::from(self.hours.start_hour))
    }

    /// Closing time on `date`.
    pub fn closing(&self, date: NaiveDate) -> NaiveDateTime {
        midnight(date) + Duration::hours(i64::from(self.hours.end_hour))
    }

    /// The working window of `date`.
    pub fn window(&self, date: NaiveDate) -> TimeWindow {
        TimeWindow::new(self.opening(date), self.closing(date))
    }

    /// Rounds down to the nearest slot boundary within the working window.
    ///
    /// Times before opening snap to opening; times at or after the last slot
    /// snap to the last slot.
    pub fn snap_to_grid(&self, time: NaiveDateTime) -> NaiveDateTime {
        let date = time.date();
        let opening = self.opening(date);
        if time <= opening {
            return opening;
        }
        let slot = i64::from(self.slot_minutes);
        let last_slot = (self.closing(date) - Duration::minutes(slot)).max(opening);

        let offset = (time - opening).num_minutes();
        let snapped = opening + Duration::minutes(offset - offset % slot);
        snapped.min(last_slot)
    }

    /// `start + aw × AW_MINUTES`. Results past closing are not clamped.
    pub fn calculate_end_time(&self, start: NaiveDateTime, aw: Aw) -> NaiveDateTime {
        start + Duration::minutes(aw_to_minutes(aw))
    }

    /// Translates a drop position on `date` into a (not yet snapped) time.
    pub fn position_to_time(&self, date: NaiveDate, drop: &DropPosition) -> NaiveDateTime {
        match *drop {
            DropPosition::Clock(time) => date.and_time(time),
            DropPosition::Offset { x, lane_width } => {
                let fraction = if lane_width > 0.0 && x.is_finite() {
                    (x / lane_width).clamp(0.0, 1.0)
                } else {
                    0.0
                };
                let minutes = (fraction * self.hours.minutes() as f64).floor() as i64;
                self.opening(date) + Duration::minutes(minutes)
            }
        }
    }

    /// Whether `end` lies past the closing time of `date`.
    pub fn runs_past_closing(&self, date: NaiveDate, end: NaiveDateTime) -> bool {
        end > self.closing(date)
    }

    /// Slot start times of `date`, in order.
    pub fn slots(&self, date: NaiveDate) -> impl Iterator<Item = NaiveDateTime> {
        let opening = self.opening(date);
        let slot = i64::from(self.slot_minutes);
        let count = self.hours.minutes().max(0) / slot;
        (0..count).map(move |i| opening + Duration::minutes(i * slot))
    }
}

impl Default for TimeGrid {
    fn default() -> Self {
        Self::new(WorkingHours::default(), DEFAULT_SLOT_MINUTES)
    }
}

/// Minutes of work represented by `aw`.
#[inline]
pub fn aw_to_minutes(aw: Aw) -> i64 {
    i64::from(aw) * AW_MINUTES
}

/// AW needed to cover `minutes`, rounded up.
pub fn minutes_to_aw(minutes: i64) -> Aw {
    if minutes <= 0 {
        return 0;
    }
    let aw = (minutes + AW_MINUTES - 1) / AW_MINUTES;
    Aw::try_from(aw).unwrap_or(Aw::MAX)
}

/// Whether `[start, end)` stays on the calendar day of `start`. An end at
/// exactly 00:00 of the next day still counts.
pub fn within_day(start: NaiveDateTime, end: NaiveDateTime) -> bool {
    end.date() == start.date() || end == midnight(start.date()) + Duration::days(1)
}

fn midnight(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::default())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixtures::{at, day};

    #[test]
    fn test_time_window() {
        let w = TimeWindow::new(at(9, 0), at(10, 0));
        assert_eq!(w.duration_minutes(), 60);
        assert!(w.contains(at(9, 0)));
        assert!(w.contains(at(9, 59)));
        assert!(!w.contains(at(10, 0))); // exclusive end
        assert!(!w.contains(at(8, 30)));
    }

    #[test]
    fn test_time_window_overlap() {
        let a = TimeWindow::new(at(9, 0), at(10, 0));
        let b = TimeWindow::new(at(9, 30), at(10, 30));
        assert!(a.overlaps(&b));
        assert!(b.overlaps(&a));

        let c = TimeWindow::new(at(10, 0), at(11, 0)); // touching
        assert!(!a.overlaps(&c));
    }

    #[test]
    fn test_snap_rounds_down() {
        let grid = TimeGrid::default();
        assert_eq!(grid.snap_to_grid(at(9, 0)), at(9, 0));
        assert_eq!(grid.snap_to_grid(at(9, 14)), at(9, 0));
        assert_eq!(grid.snap_to_grid(at(9, 15)), at(9, 15));
        assert_eq!(grid.snap_to_grid(at(9, 44)), at(9, 30));
        let with_seconds = day().and_hms_opt(9, 29, 59).unwrap();
        assert_eq!(grid.snap_to_grid(with_seconds), at(9, 15));
    }

    #[test]
    fn test_snap_stays_in_window() {
        let grid = TimeGrid::default();
        assert_eq!(grid.snap_to_grid(at(6, 40)), at(8, 0));
        assert_eq!(grid.snap_to_grid(at(17, 50)), at(17, 45));
        assert_eq!(grid.snap_to_grid(at(19, 0)), at(17, 45));
    }

    #[test]
    fn test_snap_relative_to_opening() {
        // 30-minute slots aligned to opening, not to the clock hour
        let grid = TimeGrid::new(WorkingHours::new(7, 16), 30);
        assert_eq!(grid.snap_to_grid(at(7, 29)), at(7, 0));
        assert_eq!(grid.snap_to_grid(at(10, 45)), at(10, 30));
    }

    #[test]
    fn test_calculate_end_time() {
        let grid = TimeGrid::default();
        assert_eq!(grid.calculate_end_time(at(9, 0), 10), at(10, 0));
        assert_eq!(grid.calculate_end_time(at(9, 0), 1), at(9, 6));
        assert_eq!(grid.calculate_end_time(at(9, 0), 0), at(9, 0));
        // past closing passes through
        assert_eq!(grid.calculate_end_time(at(17, 0), 20), at(19, 0));
        assert!(grid.runs_past_closing(day(), at(19, 0)));
        assert!(!grid.runs_past_closing(day(), at(18, 0)));
    }

    #[test]
    fn test_position_to_time() {
        let grid = TimeGrid::default(); // 600 minutes
        let drop = DropPosition::Offset {
            x: 60.0,
            lane_width: 600.0,
        };
        assert_eq!(grid.position_to_time(day(), &drop), at(9, 0));

        let halfway = DropPosition::Offset {
            x: 500.0,
            lane_width: 1000.0,
        };
        assert_eq!(grid.position_to_time(day(), &halfway), at(13, 0));

        let left_of_lane = DropPosition::Offset {
            x: -40.0,
            lane_width: 600.0,
        };
        assert_eq!(grid.position_to_time(day(), &left_of_lane), at(8, 0));

        let degenerate = DropPosition::Offset {
            x: 10.0,
            lane_width: 0.0,
        };
        assert_eq!(grid.position_to_time(day(), &degenerate), at(8, 0));

        let clock = DropPosition::at(14, 20).unwrap();
        assert_eq!(grid.position_to_time(day(), &clock), at(14, 20));
    }

    #[test]
    fn test_slots() {
        let grid = TimeGrid::default();
        let slots: Vec<_> = grid.slots(day()).collect();
        assert_eq!(slots.len(), 40);
        assert_eq!(slots[0], at(8, 0));
        assert_eq!(slots[1], at(8, 15));
        assert_eq!(*slots.last().unwrap(), at(17, 45));
    }

    #[test]
    fn test_aw_conversions() {
        assert_eq!(aw_to_minutes(10), 60);
        assert_eq!(minutes_to_aw(60), 10);
        assert_eq!(minutes_to_aw(61), 11);
        assert_eq!(minutes_to_aw(0), 0);
        assert_eq!(minutes_to_aw(-5), 0);
    }

    #[test]
    fn test_within_day() {
        let next_midnight = at(0, 0) + Duration::days(1);
        assert!(within_day(at(9, 0), at(18, 0)));
        assert!(within_day(at(17, 0), next_midnight));
        assert!(!within_day(at(17, 45), next_midnight + Duration::minutes(45)));
    }

    #[test]
    fn test_zero_slot_falls_back() {
        let grid = TimeGrid::new(WorkingHours::default(), 0);
        assert_eq!(grid.slot_minutes(), DEFAULT_SLOT_MINUTES);
    }
}
