//! Flat wall-clock representation used by the next-fire computation.
//!
//! The scheduling algorithm manipulates plain integer calendar fields and
//! only converts back to a real timestamp at the very end. Out-of-range
//! fields roll over the way dynamic-language date objects do (day 31 in
//! February lands in early March); this is deliberate and pinned by tests.
//! Month lengths and DST transitions are NOT modeled in the field math —
//! known edge case, kept as documented behavior.

use super::expr::ShiftUnit;
use chrono::{Datelike, Duration, Local, NaiveDate, NaiveDateTime, Offset, Timelike};

/// A local wall-clock moment as independent integer fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WallClock {
    /// Calendar year.
    pub year: i64,
    /// Month, 1-12 (values outside roll over on conversion).
    pub month: i64,
    /// Day of month, 1-31 (values outside roll over on conversion).
    pub day: i64,
    /// Hour, 0-23.
    pub hour: i64,
    /// Minute, 0-59.
    pub minute: i64,
    /// Second, 0-59.
    pub second: i64,
    /// Millisecond, 0-999.
    pub milli: i64,
}

impl WallClock {
    /// The current moment in the process's local timezone.
    #[must_use]
    pub fn now_local() -> Self {
        Self::from_naive(Local::now().naive_local())
    }

    /// The process's UTC offset in minutes east of UTC.
    #[must_use]
    pub fn local_offset_minutes() -> i64 {
        i64::from(Local::now().offset().fix().local_minus_utc()) / 60
    }

    /// Decompose a chrono naive datetime.
    #[must_use]
    pub fn from_naive(dt: NaiveDateTime) -> Self {
        Self {
            year: i64::from(dt.year()),
            month: i64::from(dt.month()),
            day: i64::from(dt.day()),
            hour: i64::from(dt.hour()),
            minute: i64::from(dt.minute()),
            second: i64::from(dt.second()),
            milli: i64::from(dt.and_utc().timestamp_subsec_millis()),
        }
    }

    /// Convert back to a timestamp, rolling out-of-range fields over into
    /// their neighbors. `None` when the year leaves chrono's range.
    #[must_use]
    pub fn to_naive(&self) -> Option<NaiveDateTime> {
        // Normalize the month into the year first, then let day and
        // time-of-day overflow through day arithmetic.
        let year = self.year + (self.month - 1).div_euclid(12);
        let month = (self.month - 1).rem_euclid(12) + 1;

        let year = i32::try_from(year).ok()?;
        let month = u32::try_from(month).ok()?;
        let base = NaiveDate::from_ymd_opt(year, month, 1)?.and_hms_opt(0, 0, 0)?;

        let offset = Duration::days(self.day - 1)
            + Duration::hours(self.hour)
            + Duration::minutes(self.minute)
            + Duration::seconds(self.second)
            + Duration::milliseconds(self.milli);
        base.checked_add_signed(offset)
    }

    /// Millisecond difference `self - other`, after rollover conversion.
    /// Saturates to `i64::MIN` when either side is unrepresentable, which
    /// callers treat as "due now".
    #[must_use]
    pub fn diff_ms(&self, other: &Self) -> i64 {
        match (self.to_naive(), other.to_naive()) {
            (Some(a), Some(b)) => (a - b).num_milliseconds(),
            _ => i64::MIN,
        }
    }

    /// Shift by whole minutes (used for timezone remapping).
    #[must_use]
    pub fn shifted_minutes(&self, minutes: i64) -> Self {
        self.to_naive()
            .and_then(|dt| dt.checked_add_signed(Duration::minutes(minutes)))
            .map_or(*self, Self::from_naive)
    }

    /// ISO weekday of this moment, 1 = Monday .. 7 = Sunday.
    #[must_use]
    pub fn weekday_iso(&self) -> i64 {
        self.to_naive()
            .map_or(1, |dt| i64::from(dt.weekday().number_from_monday()))
    }

    /// Read the field for a calendar unit. Panics in debug builds for
    /// units that are not calendar fields (weeks, weekday, timezone).
    #[must_use]
    pub fn get(&self, unit: ShiftUnit) -> i64 {
        match unit {
            ShiftUnit::Milliseconds => self.milli,
            ShiftUnit::Seconds => self.second,
            ShiftUnit::Minutes => self.minute,
            ShiftUnit::Hours => self.hour,
            ShiftUnit::Days => self.day,
            ShiftUnit::Months => self.month,
            ShiftUnit::Years => self.year,
            _ => {
                debug_assert!(false, "not a calendar field: {unit:?}");
                0
            }
        }
    }

    /// Write the field for a calendar unit.
    pub fn set(&mut self, unit: ShiftUnit, value: i64) {
        match unit {
            ShiftUnit::Milliseconds => self.milli = value,
            ShiftUnit::Seconds => self.second = value,
            ShiftUnit::Minutes => self.minute = value,
            ShiftUnit::Hours => self.hour = value,
            ShiftUnit::Days => self.day = value,
            ShiftUnit::Months => self.month = value,
            ShiftUnit::Years => self.year = value,
            _ => debug_assert!(false, "not a calendar field: {unit:?}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clock(y: i64, mo: i64, d: i64, h: i64, mi: i64) -> WallClock {
        WallClock {
            year: y,
            month: mo,
            day: d,
            hour: h,
            minute: mi,
            second: 0,
            milli: 0,
        }
    }

    #[test]
    fn test_roundtrip() {
        let c = clock(2026, 8, 6, 14, 30);
        let dt = c.to_naive().unwrap();
        assert_eq!(WallClock::from_naive(dt), c);
    }

    #[test]
    fn test_day_rollover_across_february() {
        // Day 31 in February rolls into March, dynamic-date style.
        let c = clock(2026, 2, 31, 0, 0);
        let dt = c.to_naive().unwrap();
        assert_eq!(dt.month(), 3);
        assert_eq!(dt.day(), 3); // 2026 is not a leap year: 28 + 3
    }

    #[test]
    fn test_month_rollover() {
        let c = clock(2026, 13, 1, 0, 0);
        let dt = c.to_naive().unwrap();
        assert_eq!(dt.year(), 2027);
        assert_eq!(dt.month(), 1);
    }

    #[test]
    fn test_diff_ms() {
        let a = clock(2026, 8, 6, 4, 0);
        let b = clock(2026, 8, 7, 3, 0);
        assert_eq!(b.diff_ms(&a), 23 * 3_600_000);
    }

    #[test]
    fn test_weekday() {
        // 2026-08-06 is a Thursday.
        assert_eq!(clock(2026, 8, 6, 0, 0).weekday_iso(), 4);
    }

    #[test]
    fn test_shifted_minutes() {
        let c = clock(2026, 8, 6, 0, 30).shifted_minutes(-60);
        assert_eq!(c.day, 5);
        assert_eq!(c.hour, 23);
        assert_eq!(c.minute, 30);
    }
}
