//! Inclusive calendar-day ranges.

use std::fmt;

use chrono::{DateTime, Days, NaiveDate, NaiveTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::RangeError;

/// An inclusive range of calendar days, `start..=end`.
///
/// Construction is the only place a malformed range can appear, so every
/// engine call receives a range that is already known to be valid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    /// Build a range, failing fast when `end` precedes `start`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, RangeError> {
        if end < start {
            return Err(RangeError::EndBeforeStart { start, end });
        }
        Ok(Self { start, end })
    }

    /// A one-day range.
    pub fn single(day: NaiveDate) -> Self {
        Self {
            start: day,
            end: day,
        }
    }

    /// The `days`-long window ending on (and including) `end`.
    pub fn last_days(end: NaiveDate, days: u32) -> Result<Self, RangeError> {
        if days == 0 {
            return Err(RangeError::EmptyWindow);
        }
        let start = end
            .checked_sub_days(Days::new(u64::from(days) - 1))
            .unwrap_or(NaiveDate::MIN);
        Self::new(start, end)
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// Number of days covered, always at least 1.
    pub fn days(&self) -> u32 {
        let span = (self.end - self.start).num_days() + 1;
        u32::try_from(span).unwrap_or(u32::MAX)
    }

    /// The equal-length window immediately before this one.
    pub fn preceding(&self) -> Self {
        let len = u64::from(self.days());
        let end = self
            .start
            .checked_sub_days(Days::new(1))
            .unwrap_or(NaiveDate::MIN);
        let start = self
            .start
            .checked_sub_days(Days::new(len))
            .unwrap_or(NaiveDate::MIN);
        Self { start, end }
    }

    pub fn contains_day(&self, day: NaiveDate) -> bool {
        self.start <= day && day <= self.end
    }

    /// Whether a UTC timestamp falls on one of the covered days.
    pub fn contains(&self, ts: &DateTime<Utc>) -> bool {
        self.contains_day(ts.date_naive())
    }

    /// Midnight UTC at the start of the range.
    pub fn start_instant(&self) -> DateTime<Utc> {
        self.start.and_time(NaiveTime::MIN).and_utc()
    }

    /// Iterate over every covered day in order.
    pub fn iter_days(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.start.iter_days().take_while(move |d| *d <= self.end)
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}..={}", self.start, self.end)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_new_rejects_reversed_range() {
        let err = DateRange::new(day(2024, 5, 10), day(2024, 5, 9)).unwrap_err();
        assert_eq!(
            err,
            RangeError::EndBeforeStart {
                start: day(2024, 5, 10),
                end: day(2024, 5, 9)
            }
        );
    }

    #[test]
    fn test_single_day_has_length_one() {
        let r = DateRange::single(day(2024, 5, 10));
        assert_eq!(r.days(), 1);
        assert_eq!(r.start(), r.end());
    }

    #[test]
    fn test_last_days_is_inclusive() {
        let r = DateRange::last_days(day(2024, 5, 10), 7).unwrap();
        assert_eq!(r.start(), day(2024, 5, 4));
        assert_eq!(r.end(), day(2024, 5, 10));
        assert_eq!(r.days(), 7);
        assert_eq!(r.iter_days().count(), 7);
    }

    #[test]
    fn test_last_days_zero_is_error() {
        assert_eq!(
            DateRange::last_days(day(2024, 5, 10), 0),
            Err(RangeError::EmptyWindow)
        );
    }

    #[test]
    fn test_preceding_window_is_adjacent_and_equal_length() {
        let r = DateRange::last_days(day(2024, 3, 2), 7).unwrap();
        let prev = r.preceding();
        assert_eq!(prev.days(), 7);
        assert_eq!(prev.end(), day(2024, 2, 24));
        assert_eq!(prev.start(), day(2024, 2, 18));
    }

    #[test]
    fn test_contains_timestamp() {
        let r = DateRange::last_days(day(2024, 5, 10), 2).unwrap();
        let inside = day(2024, 5, 9).and_hms_opt(23, 59, 0).unwrap().and_utc();
        let outside = day(2024, 5, 11).and_hms_opt(0, 0, 0).unwrap().and_utc();
        assert!(r.contains(&inside));
        assert!(!r.contains(&outside));
    }
}
