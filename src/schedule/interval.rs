//! Wall-clock aligned fixed interval.

use std::time::Duration;

use chrono::{DateTime, TimeDelta};
use chrono_tz::Tz;

use crate::clock::delta;
use crate::error::ScheduleError;
use crate::schedule::Schedule;

/// Seconds between 0001-01-01T00:00:00Z and the Unix epoch.
const ZERO_TO_UNIX_SECS: i128 = 62_135_596_800;

/// Fires every `period`, aligned to multiples of `period` counted from
/// 0001-01-01T00:00:00Z, shifted by `offset`.
///
/// `Interval::new(1h).with_offset(5m)` fires at 12:05, 13:05, 14:05, ...
/// A 7-day period aligns to Mondays.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Interval {
    period: Duration,
    offset: Duration,
    description: Option<String>,
}

impl Interval {
    /// Creates an interval; `period` must be a positive whole number of seconds.
    ///
    /// Scheduler cursors store due instants in Unix seconds, so finer periods
    /// could never be matched against the last completed run.
    pub fn new(period: Duration) -> Result<Self, ScheduleError> {
        if period.is_zero() || period.subsec_nanos() != 0 {
            return Err(ScheduleError::InvalidPeriod { period });
        }
        Ok(Self {
            period,
            offset: Duration::ZERO,
            description: None,
        })
    }

    /// Shifts every firing by `offset`, truncated to whole seconds and taken
    /// modulo the period.
    pub fn with_offset(mut self, offset: Duration) -> Self {
        self.offset = Duration::from_secs(offset.as_secs() % self.period.as_secs());
        self
    }

    /// Attaches a description shown in logs.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Configured period.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Configured offset.
    pub fn offset(&self) -> Duration {
        self.offset
    }

    /// First aligned slot `truncate(t) + offset`, in `[truncate(t), truncate(t) + period)`.
    fn slot(&self, t: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let abs = (t.timestamp() as i128 + ZERO_TO_UNIX_SECS) * 1_000_000_000
            + t.timestamp_subsec_nanos() as i128;
        let rem = abs.rem_euclid(self.period.as_nanos() as i128);
        let rem = i64::try_from(rem).ok()?;
        t.checked_sub_signed(TimeDelta::nanoseconds(rem))?
            .checked_add_signed(delta(self.offset))
    }
}

impl Schedule for Interval {
    fn next(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let slot = self.slot(now)?;
        if slot > *now {
            Some(slot)
        } else {
            slot.checked_add_signed(delta(self.period))
        }
    }

    fn previous(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let slot = self.slot(now)?;
        if slot > *now {
            slot.checked_sub_signed(delta(self.period))
        } else {
            Some(slot)
        }
    }

    fn describe(&self) -> String {
        match &self.description {
            Some(d) => d.clone(),
            None if self.offset.is_zero() => format!("every {:?}", self.period),
            None => format!("every {:?} offset {:?}", self.period, self.offset),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono_tz::UTC;

    fn at(s: &str) -> DateTime<Tz> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&UTC)
    }

    const HOUR: Duration = Duration::from_secs(3600);

    #[test]
    fn test_rejects_zero_period() {
        assert_eq!(
            Interval::new(Duration::ZERO),
            Err(ScheduleError::InvalidPeriod {
                period: Duration::ZERO
            })
        );
    }

    #[test]
    fn test_rejects_sub_second_period() {
        for period in [Duration::from_millis(500), Duration::from_millis(1500)] {
            let err = Interval::new(period).unwrap_err();
            assert_eq!(err, ScheduleError::InvalidPeriod { period });
        }
        let s = Interval::new(HOUR)
            .unwrap()
            .with_offset(Duration::from_millis(90_250));
        assert_eq!(s.offset(), Duration::from_secs(90));
    }

    #[test]
    fn test_next_hourly() {
        let s = Interval::new(HOUR).unwrap();
        assert_eq!(
            s.next(&at("2022-01-22T13:24:01Z")),
            Some(at("2022-01-22T14:00:00Z"))
        );
    }

    #[test]
    fn test_next_on_boundary_is_strictly_after() {
        let s = Interval::new(HOUR).unwrap();
        assert_eq!(
            s.next(&at("2022-01-22T13:00:00Z")),
            Some(at("2022-01-22T14:00:00Z"))
        );
    }

    #[test]
    fn test_previous_is_inclusive() {
        let s = Interval::new(HOUR).unwrap();
        assert_eq!(
            s.previous(&at("2022-01-22T13:00:00Z")),
            Some(at("2022-01-22T13:00:00Z"))
        );
        assert_eq!(
            s.previous(&at("2022-01-22T13:59:59Z")),
            Some(at("2022-01-22T13:00:00Z"))
        );
    }

    #[test]
    fn test_offset_before_and_after_slot() {
        let s = Interval::new(HOUR)
            .unwrap()
            .with_offset(Duration::from_secs(20 * 60));
        let now = at("2022-01-22T12:15:00Z");
        assert_eq!(s.next(&now), Some(at("2022-01-22T12:20:00Z")));
        assert_eq!(s.previous(&now), Some(at("2022-01-22T11:20:00Z")));
    }

    #[test]
    fn test_offset_is_taken_modulo_period() {
        let s = Interval::new(HOUR)
            .unwrap()
            .with_offset(Duration::from_secs(3600 + 600));
        assert_eq!(s.offset(), Duration::from_secs(600));
    }

    #[test]
    fn test_daily_aligns_to_midnight_utc() {
        let s = Interval::new(24 * HOUR).unwrap();
        assert_eq!(
            s.next(&at("2022-01-22T13:24:01Z")),
            Some(at("2022-01-23T00:00:00Z"))
        );
    }

    #[test]
    fn test_weekly_aligns_to_monday() {
        let s = Interval::new(7 * 24 * HOUR).unwrap();
        // 2022-01-22 is a Saturday.
        assert_eq!(
            s.next(&at("2022-01-22T13:24:01Z")),
            Some(at("2022-01-24T00:00:00Z"))
        );
    }

    #[test]
    fn test_result_keeps_query_zone() {
        let s = Interval::new(HOUR).unwrap();
        let now = at("2022-01-22T08:04:53Z").with_timezone(&chrono_tz::Asia::Bangkok);
        let next = s.next(&now).unwrap();
        assert_eq!(next.timezone(), chrono_tz::Asia::Bangkok);
        assert_eq!(next, at("2022-01-22T09:00:00Z"));
    }

    #[test]
    fn test_describe() {
        let s = Interval::new(HOUR).unwrap();
        assert_eq!(s.describe(), "every 3600s");
        let s = s.with_description("hourly report");
        assert_eq!(s.describe(), "hourly report");
    }
}
