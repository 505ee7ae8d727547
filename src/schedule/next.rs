//! Missed-run reconciliation.
//!
//! ```text
//! last == None ───────────────────────────────► next(now)
//! previous(now) exists and != last ───────────► previous(now)       (run late, never skip)
//! next(last) < next(now) ─────────────────────► next(last) + lag     (catch up one run)
//! otherwise ──────────────────────────────────► next(now)
//! ```
//!
//! Only one logical run is ever returned: missed instants are not replayed one by one.

use std::time::Duration;

use chrono::DateTime;
use chrono_tz::Tz;

use crate::error::ScheduleError;
use crate::schedule::Schedule;

/// Result of [`next_execution`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Due {
    /// Instant the next logical run is due, in `now`'s zone.
    pub at: DateTime<Tz>,
    /// Set when an overdue run was picked over `next(now)`: the distance between them.
    pub lag: Option<Duration>,
}

/// Decides which single run is due given the last completed run.
///
/// A cursor that differs from the schedule's expected previous firing is treated
/// as a missed run, even if the caller deliberately ran early.
pub fn next_execution(
    now: &DateTime<Tz>,
    last: Option<&DateTime<Tz>>,
    schedule: &dyn Schedule,
) -> Result<Due, ScheduleError> {
    let exhausted = |after: &DateTime<Tz>| ScheduleError::Exhausted {
        schedule: schedule.describe(),
        after: after.to_rfc3339(),
    };
    let from_now = schedule.next(now).ok_or_else(|| exhausted(now))?;

    let Some(last) = last else {
        return Ok(Due {
            at: from_now,
            lag: None,
        });
    };

    if let Some(expected) = schedule.previous(now) {
        if expected != *last {
            return Ok(Due {
                at: expected.with_timezone(&now.timezone()),
                lag: None,
            });
        }
    }

    match schedule.next(last) {
        Some(from_last) if from_last < from_now => Ok(Due {
            lag: (from_now - from_last).to_std().ok(),
            at: from_last.with_timezone(&now.timezone()),
        }),
        _ => Ok(Due {
            at: from_now,
            lag: None,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{parse_cron, Interval, Poll, TimeOfDay};
    use chrono_tz::{Asia::Bangkok, UTC};

    fn at(s: &str) -> DateTime<Tz> {
        DateTime::parse_from_rfc3339(s).unwrap().with_timezone(&UTC)
    }

    fn due(now: DateTime<Tz>, last: Option<DateTime<Tz>>, s: &dyn Schedule) -> DateTime<Tz> {
        next_execution(&now, last.as_ref(), s).unwrap().at
    }

    const HOUR: Duration = Duration::from_secs(3600);

    fn hourly() -> Interval {
        Interval::new(HOUR).unwrap()
    }

    #[test]
    fn test_never_ran_uses_next_from_now() {
        assert_eq!(
            due(at("2022-01-22T13:24:01Z"), None, &hourly()),
            at("2022-01-22T14:00:00Z")
        );
    }

    #[test]
    fn test_missed_run_is_favoured() {
        assert_eq!(
            due(
                at("2022-01-22T13:24:01Z"),
                Some(at("2022-01-22T12:00:00Z")),
                &hourly()
            ),
            at("2022-01-22T13:00:00Z")
        );
    }

    #[test]
    fn test_up_to_date_moves_on() {
        assert_eq!(
            due(
                at("2022-01-22T13:24:01Z"),
                Some(at("2022-01-22T13:00:00Z")),
                &hourly()
            ),
            at("2022-01-22T14:00:00Z")
        );
    }

    #[test]
    fn test_cursor_ahead_of_schedule_counts_as_drift() {
        // The cursor says a run happened at 13:44; the schedule expected 13:00.
        // The mismatch is treated as a missed run and 13:00 comes back due.
        assert_eq!(
            due(
                at("2022-01-22T13:50:00Z"),
                Some(at("2022-01-22T13:44:00Z")),
                &hourly()
            ),
            at("2022-01-22T13:00:00Z")
        );
    }

    #[test]
    fn test_offset_interval() {
        let s = hourly().with_offset(Duration::from_secs(600));
        assert_eq!(
            due(
                at("2022-01-22T15:04:53Z"),
                Some(at("2022-01-22T14:10:00Z")),
                &s
            ),
            at("2022-01-22T15:10:00Z")
        );
    }

    #[test]
    fn test_mixed_timezones() {
        let s = hourly().with_offset(Duration::from_secs(600));
        let now = at("2022-01-22T08:04:53Z").with_timezone(&Bangkok);

        let next = due(now, Some(at("2022-01-22T07:10:00Z")), &s);
        assert_eq!(next, at("2022-01-22T08:10:00Z"));
        assert_eq!(next.timezone(), Bangkok);

        let next = due(now, Some(at("2022-01-22T06:10:00Z")), &s);
        assert_eq!(next, at("2022-01-22T07:10:00Z"));
        assert_eq!(next.timezone(), Bangkok);
    }

    #[test]
    fn test_cron_without_drift() {
        let s = parse_cron("0 7,10,14 * * 1-5").unwrap();
        assert_eq!(
            due(
                at("2022-01-21T15:04:53Z"),
                Some(at("2022-01-21T14:00:00Z")),
                &s
            ),
            at("2022-01-24T07:00:00Z")
        );
    }

    #[test]
    fn test_time_of_day_current_run() {
        let s = TimeOfDay::new(15, 0).unwrap();
        assert_eq!(
            due(
                at("2022-01-21T15:00:00Z"),
                Some(at("2022-01-21T15:00:00Z")),
                &s
            ),
            at("2022-01-22T15:00:00Z")
        );
    }

    #[test]
    fn test_interval_cases() {
        let cases = [
            ("2022-01-22T12:15:00Z", "2022-01-22T10:00:00Z", 0, "2022-01-22T12:00:00Z"),
            ("2022-01-22T12:00:00Z", "2022-01-22T10:00:00Z", 0, "2022-01-22T12:00:00Z"),
            ("2022-01-22T12:00:00Z", "2022-01-22T12:00:00Z", 0, "2022-01-22T13:00:00Z"),
            ("2022-01-22T12:20:00Z", "2022-01-22T08:00:00Z", 60, "2022-01-22T12:01:00Z"),
            ("2022-01-22T12:15:00Z", "2022-01-22T08:00:00Z", 1200, "2022-01-22T11:20:00Z"),
        ];
        for (now, last, offset, want) in cases {
            let s = hourly().with_offset(Duration::from_secs(offset));
            assert_eq!(due(at(now), Some(at(last)), &s), at(want), "now={now} last={last}");
        }
    }

    #[test]
    fn test_poll_catches_up_with_lag() {
        let s = Poll::new(HOUR).unwrap();
        let got = next_execution(
            &at("2022-01-22T13:30:00Z"),
            Some(&at("2022-01-22T12:00:00Z")),
            &s,
        )
        .unwrap();
        assert_eq!(got.at, at("2022-01-22T13:00:00Z"));
        assert_eq!(got.lag, Some(Duration::from_secs(5400)));
    }

    #[test]
    fn test_exhausted_schedule() {
        let s = parse_cron("0 0 31 2 *").unwrap();
        let err = next_execution(&at("2022-01-22T13:30:00Z"), None, &s).unwrap_err();
        assert_eq!(err.as_label(), "schedule_exhausted");
    }
}
