use chrono::{DateTime, Days, LocalResult, NaiveDateTime, NaiveTime, TimeDelta, TimeZone};
use chrono_tz::Tz;

use crate::error::ScheduleError;
use crate::schedule::Schedule;

/// Fires once a day at `hour:minute` local time, in the zone of the query instant.
///
/// Around daylight-saving changes:
/// - a local time skipped by the clock resolves with the offset in force after the jump;
/// - a local time that occurs twice resolves to the earlier instant.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TimeOfDay {
    at: NaiveTime,
}

impl TimeOfDay {
    /// Creates the schedule; `hour < 24`, `minute < 60`.
    pub fn new(hour: u32, minute: u32) -> Result<Self, ScheduleError> {
        NaiveTime::from_hms_opt(hour, minute, 0)
            .map(|at| Self { at })
            .ok_or(ScheduleError::InvalidTimeOfDay { hour, minute })
    }
}

impl Schedule for TimeOfDay {
    fn next(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let tz = now.timezone();
        let today = now.date_naive();
        (0..3)
            .filter_map(|days| today.checked_add_days(Days::new(days)))
            .filter_map(|date| resolve_local(&tz, date.and_time(self.at)))
            .find(|candidate| candidate > now)
    }

    fn describe(&self) -> String {
        format!("daily at {}", self.at.format("%H:%M"))
    }
}

fn resolve_local(tz: &Tz, local: NaiveDateTime) -> Option<DateTime<Tz>> {
    match tz.from_local_datetime(&local) {
        LocalResult::Single(t) => Some(t),
        LocalResult::Ambiguous(earliest, _) => Some(earliest),
        LocalResult::None => {
            let hour = TimeDelta::hours(1);
            let after = tz.from_local_datetime(&(local + hour)).earliest()?;
            Some(after - hour)
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

    #[test]
    fn test_rejects_out_of_range() {
        assert!(TimeOfDay::new(24, 0).is_err());
        assert!(TimeOfDay::new(0, 60).is_err());
        assert!(TimeOfDay::new(23, 59).is_ok());
    }

    #[test]
    fn test_later_today() {
        let s = TimeOfDay::new(15, 0).unwrap();
        assert_eq!(
            s.next(&at("2022-01-21T09:00:00Z")),
            Some(at("2022-01-21T15:00:00Z"))
        );
    }

    #[test]
    fn test_exact_time_rolls_to_tomorrow() {
        let s = TimeOfDay::new(15, 0).unwrap();
        assert_eq!(
            s.next(&at("2022-01-21T15:00:00Z")),
            Some(at("2022-01-22T15:00:00Z"))
        );
    }

    #[test]
    fn test_midnight_in_new_york() {
        let ny = chrono_tz::America::New_York;
        let s = TimeOfDay::new(0, 0).unwrap();
        let now = at("2021-12-31T00:00:00Z").with_timezone(&ny);
        let first = s.next(&now).unwrap();
        assert_eq!(first, at("2021-12-31T05:00:00Z"));
        assert_eq!(s.next(&first), Some(at("2022-01-01T05:00:00Z")));
    }

    #[test]
    fn test_spring_forward_gap_uses_post_transition_offset() {
        let ny = chrono_tz::America::New_York;
        let s = TimeOfDay::new(2, 30).unwrap();
        // 02:30 does not exist in New York on 2022-03-13.
        let now = at("2022-03-12T12:00:00Z").with_timezone(&ny);
        assert_eq!(s.next(&now), Some(at("2022-03-13T06:30:00Z")));
    }
}
