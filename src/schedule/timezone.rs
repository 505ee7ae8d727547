use chrono::DateTime;
use chrono_tz::Tz;

use crate::schedule::Schedule;

/// Evaluates `inner` in `tz` and converts results back to the query's zone.
///
/// Daylight-saving transitions in `tz` can shift, skip or repeat local-time firings;
/// this wrapper converts faithfully and does not try to smooth them over.
#[derive(Clone, Debug)]
pub struct InTimezone<S> {
    inner: S,
    tz: Tz,
}

/// Wraps `inner` so it is evaluated in `tz`.
pub fn in_timezone<S: Schedule>(inner: S, tz: Tz) -> InTimezone<S> {
    InTimezone { inner, tz }
}

impl<S: Schedule> Schedule for InTimezone<S> {
    fn next(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        self.inner
            .next(&now.with_timezone(&self.tz))
            .map(|t| t.with_timezone(&now.timezone()))
    }

    fn previous(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        self.inner
            .previous(&now.with_timezone(&self.tz))
            .map(|t| t.with_timezone(&now.timezone()))
    }

    fn describe(&self) -> String {
        format!("{} in {}", self.inner.describe(), self.tz)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::{Interval, TimeOfDay};
    use chrono::{TimeZone, Utc};
    use chrono_tz::America::New_York;
    use chrono_tz::UTC;
    use std::time::Duration;

    fn utc(y: i32, mo: u32, d: u32, h: u32, mi: u32) -> DateTime<Tz> {
        Utc.with_ymd_and_hms(y, mo, d, h, mi, 0)
            .unwrap()
            .with_timezone(&UTC)
    }

    fn runs(s: &dyn Schedule, start: DateTime<Tz>, end: DateTime<Tz>) -> Vec<DateTime<Tz>> {
        let mut out = Vec::new();
        let mut t = start;
        while let Some(next) = s.next(&t) {
            if next > end {
                break;
            }
            out.push(next);
            t = next;
        }
        out
    }

    #[test]
    fn test_half_past_midnight_across_spring_forward() {
        let s = in_timezone(TimeOfDay::new(0, 30).unwrap(), New_York);
        assert_eq!(
            runs(&s, utc(2022, 3, 10, 0, 0), utc(2022, 3, 15, 0, 0)),
            vec![
                utc(2022, 3, 10, 5, 30),
                utc(2022, 3, 11, 5, 30),
                utc(2022, 3, 12, 5, 30),
                utc(2022, 3, 13, 5, 30),
                utc(2022, 3, 14, 4, 30),
            ]
        );
    }

    #[test]
    fn test_skipped_local_time_across_spring_forward() {
        let s = in_timezone(TimeOfDay::new(2, 30).unwrap(), New_York);
        assert_eq!(
            runs(&s, utc(2022, 3, 10, 0, 0), utc(2022, 3, 15, 0, 0)),
            vec![
                utc(2022, 3, 10, 7, 30),
                utc(2022, 3, 11, 7, 30),
                utc(2022, 3, 12, 7, 30),
                utc(2022, 3, 13, 6, 30),
                utc(2022, 3, 14, 6, 30),
            ]
        );
    }

    #[test]
    fn test_results_come_back_in_query_zone() {
        let s = in_timezone(TimeOfDay::new(9, 0).unwrap(), New_York);
        let next = s.next(&utc(2022, 1, 10, 0, 0)).unwrap();
        assert_eq!(next.timezone(), UTC);
        assert_eq!(next, utc(2022, 1, 10, 14, 0));
    }

    #[test]
    fn test_previous_is_delegated() {
        let s = in_timezone(Interval::new(Duration::from_secs(3600)).unwrap(), New_York);
        assert_eq!(
            s.previous(&utc(2022, 1, 10, 13, 24)),
            Some(utc(2022, 1, 10, 13, 0))
        );
    }
}
