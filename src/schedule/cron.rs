//! Standard 5-field cron expressions.
//!
//! ```text
//! ┌──────── minute        (0-59)
//! │ ┌────── hour          (0-23)
//! │ │ ┌──── day of month  (1-31)
//! │ │ │ ┌── month         (1-12 or JAN-DEC)
//! │ │ │ │ ┌ day of week   (0-7 or SUN-SAT; 0 and 7 are Sunday)
//! * * * * *
//! ```
//!
//! Descriptors `@yearly`, `@monthly`, `@weekly`, `@daily` and `@hourly` are accepted too.
//! Parsing is delegated to the `cron` crate after translating the expression to its
//! seconds-first dialect (where Sunday is 1).
//!
//! When both day of month and day of week are restricted, a day matching either one
//! fires. A field starting with `*` or `?` counts as unrestricted.

use std::str::FromStr;
use std::time::Duration;

use chrono::DateTime;
use chrono_tz::Tz;

use crate::clock::delta;
use crate::error::ScheduleError;
use crate::schedule::Schedule;

const FIRST_LOOKBACK: Duration = Duration::from_secs(10 * 60);
const MAX_LOOKBACK: Duration = Duration::from_secs(1000 * 24 * 60 * 60);
const DAY_NAMES: [&str; 7] = ["SUN", "MON", "TUE", "WED", "THU", "FRI", "SAT"];

/// Parsed cron schedule with lookback-derived `previous`.
#[derive(Clone, Debug)]
pub struct Cron {
    expr: String,
    // Two schedules when day of month and day of week are both restricted.
    inner: Vec<::cron::Schedule>,
}

/// Parses a standard 5-field cron expression or descriptor.
pub fn parse_cron(expr: &str) -> Result<Cron, ScheduleError> {
    let invalid = |reason: String| ScheduleError::InvalidCron {
        expr: expr.to_string(),
        reason,
    };

    let inner = translate(expr)
        .map_err(invalid)?
        .iter()
        .map(|t| ::cron::Schedule::from_str(t).map_err(|e| invalid(e.to_string())))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Cron {
        expr: expr.trim().to_string(),
        inner,
    })
}

impl FromStr for Cron {
    type Err = ScheduleError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_cron(s)
    }
}

impl Cron {
    /// The expression as written by the caller.
    pub fn expression(&self) -> &str {
        &self.expr
    }
}

impl Schedule for Cron {
    fn next(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        self.inner
            .iter()
            .filter_map(|s| s.after(now).find(|t| t > now))
            .min()
    }

    /// Last firing at or before `now`.
    ///
    /// Walks back from `next(now)` with a doubling window until a firing appears
    /// before it, then scans forward inside that window. Falls back to `now` when
    /// nothing fired in the last 1000 days.
    fn previous(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let Some(next) = self.next(now) else {
            return Some(*now);
        };

        let mut lookback = FIRST_LOOKBACK;
        let mut prev = next;
        while prev == next {
            if lookback > MAX_LOOKBACK {
                return Some(*now);
            }
            let from = next.checked_sub_signed(delta(lookback))?;
            lookback *= 2;
            prev = self.next(&from)?;
        }

        let mut cur = prev;
        while cur != next {
            prev = cur;
            cur = self.next(&prev)?;
        }
        Some(prev)
    }

    fn describe(&self) -> String {
        format!("cron {:?}", self.expr)
    }
}

/// Translates to the seconds-first dialect; day-of-month OR day-of-week becomes two
/// expressions.
fn translate(expr: &str) -> Result<Vec<String>, String> {
    let expr = expr.trim();
    if expr.starts_with('@') {
        return Ok(vec![expr.to_string()]);
    }

    let fields: Vec<&str> = expr.split_whitespace().collect();
    let [minute, hour, dom, month, dow] = fields.as_slice() else {
        return Err(format!("expected 5 fields, found {}", fields.len()));
    };
    let dow = translate_weekdays(dow)?;
    if restricted(dom) && restricted(&dow) {
        return Ok(vec![
            format!("0 {minute} {hour} {dom} {month} *"),
            format!("0 {minute} {hour} * {month} {dow}"),
        ]);
    }
    Ok(vec![format!("0 {minute} {hour} {dom} {month} {dow}")])
}

fn restricted(field: &str) -> bool {
    !(field.starts_with('*') || field.starts_with('?'))
}

/// Rewrites numeric weekdays (Sunday = 0 or 7) as names so the result is
/// independent of the target dialect's numbering.
fn translate_weekdays(field: &str) -> Result<String, String> {
    let items = field
        .split(',')
        .map(|item| {
            let (range, step) = match item.split_once('/') {
                Some((range, step)) => (range, Some(step)),
                None => (item, None),
            };
            let range = match range.split_once('-') {
                Some((from, to)) => {
                    let (from, to) = (weekday(from)?, weekday(to)?);
                    match (to.as_str(), step) {
                        ("SUN", None) if from != "SUN" => format!("{from}-SAT,SUN"),
                        ("SUN", Some(_)) if from != "SUN" => {
                            return Err(format!("unsupported weekday range {item:?}"));
                        }
                        _ => format!("{from}-{to}"),
                    }
                }
                None => weekday(range)?,
            };
            Ok(match step {
                Some(step) => format!("{range}/{step}"),
                None => range,
            })
        })
        .collect::<Result<Vec<_>, String>>()?;
    Ok(items.join(","))
}

fn weekday(token: &str) -> Result<String, String> {
    if token == "*" || token == "?" {
        return Ok(token.to_string());
    }
    match token.parse::<usize>() {
        Ok(n) if n <= 7 => Ok(DAY_NAMES[n % 7].to_string()),
        Ok(n) => Err(format!("weekday {n} out of range 0-7")),
        Err(_) => Ok(token.to_ascii_uppercase()),
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
    fn test_translate_weekdays() {
        assert_eq!(translate_weekdays("1-5").unwrap(), "MON-FRI");
        assert_eq!(translate_weekdays("0,6").unwrap(), "SUN,SAT");
        assert_eq!(translate_weekdays("7").unwrap(), "SUN");
        assert_eq!(translate_weekdays("5-7").unwrap(), "FRI-SAT,SUN");
        assert_eq!(translate_weekdays("*/2").unwrap(), "*/2");
        assert_eq!(translate_weekdays("mon-fri").unwrap(), "MON-FRI");
        assert!(translate_weekdays("8").is_err());
    }

    #[test]
    fn test_day_of_month_or_day_of_week() {
        let s = parse_cron("0 0 1 * 1").unwrap();
        // 2024-10-07 is the next Monday.
        assert_eq!(
            s.next(&at("2024-10-03T08:00:00Z")),
            Some(at("2024-10-07T00:00:00Z"))
        );
        // 2024-11-01 is a Friday, ahead of Monday 2024-11-04.
        assert_eq!(
            s.next(&at("2024-10-29T00:00:00Z")),
            Some(at("2024-11-01T00:00:00Z"))
        );
        assert_eq!(
            s.previous(&at("2024-10-03T08:00:00Z")),
            Some(at("2024-10-01T00:00:00Z"))
        );
    }

    #[test]
    fn test_starred_weekday_keeps_single_schedule() {
        assert_eq!(translate("0 0 1 * *").unwrap(), vec!["0 0 0 1 * *"]);
        assert_eq!(translate("0 0 1 * */2").unwrap().len(), 1);
        assert_eq!(translate("0 0 1,15 * 1-5").unwrap().len(), 2);
    }

    #[test]
    fn test_rejects_wrong_field_count() {
        let err = parse_cron("0 9 * *").unwrap_err();
        assert_eq!(err.as_label(), "schedule_invalid_cron");
        assert!(parse_cron("0 0 9 * * *").is_err());
    }

    #[test]
    fn test_weekday_expression_skips_weekend() {
        let s = parse_cron("0 7,10,14 * * 1-5").unwrap();
        // 2022-01-21 is a Friday.
        assert_eq!(
            s.next(&at("2022-01-21T15:04:53Z")),
            Some(at("2022-01-24T07:00:00Z"))
        );
    }

    #[test]
    fn test_previous_daily() {
        let s = parse_cron("0 9 * * *").unwrap();
        let now = at("2024-10-03T08:00:00Z");
        assert_eq!(s.previous(&now), Some(at("2024-10-02T09:00:00Z")));
        assert_eq!(s.next(&now), Some(at("2024-10-03T09:00:00Z")));
    }

    #[test]
    fn test_previous_every_minute() {
        let s = parse_cron("* * * * *").unwrap();
        for now in ["2024-10-03T08:14:45Z", "2024-10-03T08:14:00Z"] {
            let now = at(now);
            assert_eq!(s.previous(&now), Some(at("2024-10-03T08:14:00Z")));
            assert_eq!(s.next(&now), Some(at("2024-10-03T08:15:00Z")));
        }
    }

    #[test]
    fn test_previous_yearly_needs_long_lookback() {
        let s = parse_cron("1 1 1 1 *").unwrap();
        let now = at("2024-01-01T00:00:59Z");
        assert_eq!(s.previous(&now), Some(at("2023-01-01T01:01:00Z")));
        assert_eq!(s.next(&now), Some(at("2024-01-01T01:01:00Z")));
    }

    #[test]
    fn test_never_firing_expression() {
        let s = parse_cron("0 0 31 2 *").unwrap();
        let now = at("2024-10-03T08:00:00Z");
        assert_eq!(s.next(&now), None);
        assert_eq!(s.previous(&now), Some(now));
    }

    #[test]
    fn test_descriptor() {
        let s: Cron = "@daily".parse().unwrap();
        assert_eq!(
            s.next(&at("2024-10-03T08:00:00Z")),
            Some(at("2024-10-04T00:00:00Z"))
        );
    }
}
