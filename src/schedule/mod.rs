//! # Schedules: when is the next run due?
//!
//! A [`Schedule`] is a pure function of time. Given "now" it returns the next due
//! instant, strictly after now. Schedules that are wall-clock aligned also report
//! [`Schedule::previous`], the expected most recent firing at or before now, which
//! lets [`next_execution`] notice a missed run.
//!
//! | Policy          | `next(t)`                                     | `previous` |
//! |-----------------|-----------------------------------------------|------------|
//! | [`Interval`]    | next `truncate(t, period) + offset` after `t`  | yes        |
//! | [`Poll`]        | `t + wait`                                    | no         |
//! | [`TimeOfDay`]   | next local `hh:mm` after `t`                  | no         |
//! | [`Cron`]        | next firing of a 5-field expression           | lookback   |
//! | [`InTimezone`]  | inner schedule evaluated in another zone      | delegated  |
//!
//! All instants are `DateTime<chrono_tz::Tz>`; results come back in the zone of the
//! query instant.

mod cron;
mod interval;
mod next;
mod poll;
mod time_of_day;
mod timezone;

use std::fmt;

use chrono::DateTime;
use chrono_tz::Tz;

pub use self::cron::{parse_cron, Cron};
pub use interval::Interval;
pub use next::{next_execution, Due};
pub use poll::Poll;
pub use time_of_day::TimeOfDay;
pub use timezone::{in_timezone, InTimezone};

/// Maps the current instant to the next due instant.
///
/// ## Rules
/// - `next(t) > t` whenever it returns `Some`.
/// - `None` means the schedule can never fire again after `t`.
/// - Results are expressed in `t`'s time zone.
pub trait Schedule: fmt::Debug + Send + Sync + 'static {
    /// Next firing strictly after `now`.
    fn next(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>>;

    /// Expected most recent firing at or before `now`, for wall-clock aligned schedules.
    fn previous(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        let _ = now;
        None
    }

    /// Short human description used in logs and errors.
    fn describe(&self) -> String {
        format!("{self:?}")
    }
}
