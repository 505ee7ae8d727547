use std::time::Duration;

use chrono::DateTime;
use chrono_tz::Tz;

use crate::clock::delta;
use crate::error::ScheduleError;
use crate::schedule::Schedule;

/// Minimum delay between successful runs: `next(t) = t + wait`.
///
/// Not wall-clock aligned, so it has no `previous` and never reports drift.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Poll {
    wait: Duration,
}

impl Poll {
    /// Creates a poll schedule; `wait` must be positive.
    pub fn new(wait: Duration) -> Result<Self, ScheduleError> {
        if wait.is_zero() {
            return Err(ScheduleError::InvalidWait { wait });
        }
        Ok(Self { wait })
    }
}

impl Schedule for Poll {
    fn next(&self, now: &DateTime<Tz>) -> Option<DateTime<Tz>> {
        now.checked_add_signed(delta(self.wait))
    }

    fn describe(&self) -> String {
        format!("poll {:?}", self.wait)
    }
}
