//! # Options for loop, retry, scheduled and consumer processes.
//!
//! [`Options`] is a consuming builder; each process builder resolves it against its
//! own defaults.
//!
//! ## Defaults
//! | Field        | loop / retry          | scheduled        | consumer         |
//! |--------------|-----------------------|------------------|------------------|
//! | name         | caller `file:line`    | schedule name    | consumer name    |
//! | role         | name                  | name             | name             |
//! | sleep        | 0                     | 0                | 100ms            |
//! | error sleep  | 10s                   | 10min            | 1min             |
//! | max errors   | 0 (never give up)     | 0                | 0                |
//! | breakable    | false                 | false            | true             |
//! | location     | UTC                   | UTC              | UTC              |

use std::fmt;
use std::panic::Location;
use std::sync::Arc;
use std::time::Duration;

use chrono_tz::Tz;

use crate::clock::{self, Clock};
use crate::metrics::{self, Metrics};
use crate::policies::{error_sleep_for, sleep_for, ErrorSleepFn, SleepFn};

pub(crate) type AfterLoopFn = Arc<dyn Fn() + Send + Sync>;

/// Builder for process options.
#[derive(Clone, Default)]
pub struct Options {
    name: Option<String>,
    role: Option<String>,
    sleep: Option<SleepFn>,
    error_sleep: Option<ErrorSleepFn>,
    max_errors: u32,
    clock: Option<Arc<dyn Clock>>,
    metrics: Option<Arc<dyn Metrics>>,
    breakable: Option<bool>,
    recover: bool,
    location: Option<Tz>,
    after_loop: Option<AfterLoopFn>,
}

impl Options {
    /// Empty options; every field falls back to the builder's default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Process name used in logs, metrics and events.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Role to request from the role gate instead of the process name.
    pub fn with_role(mut self, role: impl Into<String>) -> Self {
        self.role = Some(role.into());
        self
    }

    /// Sleep `d` after every successful iteration.
    pub fn with_sleep(self, d: Duration) -> Self {
        self.with_sleep_fn(sleep_for(d))
    }

    /// Custom success sleep policy.
    pub fn with_sleep_fn(mut self, f: SleepFn) -> Self {
        self.sleep = Some(f);
        self
    }

    /// Sleep `d` after every failed iteration.
    pub fn with_error_sleep(self, d: Duration) -> Self {
        self.with_error_sleep_fn(error_sleep_for(d))
    }

    /// Custom error sleep policy, e.g. [`make_error_sleep_fn`](crate::make_error_sleep_fn).
    pub fn with_error_sleep_fn(mut self, f: ErrorSleepFn) -> Self {
        self.error_sleep = Some(f);
        self
    }

    /// Give up after `n` consecutive errors; `0` never gives up.
    ///
    /// Loops return the last error. Schedulers instead mark the stuck run done
    /// without executing it.
    pub fn with_max_errors(mut self, n: u32) -> Self {
        self.max_errors = n;
        self
    }

    /// Time source; tests pass a [`FakeClock`](crate::FakeClock).
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Metrics sink for error counts and scheduler lag.
    pub fn with_metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Whether [`ProcessError::Break`](crate::ProcessError::Break) ends the loop successfully.
    pub fn with_breakable(mut self, breakable: bool) -> Self {
        self.breakable = Some(breakable);
        self
    }

    /// Catch panics and restart the process (see [`Process::with_recover`](crate::Process::with_recover)).
    pub fn with_recover(mut self, recover: bool) -> Self {
        self.recover = recover;
        self
    }

    /// Time zone schedules are evaluated in.
    pub fn with_location(mut self, tz: Tz) -> Self {
        self.location = Some(tz);
        self
    }

    /// Callback run after every loop iteration, before the next one starts.
    pub(crate) fn with_after_loop(mut self, f: AfterLoopFn) -> Self {
        self.after_loop = Some(f);
        self
    }

    pub(crate) fn resolve(self, defaults: Defaults) -> Resolved {
        let name = self.name.unwrap_or(defaults.name);
        Resolved {
            role: self.role.unwrap_or_else(|| name.clone()),
            name,
            sleep: self.sleep.unwrap_or_else(|| sleep_for(defaults.sleep)),
            error_sleep: self
                .error_sleep
                .unwrap_or_else(|| error_sleep_for(defaults.error_sleep)),
            max_errors: self.max_errors,
            clock: self.clock.unwrap_or_else(clock::system),
            metrics: self.metrics.unwrap_or_else(metrics::noop),
            breakable: self.breakable.unwrap_or(defaults.breakable),
            recover: self.recover,
            location: self.location.unwrap_or(Tz::UTC),
            after_loop: self.after_loop,
        }
    }
}

impl fmt::Debug for Options {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Options")
            .field("name", &self.name)
            .field("role", &self.role)
            .field("max_errors", &self.max_errors)
            .field("breakable", &self.breakable)
            .field("recover", &self.recover)
            .field("location", &self.location)
            .finish_non_exhaustive()
    }
}

/// Per-builder fallbacks.
pub(crate) struct Defaults {
    pub(crate) name: String,
    pub(crate) sleep: Duration,
    pub(crate) error_sleep: Duration,
    pub(crate) breakable: bool,
}

impl Defaults {
    /// Loop and retry defaults, named after the calling source location.
    #[track_caller]
    pub(crate) fn looping() -> Self {
        let caller = Location::caller();
        Self {
            name: format!("{}:{}", caller.file(), caller.line()),
            sleep: Duration::ZERO,
            error_sleep: Duration::from_secs(10),
            breakable: false,
        }
    }

    pub(crate) fn scheduled(name: &str) -> Self {
        Self {
            name: name.to_string(),
            sleep: Duration::ZERO,
            error_sleep: Duration::from_secs(10 * 60),
            breakable: false,
        }
    }

    pub(crate) fn consumer(name: &str) -> Self {
        Self {
            name: name.to_string(),
            sleep: Duration::from_millis(100),
            error_sleep: Duration::from_secs(60),
            breakable: true,
        }
    }
}

/// Options with every default applied.
#[derive(Clone)]
pub(crate) struct Resolved {
    pub(crate) name: String,
    pub(crate) role: String,
    pub(crate) sleep: SleepFn,
    pub(crate) error_sleep: ErrorSleepFn,
    pub(crate) max_errors: u32,
    pub(crate) clock: Arc<dyn Clock>,
    pub(crate) metrics: Arc<dyn Metrics>,
    pub(crate) breakable: bool,
    pub(crate) recover: bool,
    pub(crate) location: Tz,
    pub(crate) after_loop: Option<AfterLoopFn>,
}
