//! Error types used by the appvisor runtime, its processes and schedules.
//!
//! This module defines three error enums:
//!
//! - [`ProcessError`]: returned by process, hook and scheduled functions.
//! - [`RuntimeError`]: raised by the application supervisor itself.
//! - [`ScheduleError`]: invalid schedule parameters or expressions.
//!
//! Each provides `as_label` (stable snake_case, for logs/metrics) and `as_message`.
//! Cancellation is carried as a [`Cause`] so callers can tell an explicit cancel
//! from an expired deadline.

use std::fmt::Display;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::context::Cause;

/// # Errors produced by a unit of work.
///
/// Two variants are not failures: [`ProcessError::Canceled`] (the context ended)
/// and [`ProcessError::Break`] (cooperative loop termination).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProcessError {
    /// The run context ended.
    #[error(transparent)]
    Canceled(#[from] Cause),

    /// Stop the surrounding loop successfully.
    #[error("the context loop has been stopped")]
    Break,

    /// The function panicked; the payload is rendered as text.
    #[error("process panicked: {message}")]
    Panicked {
        /// Panic payload, or `"unknown panic"` when not a string.
        message: String,
    },

    /// Ordinary failure.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The context gate refused or failed to grant a run context.
    #[error("context gate: {error}")]
    Gate {
        /// The underlying error message.
        error: String,
    },

    /// Reading or writing the schedule cursor failed.
    #[error("cursor: {error}")]
    Cursor {
        /// The underlying error message.
        error: String,
    },

    /// The schedule could not produce a due instant.
    #[error(transparent)]
    Schedule(#[from] ScheduleError),
}

impl ProcessError {
    /// Wraps any displayable error as [`ProcessError::Fail`].
    pub fn fail(error: impl Display) -> Self {
        ProcessError::Fail {
            error: error.to_string(),
        }
    }

    /// Wraps any displayable error as [`ProcessError::Gate`].
    pub fn gate(error: impl Display) -> Self {
        ProcessError::Gate {
            error: error.to_string(),
        }
    }

    /// Wraps any displayable error as [`ProcessError::Cursor`].
    pub fn cursor(error: impl Display) -> Self {
        ProcessError::Cursor {
            error: error.to_string(),
        }
    }

    /// `true` for [`ProcessError::Canceled`], whatever the cause.
    pub fn is_canceled(&self) -> bool {
        matches!(self, ProcessError::Canceled(_))
    }

    /// `true` for [`ProcessError::Break`].
    pub fn is_break(&self) -> bool {
        matches!(self, ProcessError::Break)
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use appvisor::ProcessError;
    ///
    /// assert_eq!(ProcessError::fail("boom").as_label(), "process_failed");
    /// assert_eq!(ProcessError::Break.as_label(), "process_break");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ProcessError::Canceled(cause) => cause.as_label(),
            ProcessError::Break => "process_break",
            ProcessError::Panicked { .. } => "process_panicked",
            ProcessError::Fail { .. } => "process_failed",
            ProcessError::Gate { .. } => "process_gate",
            ProcessError::Cursor { .. } => "process_cursor",
            ProcessError::Schedule(err) => err.as_label(),
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            ProcessError::Panicked { message } => format!("panic: {message}"),
            ProcessError::Fail { error } => format!("error: {error}"),
            other => other.to_string(),
        }
    }
}

impl From<std::io::Error> for ProcessError {
    fn from(err: std::io::Error) -> Self {
        ProcessError::fail(err)
    }
}

/// # Invalid schedule parameters.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ScheduleError {
    /// Interval period must be a positive whole number of seconds.
    #[error("invalid interval period {period:?}: must be a positive whole number of seconds")]
    InvalidPeriod {
        /// The rejected period.
        period: Duration,
    },

    /// Poll wait must be positive.
    #[error("invalid poll wait {wait:?}: must be positive")]
    InvalidWait {
        /// The rejected wait.
        wait: Duration,
    },

    /// Hour must be below 24 and minute below 60.
    #[error("invalid time of day {hour:02}:{minute:02}")]
    InvalidTimeOfDay {
        /// The rejected hour.
        hour: u32,
        /// The rejected minute.
        minute: u32,
    },

    /// The cron expression did not parse.
    #[error("invalid cron expression {expr:?}: {reason}")]
    InvalidCron {
        /// The rejected expression.
        expr: String,
        /// Parser diagnostics.
        reason: String,
    },

    /// The schedule has no firing after the given instant.
    #[error("schedule {schedule} never fires after {after}")]
    Exhausted {
        /// Schedule description.
        schedule: String,
        /// Instant queried, RFC 3339.
        after: String,
    },
}

impl ScheduleError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ScheduleError::InvalidPeriod { .. } => "schedule_invalid_period",
            ScheduleError::InvalidWait { .. } => "schedule_invalid_wait",
            ScheduleError::InvalidTimeOfDay { .. } => "schedule_invalid_time_of_day",
            ScheduleError::InvalidCron { .. } => "schedule_invalid_cron",
            ScheduleError::Exhausted { .. } => "schedule_exhausted",
        }
    }
}

/// # Errors produced by the application supervisor.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Hook priority outside `[HookPriority::MIN, HookPriority::MAX]`.
    #[error("invalid hook priority {priority}: must be within [-100, 100]")]
    InvalidHookPriority {
        /// The rejected priority.
        priority: i32,
    },

    /// `launch` was called twice.
    #[error("app already launched")]
    AlreadyLaunched,

    /// `shutdown` was called before `launch`.
    #[error("app not launched")]
    NotLaunched,

    /// Another instance holds the process file.
    #[error("process already running: {path:?} holds pid {pid:?}")]
    AlreadyRunning {
        /// Process file path.
        path: PathBuf,
        /// Pid recorded in the existing file, if readable.
        pid: Option<String>,
    },

    /// Process file could not be created or written.
    #[error("process file {path:?}: {source}")]
    ProcessFile {
        /// Process file path.
        path: PathBuf,
        /// Underlying I/O failure.
        #[source]
        source: std::io::Error,
    },

    /// A startup hook failed.
    #[error("start hook {name:?}: {source}")]
    StartHook {
        /// Hook name (may be empty).
        name: String,
        /// Hook error.
        #[source]
        source: ProcessError,
    },

    /// A shutdown hook failed.
    #[error("stop hook {name:?}: {source}")]
    StopHook {
        /// Hook name (may be empty).
        name: String,
        /// Hook error.
        #[source]
        source: ProcessError,
    },

    /// A process run function failed.
    #[error("process {name:?}: {source}")]
    Process {
        /// Process name.
        name: String,
        /// Process error.
        #[source]
        source: ProcessError,
    },

    /// A process shutdown function failed.
    #[error("process {name:?} shutdown: {source}")]
    ProcessShutdown {
        /// Process name.
        name: String,
        /// Shutdown error.
        #[source]
        source: ProcessError,
    },

    /// Shutdown deadline passed; the listed processes had not stopped.
    #[error("shutdown timeout {timeout:?} exceeded; still running: {running:?}")]
    ShutdownTimeout {
        /// The configured shutdown timeout.
        timeout: Duration,
        /// Names of processes whose tasks were still running.
        running: Vec<String>,
    },

    /// The launch or startup context ended.
    #[error(transparent)]
    Canceled(#[from] Cause),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use appvisor::RuntimeError;
    /// use std::time::Duration;
    ///
    /// let err = RuntimeError::ShutdownTimeout { timeout: Duration::from_secs(5), running: vec![] };
    /// assert_eq!(err.as_label(), "runtime_shutdown_timeout");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::InvalidHookPriority { .. } => "runtime_invalid_hook_priority",
            RuntimeError::AlreadyLaunched => "runtime_already_launched",
            RuntimeError::NotLaunched => "runtime_not_launched",
            RuntimeError::AlreadyRunning { .. } => "runtime_already_running",
            RuntimeError::ProcessFile { .. } => "runtime_process_file",
            RuntimeError::StartHook { .. } => "runtime_start_hook",
            RuntimeError::StopHook { .. } => "runtime_stop_hook",
            RuntimeError::Process { .. } => "runtime_process",
            RuntimeError::ProcessShutdown { .. } => "runtime_process_shutdown",
            RuntimeError::ShutdownTimeout { .. } => "runtime_shutdown_timeout",
            RuntimeError::Canceled(cause) => cause.as_label(),
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            RuntimeError::ShutdownTimeout { timeout, running } => {
                format!("shutdown exceeded {timeout:?}; still running={running:?}")
            }
            other => other.to_string(),
        }
    }

    /// `true` when the error only reports an ended context.
    pub fn is_canceled(&self) -> bool {
        match self {
            RuntimeError::Canceled(_) => true,
            RuntimeError::Process { source, .. } => source.is_canceled(),
            _ => false,
        }
    }
}
