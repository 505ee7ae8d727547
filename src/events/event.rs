//! # Lifecycle events emitted by the application supervisor.
//!
//! The [`EventKind`] enum covers two groups:
//! - **Application envelope**: startup, running, terminating, terminated
//! - **Steps**: hooks (pre/post start and stop) and process invocations (start/end)
//!
//! ## Ordering guarantees
//! Every event takes a globally unique `seq` from a monotonic counter. Events of one
//! process are emitted in order; events of different processes interleave freely.
//!
//! ## Example
//! ```rust
//! use appvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::ProcessStart).with_name("worker");
//! assert_eq!(ev.kind, EventKind::ProcessStart);
//! assert_eq!(ev.name.as_deref(), Some("worker"));
//! ```

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    /// `launch` began, before any hook runs.
    AppStartup,

    /// A startup hook is about to run.
    ///
    /// Sets:
    /// - `name`: hook name (if any)
    PreHookStart,

    /// A startup hook finished successfully.
    ///
    /// Sets:
    /// - `name`: hook name (if any)
    PostHookStart,

    /// Every process task has been dispatched.
    AppRunning,

    /// A process run function is being invoked (again, for recovering processes).
    ///
    /// Sets:
    /// - `name`: process name
    ProcessStart,

    /// A process run function returned, whatever the outcome.
    ///
    /// Sets:
    /// - `name`: process name
    ProcessEnd,

    /// `shutdown` began.
    AppTerminating,

    /// A shutdown hook is about to run.
    ///
    /// Sets:
    /// - `name`: hook name (if any)
    PreHookStop,

    /// A shutdown hook returned.
    ///
    /// Sets:
    /// - `name`: hook name (if any)
    PostHookStop,

    /// `shutdown` finished, successfully or not.
    AppTerminated,
}

impl EventKind {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EventKind::AppStartup => "app_startup",
            EventKind::PreHookStart => "pre_hook_start",
            EventKind::PostHookStart => "post_hook_start",
            EventKind::AppRunning => "app_running",
            EventKind::ProcessStart => "process_start",
            EventKind::ProcessEnd => "process_end",
            EventKind::AppTerminating => "app_terminating",
            EventKind::PreHookStop => "pre_hook_stop",
            EventKind::PostHookStop => "post_hook_stop",
            EventKind::AppTerminated => "app_terminated",
        }
    }
}

impl fmt::Display for EventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Lifecycle event.
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Hook or process name, when the event concerns one.
    pub name: Option<Arc<str>>,
}

impl Event {
    /// Creates an event of the given kind with the current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            name: None,
        }
    }

    /// Attaches a hook or process name; empty names are left unset.
    #[inline]
    pub fn with_name(mut self, name: impl Into<Arc<str>>) -> Self {
        let name = name.into();
        if !name.is_empty() {
            self.name = Some(name);
        }
        self
    }
}
