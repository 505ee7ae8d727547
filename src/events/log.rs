//! # LogSink: lifecycle events as tracing lines
//!
//! Writes each incoming [`Event`] as one `tracing` record at `info` level
//! (`debug` for per-hook steps).
//!
//! ## Example output
//! ```text
//! INFO appvisor::events: app starting
//! DEBUG appvisor::events: hook starting hook="migrate"
//! INFO appvisor::events: process started process="worker"
//! INFO appvisor::events: app running
//! INFO appvisor::events: app terminating
//! INFO appvisor::events: process ended process="worker"
//! INFO appvisor::events: app terminated
//! ```

use crate::context::Context;
use crate::events::{Event, EventKind, EventSink};

/// Event sink backed by `tracing`.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogSink;

impl LogSink {
    /// Construct a new [`LogSink`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogSink {
    fn on_event(&self, _ctx: &Context, e: &Event) {
        let name = e.name.as_deref().unwrap_or("");
        match e.kind {
            EventKind::AppStartup => tracing::info!(seq = e.seq, "app starting"),
            EventKind::AppRunning => tracing::info!(seq = e.seq, "app running"),
            EventKind::AppTerminating => tracing::info!(seq = e.seq, "app terminating"),
            EventKind::AppTerminated => tracing::info!(seq = e.seq, "app terminated"),
            EventKind::PreHookStart => tracing::debug!(seq = e.seq, hook = name, "hook starting"),
            EventKind::PostHookStart => tracing::debug!(seq = e.seq, hook = name, "hook started"),
            EventKind::PreHookStop => tracing::debug!(seq = e.seq, hook = name, "hook stopping"),
            EventKind::PostHookStop => tracing::debug!(seq = e.seq, hook = name, "hook stopped"),
            EventKind::ProcessStart => {
                tracing::info!(seq = e.seq, process = name, "process started")
            }
            EventKind::ProcessEnd => tracing::info!(seq = e.seq, process = name, "process ended"),
        }
    }
}
