//! Lifecycle events: types and sinks.
//!
//! The supervisor reports its progress as [`Event`]s delivered synchronously to an
//! [`EventSink`]. Any `Fn(&Context, &Event)` closure is a sink.
//!
//! ## Contents
//! - [`EventKind`], [`Event`]: classification and payload
//! - [`EventSink`]: delivery contract
//! - [`EventLog`]: in-memory recorder
//! - [`LogSink`]: tracing writer (feature `logging`)
//!
//! ## Envelope
//! ```text
//! AppStartup
//!   (PreHookStart, PostHookStart)*            startup hooks, in order
//!   ProcessStart*                              one per process with a run function
//! AppRunning
//!   ProcessEnd / ProcessStart ...              as processes exit or restart
//! AppTerminating
//!   ProcessEnd*
//!   (PreHookStop, PostHookStop)*              shutdown hooks, in order
//! AppTerminated
//! ```

mod event;
#[cfg(feature = "logging")]
mod log;
mod sink;

pub use event::{Event, EventKind};
#[cfg(feature = "logging")]
pub use log::LogSink;
pub(crate) use sink::discard;
pub use sink::{EventLog, EventSink};
