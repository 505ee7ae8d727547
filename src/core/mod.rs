//! Application supervisor: lifecycle, hooks and shutdown.
//!
//! The public API of this module is [`App`] with its configuration, hook options
//! and the signal-driven [`AppContext`].
//!
//! Internal modules:
//! - [`app`]: launch, shutdown and run orchestration;
//! - [`config`]: supervisor-wide settings;
//! - [`hooks`]: priority-ordered startup and shutdown hooks;
//! - [`group`]: error group over process tasks;
//! - [`recover`]: panic isolation and re-invocation with backoff;
//! - [`pid_file`]: process file creation and removal;
//! - [`signals`]: dual-context OS signal handling.

mod app;
mod config;
mod group;
mod hooks;
mod pid_file;
mod recover;
mod signals;

pub use app::{App, AppState, ProcessId, ShutdownErrHandler};
pub use config::AppConfig;
pub use hooks::{HookOptions, HookPriority};
pub use signals::{AppContext, Signal};
