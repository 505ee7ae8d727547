//! # appvisor
//!
//! **Appvisor** supervises the long-running processes of a service: it runs startup
//! hooks, launches every process as its own task, restarts the ones that ask for it,
//! and tears everything down in order when a signal arrives.
//!
//! On top of the supervisor it provides the loops most background work is made of:
//! supervised loops with backoff, retry-until-success, gated loops that only run
//! while a lease is held, stream consumers, and a cron-like scheduler that remembers
//! its last completed run and recovers missed ones.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!  ┌──────────────────────────────────────────────────────────────────┐
//!  │ App (supervisor)                                                 │
//!  │  - startup / shutdown hooks (priority ordered)                   │
//!  │  - error group: first failure cancels every process              │
//!  │  - events ──► EventSink        metrics ──► Metrics               │
//!  └──────┬──────────────────┬──────────────────┬─────────────────────┘
//!         ▼                  ▼                  ▼
//!   ┌───────────┐      ┌───────────┐      ┌─────────────┐
//!   │  Process  │      │  Process  │      │   Process   │
//!   │ (plain fn)│      │ (looping) │      │ (scheduled) │
//!   └───────────┘      └─────┬─────┘      └──────┬──────┘
//!                            ▼                   ▼
//!                    SupervisedLoop      SupervisedLoop ──► ScheduleRunner
//!                    gate ─► lease ─► f   Schedule + Cursor ─► due ─► f
//! ```
//!
//! ### Lifecycle
//! ```text
//! App::run()
//!   ├─► AppContext::from_signals()      SIGQUIT → app ctx, SIGINT/SIGTERM → termination
//!   ├─► launch(app ctx)
//!   │     ├─ process file (optional)
//!   │     ├─ AppStartup, startup hooks (startup_timeout)
//!   │     ├─ ProcessStart + spawn per process
//!   │     └─ AppRunning
//!   ├─► wait_for_shutdown()             app ctx ended or a process failed
//!   ├─► shutdown()                      explicit shutdowns, cancel, wait, hooks
//!   ├─► on_shutdown_err handler, remove process file
//!   └─► wait for termination ctx, return exit code
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / functions                         |
//! |-------------------|--------------------------------------------------------------|-----------------------------------------------|
//! | **Supervision**   | Hooks, process tasks, recovery, graceful shutdown.           | [`App`], [`AppConfig`], [`AppContext`]        |
//! | **Processes**     | Named run/shutdown function pairs and adapters.              | [`Process`], [`process_fn`], [`from_fn`]      |
//! | **Loops**         | Supervised loops, retries and gated loops.                   | [`looping`], [`retry`], [`context_loop`]      |
//! | **Scheduling**    | Interval, time-of-day, cron, poll; cursor-based catch-up.    | [`scheduled`], [`Schedule`], [`Cursor`]       |
//! | **Consumers**     | Stream consumers wrapped in supervised loops.                | [`consumer`], [`StreamConsumer`]              |
//! | **Policies**      | Sleep, error backoff and restart backoff.                    | [`BackoffPolicy`], [`make_error_sleep_fn`]    |
//! | **Errors**        | Typed errors with stable labels.                             | [`ProcessError`], [`RuntimeError`]            |
//! | **Events**        | Lifecycle events delivered to a sink.                        | [`Event`], [`EventKind`], [`EventSink`]       |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogSink`], an event sink writing through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use appvisor::{looping, process_fn, App, AppConfig, AppContext, Context, Options, ProcessError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() {
//!     let mut app = App::new(AppConfig::default());
//!     app.add_process(looping(
//!         process_fn(|_ctx: Context| async {
//!             println!("tick");
//!             Ok::<_, ProcessError>(())
//!         }),
//!         Options::new().with_name("ticker").with_sleep(Duration::from_millis(20)),
//!     ));
//!
//!     // Normally `app.run().await` and let signals stop it.
//!     let ctx = AppContext::new(&Context::background());
//!     let stop = ctx.clone();
//!     tokio::spawn(async move {
//!         tokio::time::sleep(Duration::from_millis(100)).await;
//!         stop.termination().cancel();
//!     });
//!     assert_eq!(app.run_with(&ctx).await, 0);
//! }
//! ```

pub mod clock;
mod context;
mod core;
mod error;
mod events;
pub mod metrics;
mod policies;
mod process;
mod schedule;

// ---- Public re-exports ----

pub use clock::{wait, wait_until, Clock, FakeClock, SystemClock};
pub use context::{Cause, Context};
pub use core::{
    App, AppConfig, AppContext, AppState, HookOptions, HookPriority, ProcessId,
    ShutdownErrHandler, Signal,
};
pub use error::{ProcessError, RuntimeError, ScheduleError};
pub use events::{Event, EventKind, EventLog, EventSink};
pub use metrics::{MemoryMetrics, Metrics, NoopMetrics};
pub use policies::{
    error_sleep_for, jittered, make_error_sleep_fn, sleep_for, BackoffPolicy, ErrorSleepFn,
    JitterPolicy, SleepFn, DEFAULT_BACKOFF,
};
pub use process::{
    consumer, context_loop, context_retry, from_ctx_fn, from_fallible, from_fn, live_consumer,
    looping, many_consumers, noop, process_fn, retry, scheduled, BoxProcessFuture,
    ConsumeError, ContextGate, Cursor, Lease, MemoryCursor, Options, Process, ProcessFn,
    RoleGate, ScheduledRun, StreamConsumer, Ungated,
};
pub use schedule::{
    in_timezone, next_execution, parse_cron, Cron, Due, InTimezone, Interval, Poll, Schedule,
    TimeOfDay,
};

// Optional: expose a tracing-backed event sink.
// Enable with: `--features logging` (on by default)
#[cfg(feature = "logging")]
pub use events::LogSink;
