//! # Processes and the builders that supervise them.
//!
//! A [`Process`] is what the [`App`](crate::App) runs. Plain processes run once;
//! the builders wrap a function in a supervised loop first.
//!
//! ## Architecture
//! ```text
//! looping / retry ──────┐
//! context_loop / _retry ├──► SupervisedLoop ──► gate.acquire ─► unit(run ctx) ─► sleep ─► release
//! scheduled ────────────┤          │
//! consumer / live ──────┘          └── error count, backoff, break, max errors
//! ```
//!
//! ## Contents
//! - [`Process`], [`ProcessFn`], [`process_fn`]: the supervised unit
//! - [`from_fn`], [`from_ctx_fn`], [`from_fallible`]: adapters for other function shapes
//! - [`Options`]: builder options and defaults
//! - [`looping`], [`retry`], [`context_loop`], [`context_retry`]: loop builders
//! - [`scheduled`], [`ScheduledRun`], [`Cursor`], [`MemoryCursor`]: scheduled runs
//! - [`ContextGate`], [`RoleGate`], [`Lease`], [`Ungated`]: the right to run
//! - [`consumer`], [`many_consumers`], [`live_consumer`]: stream consumers
//! - [`noop`]: placeholder that waits for cancellation

mod adapters;
mod consumer;
mod cursor;
mod gate;
mod loops;
mod noop;
mod options;
#[allow(clippy::module_inception)]
mod process;
mod runner;
mod scheduled;

pub use adapters::{from_ctx_fn, from_fallible, from_fn};
pub use consumer::{consumer, live_consumer, many_consumers, ConsumeError, StreamConsumer};
pub use cursor::{Cursor, MemoryCursor};
pub use gate::{ContextGate, Lease, RoleGate, Ungated};
pub use loops::{context_loop, context_retry, looping, retry};
pub use noop::noop;
pub use options::Options;
pub use process::{process_fn, BoxProcessFuture, Process, ProcessFn};
pub use scheduled::{scheduled, ScheduledRun};
