//! # Scheduled processes.
//!
//! [`scheduled`] turns a function into a process that runs it once per due instant
//! of a [`Schedule`], remembering the last completed run in a [`Cursor`].
//!
//! ## One iteration
//! ```text
//! cursor.get(name) ─► next_execution(now, last) ─► due
//!   errors ≥ max_errors ─► cursor.set(due)            (give up on a stuck run)
//!   otherwise           ─► wait_until(due) ─► f(ctx, run) ─Ok─► cursor.set(due)
//!                                                      └Err─► backoff, cursor untouched
//! ```
//!
//! The surrounding supervised loop owns the error count, backoff and the role gate.
//! A run that became due while the service was down is executed once on restart;
//! older missed instants are not replayed.

use std::fmt;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use chrono::DateTime;
use chrono_tz::Tz;
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::Instrument;

use crate::clock::{wait_until, Clock};
use crate::context::Context;
use crate::error::ProcessError;
use crate::metrics::Metrics;
use crate::process::cursor::Cursor;
use crate::process::gate::RoleGate;
use crate::process::options::{Defaults, Options};
use crate::process::runner::{Mode, SupervisedLoop};
use crate::process::{process_fn, Process};
use crate::schedule::{next_execution, Schedule};

/// Arguments of one scheduled run.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScheduledRun {
    /// Last completed run, `None` on the very first run.
    pub last: Option<DateTime<Tz>>,
    /// Instant this run is due.
    pub due: DateTime<Tz>,
    /// Stable identifier `{name}_{unix seconds of due}`, usable as an idempotency key.
    pub id: String,
}

type ScheduledFn = Arc<
    dyn Fn(Context, ScheduledRun) -> BoxFuture<'static, Result<(), ProcessError>> + Send + Sync,
>;

/// Builds a process that runs `f` on `schedule`.
///
/// The gate is looked up from `roles` by the option role (default `name`). The
/// cursor key and run ids always use `name`. The process ends only when its context
/// is cancelled.
pub fn scheduled<S, F, Fut>(
    roles: &dyn RoleGate,
    cursor: Arc<dyn Cursor>,
    name: &str,
    schedule: S,
    f: F,
    opts: Options,
) -> Process
where
    S: Schedule,
    F: Fn(Context, ScheduledRun) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ProcessError>> + Send + 'static,
{
    let opts = opts.with_name(name).resolve(Defaults::scheduled(name));
    let gate = roles.gate(&opts.role);
    let errors = Arc::new(AtomicU32::new(0));
    let recover = opts.recover;

    let runner = Arc::new(ScheduleRunner {
        name: opts.name.clone(),
        cursor,
        schedule: Arc::new(schedule),
        f: Arc::new(move |ctx, run| f(ctx, run).boxed()),
        clock: opts.clock.clone(),
        metrics: opts.metrics.clone(),
        location: opts.location,
        max_errors: opts.max_errors,
        errors: errors.clone(),
    });
    let unit = process_fn(move |ctx| {
        let runner = runner.clone();
        async move { runner.run_next(ctx).await }
    });

    let supervised = Arc::new(
        SupervisedLoop::new(opts, gate, unit, Mode::Forever).with_error_count(errors),
    );
    Process::new(name.to_string(), move |ctx| {
        let supervised = supervised.clone();
        async move { supervised.run(ctx).await }
    })
    .with_recover(recover)
}

struct ScheduleRunner {
    name: String,
    cursor: Arc<dyn Cursor>,
    schedule: Arc<dyn Schedule>,
    f: ScheduledFn,
    clock: Arc<dyn Clock>,
    metrics: Arc<dyn Metrics>,
    location: Tz,
    max_errors: u32,
    errors: Arc<AtomicU32>,
}

impl ScheduleRunner {
    /// Executes the single run that is due next.
    async fn run_next(&self, ctx: Context) -> Result<(), ProcessError> {
        let last = self.last_run(&ctx).await?;
        let now = self.clock.now().with_timezone(&self.location);
        let due = next_execution(&now, last.as_ref(), self.schedule.as_ref())?;
        if let Some(lag) = due.lag {
            self.metrics.schedule_cursor_lag(&self.name, lag);
        }
        let due = due.at;

        let errors = self.errors.load(Ordering::SeqCst);
        if self.max_errors > 0 && errors >= self.max_errors {
            tracing::warn!(
                process = %self.name,
                due = %due,
                errors,
                "skipping run after repeated failures"
            );
            return self.set_done(&ctx, &due).await;
        }

        wait_until(&ctx, self.clock.as_ref(), &due).await?;

        let id = format!("{}_{}", self.name, due.timestamp());
        let span = tracing::info_span!("scheduled_run", run_id = %id);
        let run = ScheduledRun {
            last,
            due: due.clone(),
            id,
        };
        (self.f)(ctx.clone(), run).instrument(span).await?;

        self.set_done(&ctx, &due).await
    }

    async fn last_run(&self, ctx: &Context) -> Result<Option<DateTime<Tz>>, ProcessError> {
        let value = self.cursor.get(ctx, &self.name).await?;
        if value.is_empty() {
            return Ok(None);
        }
        let secs: i64 = value
            .parse()
            .map_err(|e| ProcessError::cursor(format!("invalid cursor {value:?}: {e}")))?;
        let at = DateTime::from_timestamp(secs, 0)
            .ok_or_else(|| ProcessError::cursor(format!("cursor {value:?} out of range")))?;
        Ok(Some(at.with_timezone(&self.location)))
    }

    async fn set_done(&self, ctx: &Context, due: &DateTime<Tz>) -> Result<(), ProcessError> {
        self.cursor
            .set(ctx, &self.name, &due.timestamp().to_string())
            .await
    }
}

impl fmt::Debug for ScheduleRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScheduleRunner")
            .field("name", &self.name)
            .field("schedule", &self.schedule)
            .field("location", &self.location)
            .field("max_errors", &self.max_errors)
            .finish_non_exhaustive()
    }
}
