//! # Supervised loop: the primitive under loops, retries and schedules.
//!
//! Each iteration acquires a lease from the gate, runs the unit on the lease's
//! context, picks a sleep and waits it out on the same context before releasing the
//! lease.
//!
//! ## Iteration outcomes
//! ```text
//! gate error        ─► counted failure (never a break)
//! Ok                ─► reset count; Forever: success sleep, UntilSuccess: return
//! Break (breakable) ─► return Ok
//! canceled          ─► outer ended: return cause
//!                      Forever: treated as success, UntilSuccess: silent failure
//! other error       ─► count, metric, log, error sleep; give up at max errors
//! ```
//!
//! ## Rules
//! - Outer cancellation at any wait point returns the outer context's cause.
//! - Losing only the lease (run context cancelled, outer alive) re-acquires the gate
//!   on the next iteration instead of waiting out the sleep.
//! - The lease is held through the sleep and released before `after_loop` runs.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::clock::wait;
use crate::context::Context;
use crate::error::ProcessError;
use crate::process::gate::ContextGate;
use crate::process::options::Resolved;
use crate::process::ProcessFn;

/// When the loop stops on its own.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Mode {
    /// Until cancelled, broken or out of retries.
    Forever,
    /// Until the first successful iteration.
    UntilSuccess,
}

pub(crate) struct SupervisedLoop {
    opts: Resolved,
    gate: Arc<dyn ContextGate>,
    unit: ProcessFn,
    mode: Mode,
    errors: Arc<AtomicU32>,
    stop_at_max: bool,
}

impl SupervisedLoop {
    pub(crate) fn new(
        opts: Resolved,
        gate: Arc<dyn ContextGate>,
        unit: ProcessFn,
        mode: Mode,
    ) -> Self {
        Self {
            opts,
            gate,
            unit,
            mode,
            errors: Arc::new(AtomicU32::new(0)),
            stop_at_max: true,
        }
    }

    /// Shares the consecutive error count with the unit.
    ///
    /// The unit then owns the max-errors decision and the loop never gives up.
    pub(crate) fn with_error_count(mut self, errors: Arc<AtomicU32>) -> Self {
        self.errors = errors;
        self.stop_at_max = false;
        self
    }

    pub(crate) async fn run(&self, ctx: Context) -> Result<(), ProcessError> {
        let clock = self.opts.clock.as_ref();
        loop {
            ctx.check()?;

            let lease = match self.gate.acquire(&ctx).await {
                Ok(lease) => lease,
                Err(err) => {
                    ctx.check()?;
                    let delay = self.failed(&err, true)?;
                    wait(&ctx, clock, delay).await?;
                    continue;
                }
            };
            let run_ctx = lease.context().clone();

            let delay = match (self.unit)(run_ctx.clone()).await {
                Ok(()) => {
                    self.errors.store(0, Ordering::SeqCst);
                    if self.mode == Mode::UntilSuccess {
                        return Ok(ctx.check()?);
                    }
                    (self.opts.sleep)()
                }
                Err(ProcessError::Break) if self.opts.breakable => {
                    tracing::info!(process = %self.opts.name, "loop finished");
                    return Ok(ctx.check()?);
                }
                Err(err) if err.is_canceled() => {
                    ctx.check()?;
                    match self.mode {
                        Mode::Forever => {
                            self.errors.store(0, Ordering::SeqCst);
                            (self.opts.sleep)()
                        }
                        Mode::UntilSuccess => self.failed(&err, false)?,
                    }
                }
                Err(err) => self.failed(&err, true)?,
            };

            let slept = wait(&run_ctx, clock, delay).await;
            drop(lease);
            if let Some(after_loop) = &self.opts.after_loop {
                after_loop();
            }
            if slept.is_err() {
                ctx.check()?;
            }
        }
    }

    /// Records a failed iteration and returns the backoff before the next one.
    fn failed(&self, err: &ProcessError, report: bool) -> Result<Duration, ProcessError> {
        let count = self.errors.fetch_add(1, Ordering::SeqCst).saturating_add(1);
        let delay = (self.opts.error_sleep)(count, err);
        if report {
            self.opts.metrics.process_error(&self.opts.name);
            tracing::error!(
                process = %self.opts.name,
                error = %err,
                errors = count,
                delay = ?delay,
                "iteration failed"
            );
        }
        if self.stop_at_max && self.opts.max_errors > 0 && count >= self.opts.max_errors {
            tracing::warn!(process = %self.opts.name, errors = count, "giving up");
            return Err(err.clone());
        }
        Ok(delay)
    }
}


#[cfg(test)]
mod tests {
    use super::testing::RecordingClock;
    use super::*;
    use crate::context::Cause;
    use crate::metrics::MemoryMetrics;
    use crate::process::gate::{Lease, Ungated};
    use crate::process::options::{Defaults, Options};
    use crate::process::process_fn;
    use async_trait::async_trait;

    fn counted<F>(calls: &Arc<AtomicU32>, f: F) -> ProcessFn
    where
        F: Fn(u32, Context) -> Result<(), ProcessError> + Send + Sync + 'static,
    {
        let calls = calls.clone();
        let f = Arc::new(f);
        process_fn(move |ctx| {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            let f = f.clone();
            async move { f(n, ctx) }
        })
    }

    fn runner(opts: Options, unit: ProcessFn, mode: Mode) -> SupervisedLoop {
        SupervisedLoop::new(
            opts.resolve(Defaults::looping()),
            Arc::new(Ungated),
            unit,
            mode,
        )
    }

    #[tokio::test]
    async fn test_error_sleeps_until_break() {
        let clock = Arc::new(RecordingClock::instant());
        let calls = Arc::new(AtomicU32::new(0));
        let unit = counted(&calls, |n, _| {
            if n <= 3 {
                Err(ProcessError::fail("not yet"))
            } else {
                Err(ProcessError::Break)
            }
        });
        let opts = Options::new()
            .with_clock(clock.clone())
            .with_error_sleep(Duration::from_secs(1))
            .with_breakable(true);

        let res = runner(opts, unit, Mode::Forever)
            .run(Context::background())
            .await;
        assert_eq!(res, Ok(()));
        assert_eq!(calls.load(Ordering::SeqCst), 4);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(1); 3]);
    }

    #[tokio::test]
    async fn test_break_is_an_error_unless_breakable() {
        let clock = Arc::new(RecordingClock::instant());
        let calls = Arc::new(AtomicU32::new(0));
        let unit = counted(&calls, |_, _| Err(ProcessError::Break));
        let opts = Options::new().with_clock(clock).with_max_errors(2);

        let res = runner(opts, unit, Mode::Forever)
            .run(Context::background())
            .await;
        assert_eq!(res, Err(ProcessError::Break));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_max_errors_returns_last_error() {
        let clock = Arc::new(RecordingClock::instant());
        let metrics = Arc::new(MemoryMetrics::new());
        let calls = Arc::new(AtomicU32::new(0));
        let unit = counted(&calls, |n, _| Err(ProcessError::fail(format!("attempt {n}"))));
        let opts = Options::new()
            .with_name("flaky")
            .with_clock(clock.clone())
            .with_metrics(metrics.clone())
            .with_max_errors(3);

        let res = runner(opts, unit, Mode::Forever)
            .run(Context::background())
            .await;
        assert_eq!(res, Err(ProcessError::fail("attempt 3")));
        assert_eq!(metrics.errors("flaky"), 3);
        assert_eq!(clock.sleeps().len(), 2);
    }

    #[tokio::test]
    async fn test_success_resets_error_count() {
        let clock = Arc::new(RecordingClock::instant());
        let calls = Arc::new(AtomicU32::new(0));
        let unit = counted(&calls, |n, _| match n {
            3 => Ok(()),
            _ => Err(ProcessError::fail("down")),
        });
        let opts = Options::new().with_clock(clock).with_max_errors(3);

        let res = runner(opts, unit, Mode::Forever)
            .run(Context::background())
            .await;
        assert!(res.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 6);
    }

    #[tokio::test]
    async fn test_outer_cancel_returns_cause() {
        let clock = Arc::new(RecordingClock::instant());
        let outer = Context::background();
        let calls = Arc::new(AtomicU32::new(0));
        let stop = outer.clone();
        let unit = counted(&calls, move |n, _| {
            if n == 3 {
                stop.cancel();
            }
            Ok(())
        });
        let opts = Options::new()
            .with_clock(clock.clone())
            .with_sleep(Duration::from_secs(5));

        let res = runner(opts, unit, Mode::Forever).run(outer).await;
        assert_eq!(res, Err(ProcessError::Canceled(Cause::Canceled)));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(5); 3]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_is_reported_as_such() {
        let unit = process_fn(|ctx: Context| async move {
            Err::<(), ProcessError>(ctx.cancelled().await.into())
        });
        let ctx = Context::background().with_timeout(Duration::from_secs(1));

        let res = runner(Options::new(), unit, Mode::Forever).run(ctx).await;
        assert_eq!(res, Err(ProcessError::Canceled(Cause::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn test_retry_stops_at_first_success() {
        let clock = Arc::new(RecordingClock::instant());
        let calls = Arc::new(AtomicU32::new(0));
        let unit = counted(&calls, |n, _| {
            if n < 3 {
                Err(ProcessError::fail("not ready"))
            } else {
                Ok(())
            }
        });
        let opts = Options::new()
            .with_clock(clock.clone())
            .with_sleep(Duration::from_secs(60));

        let res = runner(opts, unit, Mode::UntilSuccess)
            .run(Context::background())
            .await;
        assert_eq!(res, Ok(()));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(clock.sleeps(), vec![Duration::from_secs(10); 2]);
    }

    struct CountingGate(AtomicU32);

    #[async_trait]
    impl ContextGate for CountingGate {
        async fn acquire(&self, ctx: &Context) -> Result<Lease, ProcessError> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok(Lease::new(ctx.child()))
        }
    }

    #[tokio::test]
    async fn test_lost_lease_reacquires_gate_during_backoff() {
        let clock = Arc::new(RecordingClock::stalled());
        let gate = Arc::new(CountingGate(AtomicU32::new(0)));
        let calls = Arc::new(AtomicU32::new(0));
        let unit = counted(&calls, |n, run_ctx| {
            if n == 1 {
                tokio::spawn(async move { run_ctx.cancel() });
                return Err(ProcessError::fail("lost leadership"));
            }
            Ok(())
        });
        let opts = Options::new().with_clock(clock).resolve(Defaults::looping());

        let res = SupervisedLoop::new(opts, gate.clone(), unit, Mode::UntilSuccess)
            .run(Context::background())
            .await;
        assert_eq!(res, Ok(()));
        assert_eq!(gate.0.load(Ordering::SeqCst), 2);
    }

    struct ClosedGate;

    #[async_trait]
    impl ContextGate for ClosedGate {
        async fn acquire(&self, _ctx: &Context) -> Result<Lease, ProcessError> {
            Err(ProcessError::gate("no leader"))
        }
    }

    #[tokio::test]
    async fn test_gate_errors_count_as_failures() {
        let clock = Arc::new(RecordingClock::instant());
        let calls = Arc::new(AtomicU32::new(0));
        let unit = counted(&calls, |_, _| Ok(()));
        let opts = Options::new()
            .with_clock(clock)
            .with_breakable(true)
            .with_max_errors(2)
            .resolve(Defaults::looping());

        let res = SupervisedLoop::new(opts, Arc::new(ClosedGate), unit, Mode::Forever)
            .run(Context::background())
            .await;
        assert_eq!(res, Err(ProcessError::gate("no leader")));
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_shared_count_never_gives_up() {
        let clock = Arc::new(RecordingClock::instant());
        let errors = Arc::new(AtomicU32::new(0));
        let calls = Arc::new(AtomicU32::new(0));
        let seen = errors.clone();
        let unit = counted(&calls, move |n, _| {
            if n == 5 {
                assert_eq!(seen.load(Ordering::SeqCst), 4);
                return Err(ProcessError::Break);
            }
            Err(ProcessError::fail("x"))
        });
        let opts = Options::new()
            .with_clock(clock)
            .with_breakable(true)
            .with_max_errors(2)
            .resolve(Defaults::looping());

        let res = SupervisedLoop::new(opts, Arc::new(Ungated), unit, Mode::Forever)
            .with_error_count(errors)
            .run(Context::background())
            .await;
        assert_eq!(res, Ok(()));
    }
}
