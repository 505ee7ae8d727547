//! Loop and retry process builders.
//!
//! | Builder          | Gate         | Stops after          |
//! |------------------|--------------|----------------------|
//! | [`looping`]      | [`Ungated`]  | cancel, break, max   |
//! | [`retry`]        | [`Ungated`]  | first success        |
//! | [`context_loop`] | caller's     | cancel, break, max   |
//! | [`context_retry`]| caller's     | first success        |
//!
//! Unnamed processes are named after the calling source location.

use std::sync::Arc;

use crate::process::gate::{ContextGate, Ungated};
use crate::process::options::{Defaults, Options};
use crate::process::runner::{Mode, SupervisedLoop};
use crate::process::{Process, ProcessFn};

/// Runs `f` repeatedly until cancelled.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use appvisor::{looping, process_fn, Context, Options, ProcessError};
///
/// let p = looping(
///     process_fn(|_ctx: Context| async { Ok::<_, ProcessError>(()) }),
///     Options::new().with_name("tick").with_sleep(Duration::from_secs(1)),
/// );
/// assert_eq!(p.name(), "tick");
/// ```
#[track_caller]
pub fn looping(f: ProcessFn, opts: Options) -> Process {
    context_loop(Arc::new(Ungated), f, opts)
}

/// Runs `f` until it succeeds once.
#[track_caller]
pub fn retry(f: ProcessFn, opts: Options) -> Process {
    context_retry(Arc::new(Ungated), f, opts)
}

/// Runs `f` repeatedly, acquiring a lease from `gate` before every iteration.
#[track_caller]
pub fn context_loop(gate: Arc<dyn ContextGate>, f: ProcessFn, opts: Options) -> Process {
    build(gate, f, opts, Mode::Forever, Defaults::looping())
}

/// Runs `f` until it succeeds once, acquiring a lease from `gate` per attempt.
#[track_caller]
pub fn context_retry(gate: Arc<dyn ContextGate>, f: ProcessFn, opts: Options) -> Process {
    build(gate, f, opts, Mode::UntilSuccess, Defaults::looping())
}

fn build(
    gate: Arc<dyn ContextGate>,
    f: ProcessFn,
    opts: Options,
    mode: Mode,
    defaults: Defaults,
) -> Process {
    let opts = opts.resolve(defaults);
    let name = opts.name.clone();
    let recover = opts.recover;
    let supervised = Arc::new(SupervisedLoop::new(opts, gate, f, mode));
    Process::new(name, move |ctx| {
        let supervised = supervised.clone();
        async move { supervised.run(ctx).await }
    })
    .with_recover(recover)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    use crate::context::{Cause, Context};
    use crate::error::ProcessError;
    use crate::process::process_fn;
    use crate::process::runner::testing::RecordingClock;

    #[test]
    fn test_default_name_is_call_site() {
        let p = looping(process_fn(|_| async { Ok::<_, ProcessError>(()) }), Options::new());
        assert!(p.name().contains("loops.rs:"), "{}", p.name());
    }

    #[test]
    fn test_recover_option_reaches_process() {
        let p = retry(
            process_fn(|_| async { Ok::<_, ProcessError>(()) }),
            Options::new().with_name("migrate").with_recover(true),
        );
        assert_eq!(p.name(), "migrate");
        assert!(p.recover());
    }

    #[tokio::test]
    async fn test_retry_returns_after_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let c = calls.clone();
        let p = retry(
            process_fn(move |_| {
                let n = c.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n == 0 {
                        Err(ProcessError::fail("db not ready"))
                    } else {
                        Ok(())
                    }
                }
            }),
            Options::new().with_clock(Arc::new(RecordingClock::instant())),
        );

        let run = p.run_fn().unwrap().clone();
        assert_eq!(run(Context::background()).await, Ok(()));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_loop_ends_with_cancel_cause() {
        let ctx = Context::background();
        let stop = ctx.clone();
        let p = looping(
            process_fn(move |_| {
                stop.cancel();
                async { Ok::<_, ProcessError>(()) }
            }),
            Options::new(),
        );

        let run = p.run_fn().unwrap().clone();
        assert_eq!(run(ctx).await, Err(ProcessError::Canceled(Cause::Canceled)));
    }
}
