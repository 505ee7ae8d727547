//! # Panic isolation and re-invocation of process functions.
//!
//! ```text
//! invoke():     ProcessStart? ─► call(f, ctx) ─► ProcessEnd
//! recovering(): loop {
//!                 invoke()
//!                 Ok | Break        → return Ok
//!                 ctx ended         → return Err(cause)
//!                 other failure     → wait restart_backoff.next(n) → n += 1
//!               }
//! ```
//!
//! The restart counter resets when an invocation outlived `restart_backoff.max`, so a
//! process that fails once a day does not keep the maximum delay forever.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tokio::time::Instant;

use crate::clock;
use crate::context::Context;
use crate::error::ProcessError;
use crate::events::{Event, EventKind, EventSink};
use crate::policies::BackoffPolicy;
use crate::process::ProcessFn;

/// Renders a panic payload; `&str` and `String` payloads are kept verbatim.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

/// Polls `fut` to completion, turning a panic into [`ProcessError::Panicked`].
pub(crate) async fn catch<F>(fut: F) -> Result<(), ProcessError>
where
    F: Future<Output = Result<(), ProcessError>>,
{
    match AssertUnwindSafe(fut).catch_unwind().await {
        Ok(res) => res,
        Err(payload) => Err(ProcessError::Panicked {
            message: panic_message(payload.as_ref()),
        }),
    }
}

/// Calls `f` and polls its future, turning a panic in either step into
/// [`ProcessError::Panicked`].
pub(crate) async fn call(f: &ProcessFn, ctx: Context) -> Result<(), ProcessError> {
    match std::panic::catch_unwind(AssertUnwindSafe(|| f(ctx))) {
        Ok(fut) => catch(fut).await,
        Err(payload) => Err(ProcessError::Panicked {
            message: panic_message(payload.as_ref()),
        }),
    }
}

/// One process function plus the sink its lifecycle events go to.
#[derive(Clone)]
pub(crate) struct Invoker {
    pub(crate) name: Arc<str>,
    pub(crate) f: ProcessFn,
    pub(crate) events: Arc<dyn EventSink>,
}

impl Invoker {
    /// Runs the function once and emits `ProcessEnd` afterwards.
    ///
    /// `ProcessStart` for the first invocation is emitted by the caller while dispatching.
    pub(crate) async fn invoke(&self, ctx: &Context) -> Result<(), ProcessError> {
        let res = call(&self.f, ctx.clone()).await;
        self.emit(ctx, EventKind::ProcessEnd);
        match res {
            Err(ProcessError::Break) => Ok(()),
            other => other,
        }
    }

    /// Re-invokes the function after every failure until it succeeds or `ctx` ends.
    pub(crate) async fn recovering(
        &self,
        ctx: &Context,
        backoff: BackoffPolicy,
    ) -> Result<(), ProcessError> {
        let clock = clock::system();
        let mut restart: u32 = 0;
        loop {
            let started = Instant::now();
            let err = match self.invoke(ctx).await {
                Ok(()) => return Ok(()),
                Err(err) => err,
            };
            ctx.check()?;

            if started.elapsed() > backoff.max {
                restart = 0;
            }
            let delay = backoff.next(restart);
            tracing::warn!(
                process = %self.name,
                error = %err,
                restart,
                delay = ?delay,
                "process failed; restarting"
            );
            restart = restart.saturating_add(1);

            clock::wait(ctx, clock.as_ref(), delay).await?;
            self.emit(ctx, EventKind::ProcessStart);
        }
    }

    pub(crate) fn emit(&self, ctx: &Context, kind: EventKind) {
        self.events
            .on_event(ctx, &Event::new(kind).with_name(self.name.clone()));
    }
}
