//! # Stream consumer processes.
//!
//! A [`StreamConsumer`] runs one pass over an event stream and reports how it ended.
//! The builders here wrap it in a supervised loop:
//!
//! | Outcome                          | Loop sees                    |
//! |----------------------------------|------------------------------|
//! | `Ok`, [`ConsumeError::Stopped`]  | success                      |
//! | [`ConsumeError::HeadReached`]    | break (gated builders only)  |
//! | [`ConsumeError::Failed`]         | the wrapped error            |
//!
//! [`StreamConsumer::stop`] is called after every iteration. Consumer defaults:
//! 100ms success sleep, 1min error sleep, breakable.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::context::Context;
use crate::error::ProcessError;
use crate::process::gate::{RoleGate, Ungated};
use crate::process::options::{Defaults, Options};
use crate::process::runner::{Mode, SupervisedLoop};
use crate::process::{process_fn, Process, ProcessFn};

/// How one consume pass ended.
#[derive(Error, Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum ConsumeError {
    /// Expected termination, e.g. the stream was closed on purpose.
    #[error("consumer stopped")]
    Stopped,

    /// Consumed up to the head of a stream configured to stop there.
    #[error("stream head reached")]
    HeadReached,

    /// Any other failure.
    #[error(transparent)]
    Failed(#[from] ProcessError),
}

impl ConsumeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConsumeError::Stopped => "consume_stopped",
            ConsumeError::HeadReached => "consume_head_reached",
            ConsumeError::Failed(err) => err.as_label(),
        }
    }
}

/// One pass over a stream.
#[async_trait]
pub trait StreamConsumer: Send + Sync + 'static {
    /// Consumer name; also the default role and process name.
    fn name(&self) -> &str;

    /// Consumes until the stream ends, fails or `ctx` is cancelled.
    async fn consume(&self, ctx: &Context) -> Result<(), ConsumeError>;

    /// Releases stream resources after each pass.
    fn stop(&self) {}
}

/// Runs `consumer` whenever the gate for its role grants a lease.
pub fn consumer(
    roles: &dyn RoleGate,
    consumer: Arc<dyn StreamConsumer>,
    opts: Options,
) -> Process {
    let name = consumer.name().to_string();
    let stopper = consumer.clone();
    let opts = opts
        .with_after_loop(Arc::new(move || stopper.stop()))
        .resolve(Defaults::consumer(&name));
    let gate = roles.gate(&opts.role);
    let recover = opts.recover;
    let supervised = Arc::new(SupervisedLoop::new(
        opts,
        gate,
        consume_fn(consumer, true),
        Mode::Forever,
    ));
    Process::new(name, move |ctx| {
        let supervised = supervised.clone();
        async move { supervised.run(ctx).await }
    })
    .with_recover(recover)
}

/// Runs several consumers with the same gate and options, one process each.
pub fn many_consumers(
    roles: &dyn RoleGate,
    consumers: Vec<Arc<dyn StreamConsumer>>,
    opts: Options,
) -> Vec<Process> {
    consumers
        .into_iter()
        .map(|c| consumer(roles, c, opts.clone()))
        .collect()
}

/// Runs `consumer` on every instance without a gate.
///
/// Reaching the stream head is an ordinary error here and the loop never breaks.
pub fn live_consumer(consumer: Arc<dyn StreamConsumer>, opts: Options) -> Process {
    let name = consumer.name().to_string();
    let stopper = consumer.clone();
    let opts = opts
        .with_name(name.clone())
        .with_breakable(false)
        .with_after_loop(Arc::new(move || stopper.stop()))
        .resolve(Defaults::consumer(&name));
    let recover = opts.recover;
    let supervised = Arc::new(SupervisedLoop::new(
        opts,
        Arc::new(Ungated),
        consume_fn(consumer, false),
        Mode::Forever,
    ));
    Process::new(name, move |ctx| {
        let supervised = supervised.clone();
        async move { supervised.run(ctx).await }
    })
    .with_recover(recover)
}

fn consume_fn(consumer: Arc<dyn StreamConsumer>, head_breaks: bool) -> ProcessFn {
    process_fn(move |ctx: Context| {
        let consumer = consumer.clone();
        async move {
            match consumer.consume(&ctx).await {
                Ok(()) | Err(ConsumeError::Stopped) => Ok(()),
                Err(ConsumeError::HeadReached) if head_breaks => Err(ProcessError::Break),
                Err(ConsumeError::HeadReached) => {
                    Err(ProcessError::fail(ConsumeError::HeadReached))
                }
                Err(ConsumeError::Failed(err)) => Err(err),
            }
        }
    })
}
