//! # Process: a named unit the supervisor runs
//!
//! [`Process`] bundles a run function, an optional explicit shutdown function and a
//! recovery flag. Functions take a [`Context`] and produce a fresh future per call,
//! so a recovering process can be re-invoked without hidden shared state.
//!
//! ## Example
//! ```rust
//! use appvisor::{Context, Process, ProcessError};
//!
//! let p = Process::new("worker", |ctx: Context| async move {
//!     ctx.cancelled().await;
//!     Ok::<_, ProcessError>(())
//! })
//! .with_recover(true);
//!
//! assert_eq!(p.name(), "worker");
//! assert!(p.recover());
//! ```

use std::fmt;
use std::future::Future;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::context::Context;
use crate::error::ProcessError;

/// Boxed future returned by process functions.
pub type BoxProcessFuture = BoxFuture<'static, Result<(), ProcessError>>;

/// Canonical process function: `(ctx) -> Result<(), ProcessError>`.
pub type ProcessFn = Arc<dyn Fn(Context) -> BoxProcessFuture + Send + Sync>;

/// Boxes a closure into a [`ProcessFn`].
pub fn process_fn<F, Fut>(f: F) -> ProcessFn
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ProcessError>> + Send + 'static,
{
    Arc::new(move |ctx| f(ctx).boxed())
}

/// Supervised unit registered into an [`App`](crate::App).
#[derive(Clone)]
pub struct Process {
    name: Arc<str>,
    run: Option<ProcessFn>,
    shutdown: Option<ProcessFn>,
    recover: bool,
}

impl Process {
    /// Creates a process with a run function.
    pub fn new<F, Fut>(name: impl Into<Arc<str>>, run: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ProcessError>> + Send + 'static,
    {
        Self::from_fn(name, process_fn(run))
    }

    /// Creates a process from an already boxed run function.
    pub fn from_fn(name: impl Into<Arc<str>>, run: ProcessFn) -> Self {
        Self {
            name: name.into(),
            run: Some(run),
            shutdown: None,
            recover: false,
        }
    }

    /// Creates a process that only takes part in shutdown.
    pub fn shutdown_only<F, Fut>(name: impl Into<Arc<str>>, shutdown: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ProcessError>> + Send + 'static,
    {
        Self {
            name: name.into(),
            run: None,
            shutdown: Some(process_fn(shutdown)),
            recover: false,
        }
    }

    /// Sets the explicit shutdown function, invoked once during teardown before
    /// the run context is cancelled.
    pub fn with_shutdown<F, Fut>(mut self, shutdown: F) -> Self
    where
        F: Fn(Context) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), ProcessError>> + Send + 'static,
    {
        self.shutdown = Some(process_fn(shutdown));
        self
    }

    /// Catch panics and re-invoke the run function after failures.
    pub fn with_recover(mut self, recover: bool) -> Self {
        self.recover = recover;
        self
    }

    /// Process name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Whether recovery is enabled for this process.
    pub fn recover(&self) -> bool {
        self.recover
    }

    /// Whether the process has a run function.
    pub fn has_run(&self) -> bool {
        self.run.is_some()
    }

    /// Whether the process has an explicit shutdown function.
    pub fn has_shutdown(&self) -> bool {
        self.shutdown.is_some()
    }

    pub(crate) fn shared_name(&self) -> Arc<str> {
        self.name.clone()
    }

    pub(crate) fn run_fn(&self) -> Option<&ProcessFn> {
        self.run.as_ref()
    }

    pub(crate) fn shutdown_fn(&self) -> Option<&ProcessFn> {
        self.shutdown.as_ref()
    }
}

impl fmt::Debug for Process {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Process")
            .field("name", &self.name)
            .field("run", &self.run.is_some())
            .field("shutdown", &self.shutdown.is_some())
            .field("recover", &self.recover)
            .finish()
    }
}
