//! # Context gates: the right to run.
//!
//! Before every iteration a supervised loop asks its [`ContextGate`] for a [`Lease`].
//! The gate may block (e.g. until this instance becomes leader) and hands back a
//! run-scoped [`Context`]. Dropping the lease cancels that context and runs the
//! gate's release callback.
//!
//! ```text
//! outer ctx ──► gate.acquire(ctx) ──► Lease{ run ctx } ──► unit(run ctx) ──► sleep(run ctx) ──► drop(Lease)
//! ```
//!
//! A [`RoleGate`] maps a role name to a gate; scheduled processes look up their gate
//! by role. [`Ungated`] grants every request immediately.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;

use crate::context::Context;
use crate::error::ProcessError;

type ReleaseFn = Box<dyn FnOnce() + Send>;

/// Run-scoped context handed out by a [`ContextGate`].
///
/// The context is cancelled when the lease is dropped.
pub struct Lease {
    ctx: Context,
    on_release: Option<ReleaseFn>,
}

impl Lease {
    /// Wraps a run context with no release callback.
    pub fn new(ctx: Context) -> Self {
        Self {
            ctx,
            on_release: None,
        }
    }

    /// Wraps a run context and a callback invoked after the context is cancelled.
    pub fn with_release<F>(ctx: Context, on_release: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            ctx,
            on_release: Some(Box::new(on_release)),
        }
    }

    /// Run-scoped context.
    pub fn context(&self) -> &Context {
        &self.ctx
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        self.ctx.cancel();
        if let Some(release) = self.on_release.take() {
            release();
        }
    }
}

impl fmt::Debug for Lease {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lease")
            .field("ctx", &self.ctx)
            .field("on_release", &self.on_release.is_some())
            .finish()
    }
}

/// Grants run-scoped contexts, possibly blocking until allowed.
///
/// Implementations should derive the lease context from `ctx` so that outer
/// cancellation reaches the running unit. An error is treated as a failed iteration
/// and goes through the loop's backoff.
#[async_trait]
pub trait ContextGate: Send + Sync + 'static {
    /// Waits for permission to run and returns the run context.
    async fn acquire(&self, ctx: &Context) -> Result<Lease, ProcessError>;
}

/// Resolves the gate for a role.
pub trait RoleGate: Send + Sync + 'static {
    /// Gate guarding `role`.
    fn gate(&self, role: &str) -> Arc<dyn ContextGate>;
}

impl<F> RoleGate for F
where
    F: Fn(&str) -> Arc<dyn ContextGate> + Send + Sync + 'static,
{
    fn gate(&self, role: &str) -> Arc<dyn ContextGate> {
        self(role)
    }
}

/// Gate that always grants a child of the caller's context.
#[derive(Clone, Copy, Debug, Default)]
pub struct Ungated;

#[async_trait]
impl ContextGate for Ungated {
    async fn acquire(&self, ctx: &Context) -> Result<Lease, ProcessError> {
        ctx.check()?;
        Ok(Lease::new(ctx.child()))
    }
}

impl RoleGate for Ungated {
    fn gate(&self, _role: &str) -> Arc<dyn ContextGate> {
        Arc::new(Ungated)
    }
}
