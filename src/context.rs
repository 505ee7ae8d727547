//! # Cancellable run contexts.
//!
//! A [`Context`] is a [`CancellationToken`] that remembers *why* it ended.
//! Every suspension point in the crate waits on one, and every loop returns the
//! context's [`Cause`] when it stops, so callers can tell an explicit cancel from
//! an expired deadline.
//!
//! ```text
//! background ──► child ──► with_timeout(15s)
//!     │            │            │
//!  cancel()     cancel()     deadline fires
//!     │            │            │
//!     ▼            ▼            ▼
//!  Canceled     Canceled     DeadlineExceeded   (propagates to every descendant)
//! ```
//!
//! ## Rules
//! - A context ends at most once; the first cause wins.
//! - A descendant cancelled through its parent reports the parent's cause.
//! - Deadlines are inherited: a child never outlives its parent's deadline.

use std::fmt;
use std::sync::{Arc, OnceLock};
use std::time::Duration;

use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

/// Reason a [`Context`] ended.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Cause {
    /// Explicit cancellation (signal, shutdown, failed sibling).
    #[error("context canceled")]
    Canceled,
    /// The context's deadline passed.
    #[error("context deadline exceeded")]
    DeadlineExceeded,
}

impl Cause {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            Cause::Canceled => "context_canceled",
            Cause::DeadlineExceeded => "context_deadline_exceeded",
        }
    }
}

/// Cancellable context with a termination cause and an optional deadline.
///
/// Cloning is cheap; clones share the same cancellation state.
#[derive(Clone)]
pub struct Context {
    inner: Arc<Inner>,
}

struct Inner {
    token: CancellationToken,
    cause: OnceLock<Cause>,
    parent: Option<Context>,
    deadline: Option<Instant>,
}

impl Context {
    /// Root context: never ends unless cancelled explicitly.
    pub fn background() -> Self {
        Self::from_parts(CancellationToken::new(), None, None)
    }

    /// Derives a child that ends when `self` ends or when cancelled on its own.
    pub fn child(&self) -> Self {
        Self::from_parts(
            self.inner.token.child_token(),
            Some(self.clone()),
            self.inner.deadline,
        )
    }

    /// Derives a child that additionally ends with [`Cause::DeadlineExceeded`] after `timeout`.
    ///
    /// Must be called from within a Tokio runtime (a timer task is spawned).
    pub fn with_timeout(&self, timeout: Duration) -> Self {
        self.with_deadline(Instant::now() + timeout)
    }

    /// Derives a child that ends with [`Cause::DeadlineExceeded`] at `deadline`.
    ///
    /// Must be called from within a Tokio runtime (a timer task is spawned).
    pub fn with_deadline(&self, deadline: Instant) -> Self {
        let deadline = match self.inner.deadline {
            Some(parent) if parent < deadline => parent,
            _ => deadline,
        };
        let ctx = Self::from_parts(
            self.inner.token.child_token(),
            Some(self.clone()),
            Some(deadline),
        );

        let timer = ctx.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = tokio::time::sleep_until(deadline) => timer.cancel_with(Cause::DeadlineExceeded),
                _ = timer.inner.token.cancelled() => {}
            }
        });
        ctx
    }

    /// Cancels this context and all descendants with [`Cause::Canceled`].
    pub fn cancel(&self) {
        self.cancel_with(Cause::Canceled);
    }

    pub(crate) fn cancel_with(&self, cause: Cause) {
        if self.inner.token.is_cancelled() {
            return;
        }
        let _ = self.inner.cause.set(cause);
        self.inner.token.cancel();
    }

    /// Returns the termination cause, or `None` while the context is alive.
    pub fn err(&self) -> Option<Cause> {
        if self.inner.token.is_cancelled() {
            Some(self.cause())
        } else {
            None
        }
    }

    /// `Ok(())` while alive, `Err(cause)` once ended. Handy with `?`.
    pub fn check(&self) -> Result<(), Cause> {
        match self.err() {
            Some(cause) => Err(cause),
            None => Ok(()),
        }
    }

    /// Returns `true` once the context has ended.
    pub fn is_cancelled(&self) -> bool {
        self.inner.token.is_cancelled()
    }

    /// Completes when the context ends, yielding the cause.
    pub async fn cancelled(&self) -> Cause {
        self.inner.token.cancelled().await;
        self.cause()
    }

    /// Deadline inherited or set on this context.
    pub fn deadline(&self) -> Option<Instant> {
        self.inner.deadline
    }

    /// Underlying token, for interop with code that speaks `tokio_util` directly.
    pub fn token(&self) -> CancellationToken {
        self.inner.token.clone()
    }

    fn from_parts(
        token: CancellationToken,
        parent: Option<Context>,
        deadline: Option<Instant>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                token,
                cause: OnceLock::new(),
                parent,
                deadline,
            }),
        }
    }

    fn cause(&self) -> Cause {
        if let Some(cause) = self.inner.cause.get() {
            return *cause;
        }
        match &self.inner.parent {
            Some(parent) if parent.is_cancelled() => parent.cause(),
            _ => Cause::Canceled,
        }
    }
}

impl Default for Context {
    fn default() -> Self {
        Self::background()
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("err", &self.err())
            .field("deadline", &self.inner.deadline)
            .finish()
    }
}
