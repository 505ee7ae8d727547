//! # Injectable time source.
//!
//! Loops and schedulers never call `tokio::time` or `Utc::now()` directly; they go
//! through a [`Clock`] so tests can drive time by hand with [`FakeClock`].
//!
//! [`wait`] and [`wait_until`] combine a clock sleep with context cancellation and
//! are the only blocking primitives the process builders use.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use futures::future::BoxFuture;
use tokio::sync::oneshot;

use crate::context::{Cause, Context};

/// Time source used by loops and schedulers.
pub trait Clock: Send + Sync + 'static {
    /// Current wall-clock instant.
    fn now(&self) -> DateTime<Utc>;

    /// Future that completes once `d` has elapsed on this clock.
    fn sleep(&self, d: Duration) -> BoxFuture<'static, ()>;
}

/// Real clock backed by the system time and Tokio timers.
#[derive(Clone, Copy, Debug, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    fn sleep(&self, d: Duration) -> BoxFuture<'static, ()> {
        Box::pin(tokio::time::sleep(d))
    }
}

/// Shared handle to the default [`SystemClock`].
pub fn system() -> Arc<dyn Clock> {
    Arc::new(SystemClock)
}

/// Manually driven clock.
///
/// Time only moves through [`FakeClock::set_time`] and [`FakeClock::step`]; sleepers
/// whose deadline is reached are woken at that moment.
#[derive(Debug)]
pub struct FakeClock {
    state: Mutex<FakeState>,
}

#[derive(Debug)]
struct FakeState {
    now: DateTime<Utc>,
    waiters: Vec<Waiter>,
}

#[derive(Debug)]
struct Waiter {
    at: DateTime<Utc>,
    tx: oneshot::Sender<()>,
}

impl FakeClock {
    /// Creates a clock frozen at `now`.
    pub fn new<Tz: TimeZone>(now: DateTime<Tz>) -> Self {
        Self {
            state: Mutex::new(FakeState {
                now: now.with_timezone(&Utc),
                waiters: Vec::new(),
            }),
        }
    }

    /// Moves the clock to `t`, waking every sleeper due at or before it.
    pub fn set_time<Tz: TimeZone>(&self, t: DateTime<Tz>) {
        let mut state = self.lock();
        state.now = t.with_timezone(&Utc);
        let now = state.now;

        let (due, pending): (Vec<_>, Vec<_>) =
            state.waiters.drain(..).partition(|w| w.at <= now);
        state.waiters = pending;
        drop(state);

        for waiter in due {
            let _ = waiter.tx.send(());
        }
    }

    /// Advances the clock by `d`.
    pub fn step(&self, d: Duration) {
        let next = self
            .now()
            .checked_add_signed(delta(d))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        self.set_time(next);
    }

    /// Returns `true` while at least one live sleeper is registered.
    pub fn has_waiters(&self) -> bool {
        let mut state = self.lock();
        state.waiters.retain(|w| !w.tx.is_closed());
        !state.waiters.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Clock for FakeClock {
    fn now(&self) -> DateTime<Utc> {
        self.lock().now
    }

    fn sleep(&self, d: Duration) -> BoxFuture<'static, ()> {
        let (tx, rx) = oneshot::channel();
        {
            let mut state = self.lock();
            let at = state
                .now
                .checked_add_signed(delta(d))
                .unwrap_or(DateTime::<Utc>::MAX_UTC);
            if at <= state.now {
                return Box::pin(async {});
            }
            state.waiters.push(Waiter { at, tx });
        }
        Box::pin(async move {
            let _ = rx.await;
        })
    }
}

/// Sleeps for `d` on `clock`, returning early with the cause if `ctx` ends.
///
/// A zero duration does not sleep; it only reports whether `ctx` has already ended.
pub async fn wait(ctx: &Context, clock: &dyn Clock, d: Duration) -> Result<(), Cause> {
    if d.is_zero() {
        return ctx.check();
    }
    tokio::select! {
        biased;
        cause = ctx.cancelled() => Err(cause),
        _ = clock.sleep(d) => Ok(()),
    }
}

/// Sleeps until `t` on `clock`, returning early with the cause if `ctx` ends.
pub async fn wait_until<Tz: TimeZone>(
    ctx: &Context,
    clock: &dyn Clock,
    t: &DateTime<Tz>,
) -> Result<(), Cause> {
    let d = (t.with_timezone(&Utc) - clock.now())
        .to_std()
        .unwrap_or(Duration::ZERO);
    wait(ctx, clock, d).await
}

/// Converts a std duration into a chrono delta, saturating on overflow.
pub(crate) fn delta(d: Duration) -> chrono::TimeDelta {
    chrono::TimeDelta::from_std(d).unwrap_or(chrono::TimeDelta::MAX)
}
