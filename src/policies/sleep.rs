//! # Loop sleep policies.
//!
//! A supervised loop asks a [`SleepFn`] how long to pause after a successful
//! iteration and an [`ErrorSleepFn`] how long to back off after a failed one.
//! Policies only compute durations; the loop does the (cancellable) waiting.
//!
//! ```text
//! errCount:                     1    2    3    4    5    6   ...
//! error_sleep_for(1s)           1s   1s   1s   1s   1s   1s
//! make_error_sleep_fn(3,1s,[])  0    0    0    1s   1s   1s
//! make_error_sleep_fn(2,1s,[1,2,3])
//!                               0    0    1s   2s   3s   3s
//! ```

use std::sync::Arc;
use std::time::Duration;

use crate::error::ProcessError;
use crate::policies::jitter::JitterPolicy;

/// Sleep after a successful iteration.
pub type SleepFn = Arc<dyn Fn() -> Duration + Send + Sync>;

/// Sleep after a failed iteration, given the 1-based consecutive error count and the error.
pub type ErrorSleepFn = Arc<dyn Fn(u32, &ProcessError) -> Duration + Send + Sync>;

/// Escalation table commonly paired with [`make_error_sleep_fn`].
pub const DEFAULT_BACKOFF: [u32; 7] = [1, 2, 5, 10, 20, 50, 100];

/// Always sleeps `d` after success.
pub fn sleep_for(d: Duration) -> SleepFn {
    Arc::new(move || d)
}

/// Always sleeps `d` after an error.
pub fn error_sleep_for(d: Duration) -> ErrorSleepFn {
    Arc::new(move |_, _| d)
}

/// Retries immediately for the first `retries` errors, then sleeps `d`, scaled by
/// `backoff[count - 1 - retries]` when a table is given (saturating at its last entry).
pub fn make_error_sleep_fn(retries: u32, d: Duration, backoff: &[u32]) -> ErrorSleepFn {
    let backoff = backoff.to_vec();
    Arc::new(move |count, _| {
        if count <= retries {
            return Duration::ZERO;
        }
        let Some(last) = backoff.len().checked_sub(1) else {
            return d;
        };
        let idx = ((count - 1 - retries) as usize).min(last);
        d.saturating_mul(backoff[idx])
    })
}

/// Applies `jitter` on top of another error-sleep policy.
pub fn jittered(inner: ErrorSleepFn, jitter: JitterPolicy) -> ErrorSleepFn {
    Arc::new(move |count, err| jitter.apply(inner(count, err)))
}
