//! Sleep, backoff and jitter policies.
//!
//! ## Contents
//! - [`SleepFn`] / [`ErrorSleepFn`]: how long a supervised loop pauses after success / failure
//! - [`BackoffPolicy`]: delay between restarts of a recovering process
//! - [`JitterPolicy`]: randomization to avoid synchronized wake-ups
//!
//! ## Quick wiring
//! ```text
//! Options { sleep: SleepFn, error_sleep: ErrorSleepFn }
//!      └─► process::runner uses them between iterations
//! AppConfig { restart_backoff: BackoffPolicy }
//!      └─► core::recover uses it between re-invocations
//! ```

mod backoff;
mod jitter;
mod sleep;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use sleep::{
    error_sleep_for, jittered, make_error_sleep_fn, sleep_for, ErrorSleepFn, SleepFn,
    DEFAULT_BACKOFF,
};
