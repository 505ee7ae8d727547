//! # Restart backoff for recovering processes.
//!
//! When a process runs with recovery enabled, the supervisor re-invokes it after a
//! failure or panic. [`BackoffPolicy`] decides how long to wait before each
//! re-invocation: `first × factor^n`, capped at `max`, then jittered.
//!
//! Jitter never feeds back into the next computation; each restart derives its
//! base delay from the restart number alone.
//!
//! # Example
//! ```rust
//! use std::time::Duration;
//! use appvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(100),
//!     max: Duration::from_secs(10),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(100));
//! assert_eq!(backoff.next(1), Duration::from_millis(200));
//! assert_eq!(backoff.next(10), Duration::from_secs(10));
//! ```

use std::time::Duration;

use crate::policies::jitter::JitterPolicy;

/// Delay policy between consecutive restarts of a recovering process.
#[derive(Clone, Copy, Debug)]
pub struct BackoffPolicy {
    /// Delay before the first restart.
    pub first: Duration,
    /// Upper bound on any delay.
    pub max: Duration,
    /// Growth factor per consecutive restart (`1.0` = constant).
    pub factor: f64,
    /// Randomization applied after capping.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// `first = 100ms`, `factor = 2.0`, `max = 30s`, no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(100),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Constant delay `d`, no growth, no jitter.
    pub fn constant(d: Duration) -> Self {
        Self {
            first: d,
            max: d,
            factor: 1.0,
            jitter: JitterPolicy::None,
        }
    }

    /// Delay before restart number `restart` (0-indexed).
    pub fn next(&self, restart: u32) -> Duration {
        let exp = restart.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };
        self.jitter.apply(base)
    }
}
