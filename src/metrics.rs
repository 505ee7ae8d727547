//! # Metrics sink.
//!
//! Loops, schedulers and the supervisor report through an injected [`Metrics`]
//! implementation, keyed by process name. Nothing is registered globally; wire the
//! trait to whatever exporter the service already uses.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Receiver of per-process measurements.
///
/// Implementations must be cheap and non-blocking; calls happen inline on process tasks.
pub trait Metrics: Send + Sync + 'static {
    /// A process iteration failed with a non-cancellation error.
    fn process_error(&self, process: &str) {
        let _ = process;
    }

    /// A scheduler picked an overdue run; `lag` is how far behind the cursor is.
    fn schedule_cursor_lag(&self, process: &str, lag: Duration) {
        let _ = (process, lag);
    }
}

/// Discards everything.
#[derive(Clone, Copy, Debug, Default)]
pub struct NoopMetrics;

impl Metrics for NoopMetrics {}

/// Shared handle to [`NoopMetrics`].
pub fn noop() -> Arc<dyn Metrics> {
    Arc::new(NoopMetrics)
}

/// In-memory counters, useful in tests and for exposing a debug endpoint.
#[derive(Debug, Default)]
pub struct MemoryMetrics {
    errors: Mutex<HashMap<String, u64>>,
    lag: Mutex<HashMap<String, Duration>>,
}

impl MemoryMetrics {
    /// Creates an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Error count recorded for `process`.
    pub fn errors(&self, process: &str) -> u64 {
        self.errors
            .lock()
            .map(|m| m.get(process).copied().unwrap_or(0))
            .unwrap_or(0)
    }

    /// Last cursor lag recorded for `process`.
    pub fn cursor_lag(&self, process: &str) -> Option<Duration> {
        self.lag
            .lock()
            .ok()
            .and_then(|m| m.get(process).copied())
    }
}

impl Metrics for MemoryMetrics {
    fn process_error(&self, process: &str) {
        if let Ok(mut m) = self.errors.lock() {
            *m.entry(process.to_string()).or_default() += 1;
        }
    }

    fn schedule_cursor_lag(&self, process: &str, lag: Duration) {
        if let Ok(mut m) = self.lag.lock() {
            m.insert(process.to_string(), lag);
        }
    }
}
