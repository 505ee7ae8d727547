//! # Application configuration.
//!
//! [`AppConfig`] holds the supervisor-wide settings passed to [`App::new`](crate::App::new).
//!
//! ## Sentinel values
//! - `startup_timeout = 0s` → the 15s default
//! - `shutdown_timeout = 0s` → the 15s default
//! - `process_file = None` → no process file is written

use std::path::PathBuf;
use std::time::Duration;

use crate::policies::BackoffPolicy;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const PROCESS_FILE_NAME: &str = "appvisor.pid";

/// Supervisor configuration.
///
/// ## Field semantics
/// - `startup_timeout`: deadline for all startup hooks together
/// - `shutdown_timeout`: deadline for explicit shutdowns plus process exit; shutdown
///   hooks get a fresh deadline of the same length
/// - `process_file`: marker file holding the pid while the app runs
/// - `recover_all`: treat every process as recovering
/// - `restart_backoff`: delay between invocations of a recovering process
///
/// ## Notes
/// All fields are public. Prefer the accessors, which apply the sentinel rules.
#[derive(Clone, Debug)]
pub struct AppConfig {
    /// Deadline for running the startup hooks.
    pub startup_timeout: Duration,

    /// Deadline for stopping processes, and separately for the shutdown hooks.
    pub shutdown_timeout: Duration,

    /// Path of the process file; see [`AppConfig::use_process_file`].
    pub process_file: Option<PathBuf>,

    /// Recover every process, regardless of its own flag.
    pub recover_all: bool,

    /// Delay policy between re-invocations of a recovering process.
    ///
    /// The restart counter resets after an invocation that ran longer than `max`.
    pub restart_backoff: BackoffPolicy,
}

impl AppConfig {
    /// Writes the process file to `<tmp>/appvisor.pid`.
    pub fn use_process_file(mut self) -> Self {
        self.process_file = Some(std::env::temp_dir().join(PROCESS_FILE_NAME));
        self
    }

    /// Startup deadline with the sentinel applied.
    #[inline]
    pub fn startup_timeout(&self) -> Duration {
        non_zero_or_default(self.startup_timeout)
    }

    /// Shutdown deadline with the sentinel applied.
    #[inline]
    pub fn shutdown_timeout(&self) -> Duration {
        non_zero_or_default(self.shutdown_timeout)
    }
}

impl Default for AppConfig {
    /// Default configuration:
    ///
    /// - `startup_timeout = 15s`
    /// - `shutdown_timeout = 15s`
    /// - `process_file = None`
    /// - `recover_all = false`
    /// - `restart_backoff = BackoffPolicy::default()` (100ms doubling up to 30s)
    fn default() -> Self {
        Self {
            startup_timeout: DEFAULT_TIMEOUT,
            shutdown_timeout: DEFAULT_TIMEOUT,
            process_file: None,
            recover_all: false,
            restart_backoff: BackoffPolicy::default(),
        }
    }
}

fn non_zero_or_default(d: Duration) -> Duration {
    if d.is_zero() {
        DEFAULT_TIMEOUT
    } else {
        d
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_timeouts_use_default() {
        let cfg = AppConfig {
            startup_timeout: Duration::ZERO,
            shutdown_timeout: Duration::from_secs(3),
            ..AppConfig::default()
        };
        assert_eq!(cfg.startup_timeout(), Duration::from_secs(15));
        assert_eq!(cfg.shutdown_timeout(), Duration::from_secs(3));
    }

    #[test]
    fn test_use_process_file_points_into_tmp() {
        let cfg = AppConfig::default().use_process_file();
        let path = cfg.process_file.unwrap();
        assert!(path.starts_with(std::env::temp_dir()));
        assert!(path.ends_with("appvisor.pid"));
    }
}
