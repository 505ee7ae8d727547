//! # App: owns processes and hooks, drives launch and shutdown.
//!
//! ## Lifecycle
//! ```text
//! New ──launch()──► Starting ──hooks ok──► Running ──shutdown()──► Terminating ──► Terminated
//!                       │
//!                       └──hook error / pid file taken──► LaunchFailed
//! ```
//!
//! ## Launch
//! ```text
//! create process file (optional)
//! AppStartup
//! startup hooks                     under startup_timeout, first error aborts
//! group ctx = launch ctx.child()
//! for process with run:
//!     ProcessStart, spawn on group  (recovering if process.recover || cfg.recover_all)
//! AppRunning
//! ```
//!
//! ## Shutdown
//! ```text
//! AppTerminating                    deadline = shutdown_timeout
//! phase 1: explicit shutdowns, all concurrently
//! phase 2: cancel group ctx, wait for every task
//!          deadline passed → ShutdownTimeout { running }
//! shutdown hooks                    fresh deadline = shutdown_timeout
//! AppTerminated
//! ```
//!
//! The first collected error is returned; the rest are logged.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use appvisor::{looping, process_fn, App, AppConfig, Context, Options, ProcessError};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let mut app = App::new(AppConfig::default());
//!     app.add_process(looping(
//!         process_fn(|_ctx: Context| async { Ok::<_, ProcessError>(()) }),
//!         Options::new().with_name("ticker").with_sleep(Duration::from_millis(10)),
//!     ));
//!
//!     app.launch(&Context::background()).await?;
//!     tokio::time::sleep(Duration::from_millis(50)).await;
//!     app.shutdown().await?;
//!     Ok(())
//! }
//! ```

use std::fmt;
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex, OnceLock};

use tokio::task::JoinSet;
use tracing::Instrument;

use crate::context::{Cause, Context};
use crate::core::config::AppConfig;
use crate::core::group::{Group, Running};
use crate::core::hooks::{HookOptions, Hooks};
use crate::core::pid_file;
use crate::core::recover::{call, Invoker};
use crate::core::signals::AppContext;
use crate::error::RuntimeError;
use crate::events::{self, Event, EventKind, EventSink};
use crate::metrics::{self, Metrics};
use crate::process::{Process, ProcessFn};

/// Lifecycle state of an [`App`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum AppState {
    /// Built, not launched.
    New,
    /// Running startup hooks.
    Starting,
    /// Processes dispatched.
    Running,
    /// `shutdown` in progress.
    Terminating,
    /// `shutdown` finished.
    Terminated,
    /// `launch` failed; no process was started.
    LaunchFailed,
}

/// Ticket returned by [`App::add_process`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ProcessId(usize);

impl ProcessId {
    /// Registration index.
    pub fn index(self) -> usize {
        self.0
    }
}

/// Maps a shutdown error before the exit code is chosen; `None` clears it.
pub type ShutdownErrHandler =
    Arc<dyn Fn(&Context, RuntimeError) -> Option<RuntimeError> + Send + Sync>;

struct Launched {
    ctx: Context,
    running: Running,
}

/// Application supervisor.
///
/// Configure with `&mut self` methods, then share (e.g. in an `Arc`) and drive with
/// [`App::launch`] / [`App::shutdown`], or hand control to [`App::run`].
pub struct App {
    cfg: AppConfig,
    processes: Vec<Process>,
    startup: Hooks,
    shutdown: Hooks,
    on_shutdown_err: Option<ShutdownErrHandler>,
    events: Arc<dyn EventSink>,
    metrics: Arc<dyn Metrics>,
    state: Mutex<AppState>,
    launched: OnceLock<Launched>,
    group: tokio::sync::Mutex<Option<Group>>,
}

impl App {
    /// Creates an app with no processes, no hooks and a discarding event sink.
    pub fn new(cfg: AppConfig) -> Self {
        Self {
            cfg,
            processes: Vec::new(),
            startup: Hooks::default(),
            shutdown: Hooks::default(),
            on_shutdown_err: None,
            events: events::discard(),
            metrics: metrics::noop(),
            state: Mutex::new(AppState::New),
            launched: OnceLock::new(),
            group: tokio::sync::Mutex::new(None),
        }
    }

    /// Sink receiving every lifecycle event.
    pub fn with_events(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = events;
        self
    }

    /// Sink receiving process failure counts.
    pub fn with_metrics(mut self, metrics: Arc<dyn Metrics>) -> Self {
        self.metrics = metrics;
        self
    }

    /// Configuration in effect.
    pub fn config(&self) -> &AppConfig {
        &self.cfg
    }

    /// Registers a process. Processes added after launch are never started.
    pub fn add_process(&mut self, process: Process) -> ProcessId {
        if self.state() != AppState::New {
            tracing::warn!(process = %process.name(), "process added after launch; it will not run");
        }
        self.processes.push(process);
        ProcessId(self.processes.len() - 1)
    }

    /// Looks up a registered process.
    pub fn process(&self, id: ProcessId) -> Option<&Process> {
        self.processes.get(id.0)
    }

    /// Registers a startup hook.
    pub fn on_startup(&mut self, f: ProcessFn, opts: HookOptions) {
        self.startup.push(f, opts);
    }

    /// Registers a shutdown hook.
    pub fn on_shutdown(&mut self, f: ProcessFn, opts: HookOptions) {
        self.shutdown.push(f, opts);
    }

    /// Installs the handler [`App::run`] passes shutdown errors through.
    ///
    /// It is called with the termination context, and only while that context is alive.
    pub fn on_shutdown_err<F>(&mut self, f: F)
    where
        F: Fn(&Context, RuntimeError) -> Option<RuntimeError> + Send + Sync + 'static,
    {
        self.on_shutdown_err = Some(Arc::new(f));
    }

    /// Current lifecycle state.
    pub fn state(&self) -> AppState {
        *self.state.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Names of processes whose task has not exited yet; empty before launch.
    pub fn running_processes(&self) -> Vec<String> {
        self.launched
            .get()
            .map(|l| l.running.names())
            .unwrap_or_default()
    }

    /// Resolves when the group context ends: the launch context was cancelled,
    /// a process failed, or shutdown began.
    ///
    /// Shutdown has not finished when this returns; call [`App::shutdown`] next.
    pub async fn wait_for_shutdown(&self) -> Result<Cause, RuntimeError> {
        let launched = self.launched.get().ok_or(RuntimeError::NotLaunched)?;
        Ok(launched.ctx.cancelled().await)
    }

    /// Runs startup hooks and starts every process.
    ///
    /// `ctx` bounds the startup hooks and is the parent of every process context.
    /// Returns `ctx`'s cause if it ended while launching; processes are running
    /// by then and [`App::shutdown`] must still be called.
    pub async fn launch(&self, ctx: &Context) -> Result<(), RuntimeError> {
        self.transition(&[AppState::New], AppState::Starting)
            .map_err(|_| RuntimeError::AlreadyLaunched)?;

        if let Some(path) = &self.cfg.process_file {
            if let Err(err) = pid_file::create(path) {
                self.set_state(AppState::LaunchFailed);
                return Err(err);
            }
        }

        self.emit(ctx, EventKind::AppStartup);

        let startup_ctx = ctx.with_timeout(self.cfg.startup_timeout());
        let res = self.startup.run_startup(&startup_ctx, self.events.as_ref()).await;
        startup_ctx.cancel();
        if let Err(err) = res {
            self.set_state(AppState::LaunchFailed);
            if let Some(path) = &self.cfg.process_file {
                pid_file::remove(path);
            }
            return Err(err);
        }

        let mut group = Group::new(ctx);
        for p in &self.processes {
            if let Some(f) = p.run_fn() {
                self.dispatch(&mut group, p, f.clone());
            }
        }

        let _ = self.launched.set(Launched {
            ctx: group.context().clone(),
            running: group.running(),
        });
        *self.group.lock().await = Some(group);
        self.set_state(AppState::Running);
        self.emit(ctx, EventKind::AppRunning);
        tracing::info!(processes = self.processes.len(), "app running");

        Ok(ctx.check()?)
    }

    fn dispatch(&self, group: &mut Group, p: &Process, f: ProcessFn) {
        let ctx = group.context().clone();
        let invoker = Invoker {
            name: p.shared_name(),
            f,
            events: self.events.clone(),
        };
        let backoff = (p.recover() || self.cfg.recover_all).then_some(self.cfg.restart_backoff);
        let metrics = self.metrics.clone();

        invoker.emit(&ctx, EventKind::ProcessStart);
        group.spawn(p.shared_name(), async move {
            let res = match backoff {
                Some(backoff) => invoker.recovering(&ctx, backoff).await,
                None => invoker.invoke(&ctx).await,
            };
            if let Err(err) = &res {
                if !err.is_canceled() {
                    metrics.process_error(&invoker.name);
                    tracing::error!(error = %err, "process exited with error");
                }
            }
            res
        });
    }

    /// Stops every process and runs the shutdown hooks.
    ///
    /// Runs under its own deadline, independent of the launch context. Calling it
    /// again after it started returns `Ok(())` immediately.
    pub async fn shutdown(&self) -> Result<(), RuntimeError> {
        match self.transition(&[AppState::Running], AppState::Terminating) {
            Ok(_) => {}
            Err(AppState::Terminating | AppState::Terminated) => return Ok(()),
            Err(_) => return Err(RuntimeError::NotLaunched),
        }

        let timeout = self.cfg.shutdown_timeout();
        let ctx = Context::background().with_timeout(timeout);
        self.emit(&ctx, EventKind::AppTerminating);
        tracing::info!(timeout = ?timeout, "app terminating");

        let mut errs = self.stop_explicit(&ctx).await;

        if let Some(launched) = self.launched.get() {
            launched.ctx.cancel();
        }
        // No deadline left to wait for the group once explicit shutdowns used it up.
        if ctx.is_cancelled() {
            tracing::warn!(
                running = ?self.running_processes(),
                "shutdown deadline passed; not waiting for processes"
            );
        } else if let Some(group) = self.group.lock().await.as_mut() {
            tokio::select! {
                biased;
                first = group.wait() => errs.extend(first),
                _ = ctx.cancelled() => errs.push(RuntimeError::ShutdownTimeout {
                    timeout,
                    running: self.running_processes(),
                }),
            }
        }

        let hook_ctx = Context::background().with_timeout(timeout);
        errs.extend(self.shutdown.run_shutdown(&hook_ctx, self.events.as_ref()).await);

        self.set_state(AppState::Terminated);
        self.emit(&hook_ctx, EventKind::AppTerminated);
        hook_ctx.cancel();
        ctx.cancel();

        let mut errs = errs.into_iter();
        let first = errs.next();
        for err in errs {
            tracing::error!(error = %err, "shutdown error");
        }
        match first {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }

    /// Calls every explicit shutdown concurrently and collects their failures.
    ///
    /// Gives up at the deadline with a [`RuntimeError::ShutdownTimeout`] naming the
    /// processes whose shutdown had not returned.
    async fn stop_explicit(&self, ctx: &Context) -> Vec<RuntimeError> {
        let mut set = JoinSet::new();
        let pending = Running::default();
        for p in &self.processes {
            if let Some(f) = p.shutdown_fn() {
                let (name, f, task_ctx) = (p.shared_name(), f.clone(), ctx.clone());
                let done = pending.track(name.clone());
                let span = tracing::info_span!("process", process = %name);
                set.spawn(
                    async move {
                        let res = call(&f, task_ctx).await;
                        done.store(true, Ordering::Release);
                        (name, res)
                    }
                    .instrument(span),
                );
            }
        }

        let mut errs = Vec::new();
        loop {
            tokio::select! {
                biased;
                joined = set.join_next() => match joined {
                    None => break,
                    Some(Ok((name, Err(source)))) if !source.is_canceled() => {
                        errs.push(RuntimeError::ProcessShutdown {
                            name: name.to_string(),
                            source,
                        });
                    }
                    Some(Ok(_)) => {}
                    Some(Err(err)) => tracing::error!(error = %err, "shutdown task aborted"),
                },
                _ = ctx.cancelled() => {
                    errs.push(RuntimeError::ShutdownTimeout {
                        timeout: self.cfg.shutdown_timeout(),
                        running: pending.names(),
                    });
                    break;
                }
            }
        }
        errs
    }

    /// Launches under OS signals, waits, shuts down and returns the exit code.
    ///
    /// See [`AppContext`] for how signals map to contexts.
    pub async fn run(&self) -> i32 {
        match AppContext::from_signals() {
            Ok(ctx) => self.run_with(&ctx).await,
            Err(err) => {
                tracing::error!(error = %err, "failed to install signal handlers");
                1
            }
        }
    }

    /// [`App::run`] with caller-provided contexts.
    ///
    /// Exit code 0 after a clean shutdown, 1 when launch fails or a shutdown error
    /// survives the [`App::on_shutdown_err`] handler. Returns only once the
    /// termination context has ended.
    pub async fn run_with(&self, ctx: &AppContext) -> i32 {
        if let Err(err) = self.launch(ctx.app()).await {
            if self.state() != AppState::Running {
                tracing::error!(error = %err, "app launch failed");
                return 1;
            }
            tracing::info!(error = %err, "app context ended during launch");
        }

        if let Err(err) = self.wait_for_shutdown().await {
            tracing::error!(error = %err, "app not running");
        }

        let mut exit = 0;
        if let Err(err) = self.shutdown().await {
            let err = match &self.on_shutdown_err {
                Some(handler) if !ctx.termination().is_cancelled() => {
                    handler(ctx.termination(), err)
                }
                _ => Some(err),
            };
            if let Some(err) = err {
                tracing::error!(error = %err, "app shutdown failed");
                exit = 1;
            }
        }

        if let Some(path) = &self.cfg.process_file {
            pid_file::remove(path);
        }

        ctx.termination().cancelled().await;
        tracing::info!(exit_code = exit, "app terminated");
        exit
    }

    fn emit(&self, ctx: &Context, kind: EventKind) {
        self.events.on_event(ctx, &Event::new(kind));
    }

    fn set_state(&self, state: AppState) {
        *self.state.lock().unwrap_or_else(|p| p.into_inner()) = state;
    }

    /// Moves to `to` if the current state is one of `from`; otherwise returns the current state.
    fn transition(&self, from: &[AppState], to: AppState) -> Result<AppState, AppState> {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        if from.contains(&state) {
            let prev = *state;
            *state = to;
            Ok(prev)
        } else {
            Err(*state)
        }
    }
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("state", &self.state())
            .field("processes", &self.processes)
            .field("startup", &self.startup)
            .field("shutdown", &self.shutdown)
            .finish_non_exhaustive()
    }
}
