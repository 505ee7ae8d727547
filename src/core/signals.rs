//! # Dual-context signal handling.
//!
//! [`AppContext`] carries two contexts: the **application** context, which ends
//! when the app should stop serving, and the **termination** context, which ends
//! when the process should exit. The application context is a child of termination.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGQUIT`: cancels the application context only; the process stays up until
//!   termination, e.g. to drain while an orchestrator finishes rerouting traffic
//! - `SIGINT` (Ctrl-C in terminal), `SIGTERM`: cancel termination, and with it both
//!
//! **Windows platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`], treated as an interrupt

use crate::context::Context;

/// A signal the [`AppContext`] reacts to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Signal {
    /// `SIGQUIT`: stop the application, keep the process.
    Quit,
    /// `SIGINT` or Ctrl-C.
    Interrupt,
    /// `SIGTERM`.
    Terminate,
}

/// Application and termination contexts driven by OS signals.
#[derive(Clone, Debug)]
pub struct AppContext {
    termination: Context,
    app: Context,
}

impl AppContext {
    /// Creates both contexts under `parent` without listening to any signal.
    ///
    /// Use [`AppContext::handle`] to drive them, e.g. from tests.
    pub fn new(parent: &Context) -> Self {
        let termination = parent.child();
        let app = termination.child();
        Self { termination, app }
    }

    /// Creates both contexts and spawns a task translating OS signals into cancellation.
    ///
    /// Must be called from within a Tokio runtime. Fails if a signal handler
    /// cannot be registered. The task exits once the termination context ends.
    pub fn from_signals() -> std::io::Result<Self> {
        let ctx = Self::new(&Context::background());
        ctx.monitor()?;
        Ok(ctx)
    }

    /// Applies `signal` to the contexts.
    pub fn handle(&self, signal: Signal) {
        tracing::info!(signal = ?signal, "signal received");
        match signal {
            Signal::Quit => self.app.cancel(),
            Signal::Interrupt | Signal::Terminate => self.termination.cancel(),
        }
    }

    /// Context that ends when the app should stop.
    pub fn app(&self) -> &Context {
        &self.app
    }

    /// Context that ends when the process should exit.
    pub fn termination(&self) -> &Context {
        &self.termination
    }

    #[cfg(unix)]
    fn monitor(&self) -> std::io::Result<()> {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigquit = signal(SignalKind::quit())?;
        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        let ctx = self.clone();
        tokio::spawn(async move {
            loop {
                let sig = tokio::select! {
                    _ = ctx.termination.cancelled() => return,
                    _ = sigquit.recv() => Signal::Quit,
                    _ = sigint.recv() => Signal::Interrupt,
                    _ = sigterm.recv() => Signal::Terminate,
                };
                ctx.handle(sig);
            }
        });
        Ok(())
    }

    #[cfg(not(unix))]
    fn monitor(&self) -> std::io::Result<()> {
        let ctx = self.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = ctx.termination.cancelled() => {}
                res = tokio::signal::ctrl_c() => match res {
                    Ok(()) => ctx.handle(Signal::Interrupt),
                    Err(err) => tracing::error!(error = %err, "ctrl-c listener failed"),
                },
            }
        });
        Ok(())
    }
}
