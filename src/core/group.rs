//! # Error group over process tasks.
//!
//! Every process task runs on one [`JoinSet`] sharing a group context. The first
//! failure is recorded and cancels the group context, which stops every sibling.
//!
//! ```text
//! spawn(name, fut) ──► JoinSet ──► fut.await
//!                                    ├─ Ok                → done
//!                                    └─ Err(e) | panic    → record first non-cancel e
//!                                                            group ctx.cancel()
//! ```

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::task::JoinSet;
use tracing::Instrument;

use crate::context::Context;
use crate::core::recover::catch;
use crate::error::{ProcessError, RuntimeError};

/// Names of spawned tasks and whether each has exited.
#[derive(Clone, Debug, Default)]
pub(crate) struct Running {
    members: Arc<Mutex<Vec<(Arc<str>, Arc<AtomicBool>)>>>,
}

impl Running {
    pub(crate) fn track(&self, name: Arc<str>) -> Arc<AtomicBool> {
        let done = Arc::new(AtomicBool::new(false));
        self.lock().push((name, done.clone()));
        done
    }

    /// Names of tasks that have not exited, in spawn order.
    pub(crate) fn names(&self) -> Vec<String> {
        self.lock()
            .iter()
            .filter(|(_, done)| !done.load(Ordering::Acquire))
            .map(|(name, _)| name.to_string())
            .collect()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<(Arc<str>, Arc<AtomicBool>)>> {
        self.members
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Tasks sharing one context and one first-error slot.
pub(crate) struct Group {
    ctx: Context,
    set: JoinSet<()>,
    first: Arc<Mutex<Option<RuntimeError>>>,
    running: Running,
}

impl Group {
    /// Creates an empty group whose context is a child of `parent`.
    pub(crate) fn new(parent: &Context) -> Self {
        Self {
            ctx: parent.child(),
            set: JoinSet::new(),
            first: Arc::new(Mutex::new(None)),
            running: Running::default(),
        }
    }

    /// Context handed to every task; ends on the first failure.
    pub(crate) fn context(&self) -> &Context {
        &self.ctx
    }

    /// Shared view of which tasks are still running.
    pub(crate) fn running(&self) -> Running {
        self.running.clone()
    }

    /// Spawns `fut` inside a `process` span named `name`.
    pub(crate) fn spawn<F>(&mut self, name: Arc<str>, fut: F)
    where
        F: Future<Output = Result<(), ProcessError>> + Send + 'static,
    {
        let done = self.running.track(name.clone());
        let ctx = self.ctx.clone();
        let first = self.first.clone();
        let span = tracing::info_span!("process", process = %name);

        self.set.spawn(
            async move {
                let res = catch(fut).await;
                done.store(true, Ordering::Release);
                if let Err(source) = res {
                    if !source.is_canceled() {
                        let mut slot = first.lock().unwrap_or_else(|p| p.into_inner());
                        if slot.is_none() {
                            *slot = Some(RuntimeError::Process {
                                name: name.to_string(),
                                source,
                            });
                        }
                    }
                    ctx.cancel();
                }
            }
            .instrument(span),
        );
    }

    /// Waits until every task exits and returns the first recorded failure.
    ///
    /// Cancel-safe: dropping the future leaves unfinished tasks in the group.
    pub(crate) async fn wait(&mut self) -> Option<RuntimeError> {
        while let Some(res) = self.set.join_next().await {
            if let Err(err) = res {
                tracing::error!(error = %err, "process task aborted");
            }
        }
        self.first
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take()
    }
}
