//! # Startup and shutdown hooks.
//!
//! Hooks run one at a time in ascending `(priority, registration order)`.
//!
//! ```text
//! startup:  for hook: PreHookStart ─► f(ctx) ─► PostHookStart      first error aborts
//! shutdown: for hook: PreHookStop  ─► f(ctx) ─► PostHookStop       errors collected
//! ```

use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::core::recover::call;
use crate::error::{ProcessError, RuntimeError};
use crate::events::{Event, EventKind, EventSink};
use crate::process::ProcessFn;

/// Execution order of a hook; lower runs earlier.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct HookPriority(i32);

impl HookPriority {
    /// Runs before every other priority.
    pub const FIRST: Self = Self(-100);
    /// Priority of hooks registered without one.
    pub const DEFAULT: Self = Self(0);
    /// Runs after every other priority.
    pub const LAST: Self = Self(100);

    /// Smallest accepted value.
    pub const MIN: i32 = -100;
    /// Largest accepted value.
    pub const MAX: i32 = 100;

    /// Validates `priority` against `[MIN, MAX]`.
    pub fn new(priority: i32) -> Result<Self, RuntimeError> {
        if (Self::MIN..=Self::MAX).contains(&priority) {
            Ok(Self(priority))
        } else {
            Err(RuntimeError::InvalidHookPriority { priority })
        }
    }

    /// Raw value.
    pub fn get(self) -> i32 {
        self.0
    }
}

/// Name and priority of a hook.
#[derive(Clone, Debug, Default)]
pub struct HookOptions {
    name: String,
    priority: HookPriority,
}

impl HookOptions {
    /// Unnamed hook with [`HookPriority::DEFAULT`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Name used in events and logs.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Execution priority.
    pub fn with_priority(mut self, priority: HookPriority) -> Self {
        self.priority = priority;
        self
    }
}

struct Hook {
    name: Arc<str>,
    priority: HookPriority,
    order: usize,
    f: ProcessFn,
}

/// Ordered hook list.
#[derive(Default)]
pub(crate) struct Hooks {
    hooks: Vec<Hook>,
}

impl Hooks {
    pub(crate) fn push(&mut self, f: ProcessFn, opts: HookOptions) {
        self.hooks.push(Hook {
            name: opts.name.into(),
            priority: opts.priority,
            order: self.hooks.len(),
            f,
        });
        self.hooks.sort_by_key(|h| (h.priority, h.order));
    }

    #[cfg(test)]
    pub(crate) fn names(&self) -> Vec<String> {
        self.hooks.iter().map(|h| h.name.to_string()).collect()
    }

    /// Runs every hook in order, stopping at the first failure or when `ctx` ends.
    pub(crate) async fn run_startup(
        &self,
        ctx: &Context,
        events: &dyn EventSink,
    ) -> Result<(), RuntimeError> {
        for hook in &self.hooks {
            ctx.check()?;
            emit(events, ctx, EventKind::PreHookStart, &hook.name);
            hook.call(ctx)
                .await
                .map_err(|source| RuntimeError::StartHook {
                    name: hook.name.to_string(),
                    source,
                })?;
            emit(events, ctx, EventKind::PostHookStart, &hook.name);
        }
        Ok(ctx.check()?)
    }

    /// Runs every hook in order and collects failures.
    ///
    /// Hooks not yet started when `ctx` ends are skipped and the cause is recorded.
    pub(crate) async fn run_shutdown(
        &self,
        ctx: &Context,
        events: &dyn EventSink,
    ) -> Vec<RuntimeError> {
        let mut errs = Vec::new();
        for hook in &self.hooks {
            if let Err(cause) = ctx.check() {
                errs.push(RuntimeError::Canceled(cause));
                break;
            }
            emit(events, ctx, EventKind::PreHookStop, &hook.name);
            if let Err(source) = hook.call(ctx).await {
                errs.push(RuntimeError::StopHook {
                    name: hook.name.to_string(),
                    source,
                });
            }
            emit(events, ctx, EventKind::PostHookStop, &hook.name);
        }
        errs
    }
}

impl Hook {
    /// Runs the hook, giving up when `ctx` ends even if the hook ignores it.
    async fn call(&self, ctx: &Context) -> Result<(), ProcessError> {
        tokio::select! {
            res = call(&self.f, ctx.clone()) => res,
            cause = ctx.cancelled() => Err(cause.into()),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.hooks.iter().map(|h| (&h.name, h.priority.get())))
            .finish()
    }
}

fn emit(events: &dyn EventSink, ctx: &Context, kind: EventKind, name: &Arc<str>) {
    events.on_event(ctx, &Event::new(kind).with_name(name.clone()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventLog;
    use crate::process::process_fn;

    fn ok() -> ProcessFn {
        process_fn(|_| async { Ok::<_, ProcessError>(()) })
    }

    fn named(name: &str, priority: HookPriority) -> HookOptions {
        HookOptions::new().with_name(name).with_priority(priority)
    }

    #[test]
    fn test_priority_bounds() {
        assert_eq!(HookPriority::new(-100).unwrap(), HookPriority::FIRST);
        assert_eq!(HookPriority::new(100).unwrap(), HookPriority::LAST);
        assert!(matches!(
            HookPriority::new(101),
            Err(RuntimeError::InvalidHookPriority { priority: 101 })
        ));
        assert!(HookPriority::new(-101).is_err());
    }

    #[test]
    fn test_order_by_priority_then_registration() {
        let mut hooks = Hooks::default();
        hooks.push(ok(), named("default-a", HookPriority::DEFAULT));
        hooks.push(ok(), named("last", HookPriority::LAST));
        hooks.push(ok(), named("first", HookPriority::FIRST));
        hooks.push(ok(), named("default-b", HookPriority::DEFAULT));
        hooks.push(ok(), named("early", HookPriority::new(-5).unwrap()));

        assert_eq!(
            hooks.names(),
            vec!["first", "early", "default-a", "default-b", "last"]
        );
    }

    #[tokio::test]
    async fn test_startup_stops_at_first_failure() {
        let mut hooks = Hooks::default();
        hooks.push(ok(), named("a", HookPriority::DEFAULT));
        hooks.push(
            process_fn(|_| async { Err::<(), _>(ProcessError::fail("no db")) }),
            named("b", HookPriority::DEFAULT),
        );
        hooks.push(ok(), named("c", HookPriority::DEFAULT));
        let log = EventLog::new();

        let err = hooks
            .run_startup(&Context::background(), &log)
            .await
            .unwrap_err();
        assert!(matches!(err, RuntimeError::StartHook { ref name, .. } if name == "b"));
        assert_eq!(
            log.kinds(),
            vec![
                (EventKind::PreHookStart, Some("a".into())),
                (EventKind::PostHookStart, Some("a".into())),
                (EventKind::PreHookStart, Some("b".into())),
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_startup_deadline_aborts_stuck_hook() {
        let mut hooks = Hooks::default();
        hooks.push(
            process_fn(|_| futures::future::pending::<Result<(), ProcessError>>()),
            HookOptions::new(),
        );
        let ctx = Context::background().with_timeout(std::time::Duration::from_secs(1));
        let log = EventLog::new();

        let err = hooks.run_startup(&ctx, &log).await.unwrap_err();
        assert_eq!(err.as_label(), "runtime_start_hook");
    }

    #[tokio::test]
    async fn test_shutdown_collects_every_error() {
        let mut hooks = Hooks::default();
        hooks.push(
            process_fn(|_| async { Err::<(), _>(ProcessError::fail("flush")) }),
            named("a", HookPriority::DEFAULT),
        );
        hooks.push(
            process_fn(|_| async { Err::<(), _>(ProcessError::fail("close")) }),
            named("b", HookPriority::DEFAULT),
        );
        let log = EventLog::new();

        let errs = hooks.run_shutdown(&Context::background(), &log).await;
        assert_eq!(errs.len(), 2);
        assert_eq!(log.kinds().len(), 4);
    }

    #[tokio::test]
    async fn test_panicking_hook_becomes_error() {
        let mut hooks = Hooks::default();
        hooks.push(
            process_fn(|_| -> futures::future::Ready<Result<(), ProcessError>> {
                panic!("hook exploded")
            }),
            named("boom", HookPriority::DEFAULT),
        );
        hooks.push(ok(), named("after", HookPriority::DEFAULT));
        let log = EventLog::new();

        let errs = hooks.run_shutdown(&Context::background(), &log).await;
        assert_eq!(errs.len(), 1);
        match &errs[0] {
            RuntimeError::StopHook { name, source } => {
                assert_eq!(name, "boom");
                assert_eq!(source.as_label(), "process_panicked");
            }
            other => panic!("unexpected error: {other:?}"),
        }
        assert_eq!(log.kinds().len(), 4);
    }
}
