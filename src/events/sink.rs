use std::sync::{Arc, Mutex};

use crate::context::Context;
use crate::events::{Event, EventKind};

/// Receiver of lifecycle events.
///
/// Called synchronously, possibly from several process tasks at once. Must not
/// block: buffer internally if delivery is slow.
pub trait EventSink: Send + Sync + 'static {
    /// Handles one event.
    fn on_event(&self, ctx: &Context, event: &Event);
}

impl<F> EventSink for F
where
    F: Fn(&Context, &Event) + Send + Sync + 'static,
{
    fn on_event(&self, ctx: &Context, event: &Event) {
        self(ctx, event)
    }
}

/// Ignores every event.
pub(crate) fn discard() -> Arc<dyn EventSink> {
    Arc::new(|_: &Context, _: &Event| {})
}

/// Records events in memory, in emission order.
#[derive(Debug, Default)]
pub struct EventLog {
    events: Mutex<Vec<Event>>,
}

impl EventLog {
    /// Creates an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of recorded events.
    pub fn events(&self) -> Vec<Event> {
        self.events.lock().map(|v| v.clone()).unwrap_or_default()
    }

    /// Snapshot of recorded `(kind, name)` pairs.
    pub fn kinds(&self) -> Vec<(EventKind, Option<String>)> {
        self.events()
            .into_iter()
            .map(|e| (e.kind, e.name.map(|n| n.to_string())))
            .collect()
    }
}

impl EventSink for EventLog {
    fn on_event(&self, _ctx: &Context, event: &Event) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}
