//! Cursor stores: the last completed run of each schedule.
//!
//! Values are decimal Unix seconds; an empty string means the schedule never ran.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::context::Context;
use crate::error::ProcessError;

/// Persistent key/value store for scheduler cursors.
///
/// Shared between scheduled processes; implementations provide their own
/// consistency.
#[async_trait]
pub trait Cursor: Send + Sync + 'static {
    /// Value stored for `name`, or an empty string when absent.
    async fn get(&self, ctx: &Context, name: &str) -> Result<String, ProcessError>;

    /// Stores `value` for `name`.
    async fn set(&self, ctx: &Context, name: &str, value: &str) -> Result<(), ProcessError>;
}

/// In-memory cursor store.
#[derive(Debug, Default)]
pub struct MemoryCursor {
    values: RwLock<HashMap<String, String>>,
}

impl MemoryCursor {
    /// Empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeds `name` with `value`.
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.get_mut().insert(name.into(), value.into());
        self
    }

    /// Current value for `name`, if any.
    pub async fn value(&self, name: &str) -> Option<String> {
        self.values.read().await.get(name).cloned()
    }
}

#[async_trait]
impl Cursor for MemoryCursor {
    async fn get(&self, ctx: &Context, name: &str) -> Result<String, ProcessError> {
        ctx.check()?;
        Ok(self.value(name).await.unwrap_or_default())
    }

    async fn set(&self, ctx: &Context, name: &str, value: &str) -> Result<(), ProcessError> {
        ctx.check()?;
        self.values
            .write()
            .await
            .insert(name.to_string(), value.to_string());
        Ok(())
    }
}
