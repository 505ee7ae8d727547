//! Adapters from other function shapes to the canonical [`ProcessFn`].
//!
//! | Shape                         | Adapter          | Result               |
//! |-------------------------------|------------------|----------------------|
//! | `Fn() -> Fut<()>`             | [`from_fn`]      | always `Ok`          |
//! | `Fn(Context) -> Fut<()>`      | [`from_ctx_fn`]  | always `Ok`          |
//! | `Fn() -> Fut<Result<()>>`     | [`from_fallible`]| the function's result|

use std::future::Future;
use std::sync::Arc;

use futures::FutureExt;

use crate::context::Context;
use crate::error::ProcessError;
use crate::process::ProcessFn;

/// Adapts a function that needs neither a context nor error reporting.
pub fn from_fn<F, Fut>(f: F) -> ProcessFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |_ctx| f().map(Ok).boxed())
}

/// Adapts a function that takes a context but cannot fail.
pub fn from_ctx_fn<F, Fut>(f: F) -> ProcessFn
where
    F: Fn(Context) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    Arc::new(move |ctx| f(ctx).map(Ok).boxed())
}

/// Adapts a fallible function that ignores the context.
pub fn from_fallible<F, Fut>(f: F) -> ProcessFn
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), ProcessError>> + Send + 'static,
{
    Arc::new(move |_ctx| f().boxed())
}
