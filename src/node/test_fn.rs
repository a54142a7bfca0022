//! # Function-backed test body (`TestFn`)
//!
//! [`TestFn`] wraps a closure and produces a fresh [`Invocation`] per run:
//! - [`TestFn::sync`] wraps `Fn(&TestContext) -> Result<R, TestError>`; the body runs
//!   immediately and its outcome is [`Invocation::Ready`].
//! - [`TestFn::future`] wraps `Fn(TestContext) -> Fut`; the future is returned as
//!   [`Invocation::Pending`] and the node races it against its timeout.
//!
//! ## Panics
//! A panic while calling the closure is caught and reported as [`TestError::Panicked`],
//! the same shape an asynchronous failure has.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tom_runner::{TestError, TestFn};
//!
//! let quick = TestFn::sync(|ctx| Ok(format!("hello from {}", ctx.name())));
//! let slow = TestFn::future(|_ctx| async move {
//!     tokio::time::sleep(Duration::from_millis(5)).await;
//!     Ok::<_, TestError>(42)
//! });
//! assert!(quick.is_sync());
//! assert!(!slow.is_sync());
//! ```

use std::any::Any;
use std::fmt;
use std::future::Future;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use serde_json::Value;

use crate::error::TestError;
use crate::node::TestContext;

/// What a test body settles to: the returned value or the failure.
pub type Outcome = Result<Value, TestError>;

/// Boxed future returned by asynchronous test bodies.
pub type BoxTestFuture = BoxFuture<'static, Outcome>;

/// Result of calling a test body.
pub enum Invocation {
    /// The body completed synchronously.
    Ready(Outcome),
    /// The body returned a future that still has to be awaited.
    Pending(BoxTestFuture),
}

type Body = dyn Fn(TestContext) -> Invocation + Send + Sync;

/// Shared, cloneable test body.
#[derive(Clone)]
pub struct TestFn {
    body: Arc<Body>,
    sync: bool,
}

impl TestFn {
    /// Wraps a synchronous body.
    pub fn sync<F, R>(f: F) -> Self
    where
        F: Fn(&TestContext) -> Result<R, TestError> + Send + Sync + 'static,
        R: Into<Value> + 'static,
    {
        Self {
            body: Arc::new(move |ctx: TestContext| {
                let outcome = catch_unwind(AssertUnwindSafe(|| f(&ctx)))
                    .unwrap_or_else(|panic| Err(panicked(panic)));
                Invocation::Ready(outcome.map(Into::into))
            }),
            sync: true,
        }
    }

    /// Wraps an asynchronous body; a fresh future is created per run.
    pub fn future<F, Fut, R>(f: F) -> Self
    where
        F: Fn(TestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<R, TestError>> + Send + 'static,
        R: Into<Value> + 'static,
    {
        Self {
            body: Arc::new(move |ctx: TestContext| {
                match catch_unwind(AssertUnwindSafe(|| f(ctx))) {
                    Ok(fut) => Invocation::Pending(fut.map(|res| res.map(Into::into)).boxed()),
                    Err(panic) => Invocation::Ready(Err(panicked(panic))),
                }
            }),
            sync: false,
        }
    }

    /// True if built with [`TestFn::sync`].
    pub fn is_sync(&self) -> bool {
        self.sync
    }

    /// Calls the body with `ctx`.
    pub fn invoke(&self, ctx: TestContext) -> Invocation {
        (self.body)(ctx)
    }
}

impl fmt::Debug for TestFn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestFn").field("sync", &self.sync).finish()
    }
}

/// Converts a caught panic payload into a [`TestError::Panicked`].
pub(crate) fn panicked(payload: Box<dyn Any + Send>) -> TestError {
    TestError::Panicked {
        message: panic_message(payload.as_ref()),
    }
}

/// Extracts the message of a panic payload (`&str` or `String`).
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
