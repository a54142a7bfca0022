//! # Per-execution test context.
//!
//! A fresh [`TestContext`] is created each time a test body runs and handed to it.
//! Clones share the same `data` slot, so a body (or a future it spawned) can attach
//! diagnostic data that views read from the node afterwards.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

/// Context handed to a test body.
///
/// ## Example
/// ```rust
/// use serde_json::json;
/// use tom_runner::TestContext;
///
/// let ctx = TestContext::new("fetch", 2);
/// ctx.set_data(json!({ "status": 200 }));
/// assert_eq!(ctx.name(), "fetch");
/// assert_eq!(ctx.index(), 2);
/// assert_eq!(ctx.data(), Some(json!({ "status": 200 })));
/// ```
#[derive(Clone, Debug)]
pub struct TestContext {
    name: Arc<str>,
    index: usize,
    data: Arc<Mutex<Option<Value>>>,
}

impl TestContext {
    pub fn new(name: impl Into<Arc<str>>, index: usize) -> Self {
        Self {
            name: name.into(),
            index,
            data: Arc::new(Mutex::new(None)),
        }
    }

    /// The name given to the test.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The test's 1-based position among its siblings.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Attaches free-form diagnostic data, replacing any previous value.
    pub fn set_data(&self, data: impl Into<Value>) {
        *self.data.lock().unwrap_or_else(PoisonError::into_inner) = Some(data.into());
    }

    /// A copy of the attached data, if any.
    pub fn data(&self) -> Option<Value> {
        self.data
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
