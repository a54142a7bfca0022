//! # Test object model.
//!
//! This module provides the test-node types:
//! - [`TestNode`] - a test, group or hook; tree + state machine + listeners in one type
//! - [`TestFn`] - a synchronous or asynchronous test body
//! - [`TestContext`] - per-execution context handed to the body
//! - [`TestOptions`] - per-node configuration (timeout, concurrency, flags)
//! - [`NodeKind`], [`Phase`] - derived classification

mod context;
mod options;
mod test_fn;
mod test_node;

pub use context::TestContext;
pub use options::{Phase, TestOptions};
pub use test_fn::{BoxTestFuture, Invocation, Outcome, TestFn};
pub(crate) use test_fn::panic_message;
pub use test_node::{NodeKind, TestNode};
