//! # Run reporters.
//!
//! This module provides the [`View`] trait and the built-in [`ConsoleView`].
//!
//! ## Architecture
//! ```text
//! TestNode ── emit(NodeEvent) ──► root listener (Runner)
//!                                      │
//!                                      ├──► Stats update
//!                                      ├──► RunnerEvent (Runner::on / on_any)
//!                                      └──► View hook
//!                                               │
//!                                     ┌─────────┴─────────┐
//!                                     ▼                   ▼
//!                                ConsoleView            Custom
//! ```
//!
//! ## Implementing custom views
//! ```no_run
//! use std::sync::atomic::{AtomicUsize, Ordering};
//! use tom_runner::{TestError, TestNode, View};
//!
//! #[derive(Default)]
//! struct FailureCounter(AtomicUsize);
//!
//! #[async_trait::async_trait]
//! impl View for FailureCounter {
//!     fn test_fail(&self, _node: &TestNode, _error: &TestError) {
//!         self.0.fetch_add(1, Ordering::Relaxed);
//!     }
//! }
//! ```

#[cfg(feature = "console")]
mod console;
mod view;

#[cfg(feature = "console")]
pub use console::{ConsoleView, ConsoleViewConfig};
pub use view::View;
