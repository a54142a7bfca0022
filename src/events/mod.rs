//! Execution events: types and the in-process emitter.
//!
//! This module groups the event **data model** and the **emitter** used to
//! publish/subscribe to events raised by test nodes and the runner.
//!
//! ## Contents
//! - [`NodeEvent`], [`NodeEventKind`] events raised by a [`TestNode`](crate::TestNode)
//! - [`RunnerEvent`], [`RunnerEventKind`] events raised by the [`Runner`](crate::Runner)
//! - [`Emitter`] synchronous listener list with wildcard and `once` listeners
//!
//! ## Quick reference
//! - **Publishers**: `TestNode` state transitions (bubbled to every ancestor),
//!   `Runner` lifecycle and per-test translations.
//! - **Consumers**: the runner's root listener (stats + view), user listeners.

mod emitter;
mod event;

pub use emitter::{Emitted, Emitter, ListenerId};
pub use event::{NodeEvent, NodeEventKind, RunnerEvent, RunnerEventKind};
