//! Runtime core: orchestration and statistics.
//!
//! The public API from this module is [`Runner`], which executes a test tree,
//! plus the [`Queue`] it schedules sibling tests with and the [`Stats`] it reports.
//!
//! Internal modules:
//! - [`runner`]: validates the tree, walks it phase by phase, wires events to stats and view;
//! - [`queue`]: bounded-parallelism job execution on a tokio `JoinSet`;
//! - [`stats`]: run counters and per-test timing.

mod queue;
mod runner;
mod stats;

pub use queue::{Job, Queue, QueueOutcome, job};
pub use runner::Runner;
pub use stats::{Stats, TestStats};
