//! # tom-runner
//!
//! **tom-runner** is a hierarchical async test-execution engine.
//!
//! A suite is a tree of [`TestNode`]s (the test object model, "TOM"). Groups hold
//! tests, tests hold bodies, hooks run before or after their siblings. The
//! [`Runner`] walks the tree with bounded concurrency per group, collects
//! [`Stats`] and reports progress to a [`View`].
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                 ┌──────────────────────────────┐
//!                 │  TestNode tree (suite)       │
//!                 │  - tree: parent/children     │
//!                 │  - TestState machine         │
//!                 │  - Emitter<NodeEvent>        │
//!                 └──────────────┬───────────────┘
//!                                │ events bubble to the root
//!                                ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Runner                                                           │
//! │  - RunnerState machine                                            │
//! │  - Stats (counters, wall-clock)                                   │
//! │  - Emitter<RunnerEvent> (user listeners)                          │
//! │  - Queue per group and phase (Semaphore + JoinSet)                │
//! └──────────────────────────────┬────────────────────────────────────┘
//!                                ▼
//!                       ┌────────────────┐
//!                       │  View hooks    │
//!                       └───┬────────┬───┘
//!                           ▼        ▼
//!                  ConsoleView     custom views
//! ```
//!
//! ### Lifecycle of a node
//! ```text
//! pending ─┬─► in-progress ─┬─► pass ─► end
//!          │                └─► fail ─► end
//!          ├─► skipped      (skip flag, or another node is `only`)
//!          ├─► ignored      (no body)
//!          └─► todo         (todo flag)
//! ```
//!
//! ## Features
//! | Area              | Description                                                   | Key types / traits                        |
//! |-------------------|---------------------------------------------------------------|-------------------------------------------|
//! | **Test model**    | Build suites of tests, groups, hooks and todos.               | [`TestNode`], [`TestFn`], [`TestOptions`] |
//! | **Events**        | Listen to node and runner events (bubbling, once, off).       | [`Emitter`], [`NodeEvent`], [`RunnerEvent`] |
//! | **States**        | Declarative transition tables with typed errors.              | [`StateMachine`], [`TestState`]           |
//! | **Execution**     | Phased, bounded-concurrency, timeout-aware runs.              | [`Runner`], [`Queue`]                     |
//! | **Reporting**     | Pluggable views and aggregated stats.                         | [`View`], [`Stats`]                       |
//! | **Errors**        | Typed errors for construction, transitions and test failures. | [`TreeError`], [`TestError`], [`RunnerError`] |
//! | **Configuration** | Runner settings.                                              | [`Config`]                                |
//!
//! ## Optional features
//! - `console` (default): exports the built-in [`ConsoleView`].
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use tom_runner::{Config, Runner, RunnerState, TestError, TestFn, TestNode};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let suite = TestNode::new("suite");
//!     suite.before("connect", TestFn::sync(|_| Ok("connected")))?;
//!
//!     let math = suite.group("math")?;
//!     math.test("adds", TestFn::sync(|_| Ok(1 + 1)))?;
//!     math.test("waits", TestFn::future(|_| async {
//!         tokio::time::sleep(Duration::from_millis(5)).await;
//!         Ok::<_, TestError>(())
//!     }))?;
//!     math.todo("divides")?;
//!
//!     let runner = Runner::new(suite, Config::default())?;
//!     let state = runner.start().await?;
//!
//!     assert_eq!(state, RunnerState::Pass);
//!     assert_eq!(runner.stats().pass, 3);
//!     Ok(())
//! }
//! ```
mod config;
mod core;
mod error;
mod events;
mod node;
mod state;
mod tree;
mod views;

// ---- Public re-exports ----

pub use config::Config;
pub use crate::core::{Job, Queue, QueueOutcome, Runner, Stats, TestStats, job};
pub use error::{JobError, RunnerError, StateError, TestError, TreeError, ViewError};
pub use events::{
    Emitted, Emitter, ListenerId, NodeEvent, NodeEventKind, RunnerEvent, RunnerEventKind,
};
pub use node::{
    BoxTestFuture, Invocation, NodeKind, Outcome, Phase, TestContext, TestFn, TestNode,
    TestOptions,
};
pub use state::{RunnerState, State, StateMachine, TestState, Transition};
pub use tree::{Composite, PreOrder};
pub use views::View;

// Optional: expose the built-in console view.
// Enable with: `--features console` (on by default)
#[cfg(feature = "console")]
pub use views::{ConsoleView, ConsoleViewConfig};
