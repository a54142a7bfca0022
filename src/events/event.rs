//! # Events raised by test nodes and the runner.
//!
//! [`NodeEventKind`] classifies what a [`TestNode`] publishes:
//! - **State events**: `state` on every transition, followed by the state-named event
//!   (`in-progress`, `pass`, `fail`, `skipped`, `ignored`, `todo`)
//! - **Terminal event**: `end`, after `pass` or `fail`
//! - **Reset event**: `reset`, when a node is reset back to `pending`
//!
//! [`RunnerEventKind`] classifies what the [`Runner`](crate::Runner) publishes: its own state
//! changes, `start`/`end`, and per-test translations (`test-start`, `test-pass`, ...).
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Node events keep the originating node in `target`, also when observed on an ancestor.
//!
//! ## Example
//! ```rust
//! use tom_runner::{NodeEvent, NodeEventKind, TestNode, TestState};
//!
//! let node = TestNode::new("demo");
//! let ev = NodeEvent::new(NodeEventKind::State, node.clone())
//!     .with_state(TestState::Skipped)
//!     .with_prev(TestState::Pending);
//!
//! assert_eq!(ev.kind.as_str(), "state");
//! assert_eq!(ev.target.name(), "demo");
//! ```

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};

use serde_json::Value;

use crate::core::Stats;
use crate::error::TestError;
use crate::events::Emitted;
use crate::node::TestNode;
use crate::state::{RunnerState, TestState};

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of test node events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum NodeEventKind {
    /// Any transition.
    ///
    /// Sets:
    /// - `state`: the new state
    /// - `prev`: the previous state
    State,

    /// Test body started.
    InProgress,

    /// Test body succeeded.
    ///
    /// Sets:
    /// - `result`: the returned value
    Pass,

    /// Test body failed, panicked or timed out.
    ///
    /// Sets:
    /// - `error`: the failure
    Fail,

    /// Skipped by `skip` or by only-mode.
    Skipped,

    /// No body and not marked todo.
    Ignored,

    /// Marked todo.
    Todo,

    /// Emitted after `pass` or `fail`.
    End,

    /// Node went back to `pending`.
    ///
    /// Sets:
    /// - `prev`: the state that was left
    Reset,
}

impl NodeEventKind {
    /// Event name, matching the state names for state-named events.
    pub fn as_str(&self) -> &'static str {
        match self {
            NodeEventKind::State => "state",
            NodeEventKind::InProgress => "in-progress",
            NodeEventKind::Pass => "pass",
            NodeEventKind::Fail => "fail",
            NodeEventKind::Skipped => "skipped",
            NodeEventKind::Ignored => "ignored",
            NodeEventKind::Todo => "todo",
            NodeEventKind::End => "end",
            NodeEventKind::Reset => "reset",
        }
    }

    /// The state-named event for `state`; `None` for `pending`, which is only re-entered by reset.
    pub fn for_state(state: TestState) -> Option<Self> {
        match state {
            TestState::Pending => None,
            TestState::InProgress => Some(NodeEventKind::InProgress),
            TestState::Skipped => Some(NodeEventKind::Skipped),
            TestState::Ignored => Some(NodeEventKind::Ignored),
            TestState::Todo => Some(NodeEventKind::Todo),
            TestState::Pass => Some(NodeEventKind::Pass),
            TestState::Fail => Some(NodeEventKind::Fail),
        }
    }
}

impl fmt::Display for NodeEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event published by a test node and bubbled to each of its ancestors.
#[derive(Debug, Clone)]
pub struct NodeEvent {
    /// Globally unique sequence number.
    pub seq: u64,
    /// Classification.
    pub kind: NodeEventKind,
    /// The node that emitted the event (preserved while bubbling).
    pub target: Arc<TestNode>,
    /// New state (state events).
    pub state: Option<TestState>,
    /// Previous state (`state` and `reset` events).
    pub prev: Option<TestState>,
    /// Value returned by the test body (`pass`).
    pub result: Option<Value>,
    /// Failure (`fail`).
    pub error: Option<TestError>,
}

impl NodeEvent {
    /// Creates a new event of the given kind with the next sequence number.
    pub fn new(kind: NodeEventKind, target: Arc<TestNode>) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            kind,
            target,
            state: None,
            prev: None,
            result: None,
            error: None,
        }
    }

    #[inline]
    pub fn with_state(mut self, state: TestState) -> Self {
        self.state = Some(state);
        self
    }

    #[inline]
    pub fn with_prev(mut self, prev: TestState) -> Self {
        self.prev = Some(prev);
        self
    }

    #[inline]
    pub fn with_result(mut self, result: Option<Value>) -> Self {
        self.result = result;
        self
    }

    #[inline]
    pub fn with_error(mut self, error: Option<TestError>) -> Self {
        self.error = error;
        self
    }
}

impl Emitted for NodeEvent {
    type Kind = NodeEventKind;

    fn kind(&self) -> NodeEventKind {
        self.kind
    }
}

/// Classification of runner events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunnerEventKind {
    /// Runner transition (`state`, `prev` set).
    State,
    /// Runner entered `in-progress` (`count` set).
    InProgress,
    /// Suite passed.
    Pass,
    /// First failure recorded.
    Fail,
    /// Run started (`count` set).
    Start,
    /// A test started (`node` set).
    TestStart,
    /// A test passed (`node`, `result` set).
    TestPass,
    /// A test failed (`node`, `error` set).
    TestFail,
    /// A test was skipped (`node` set).
    TestSkip,
    /// A test was ignored (`node` set).
    TestIgnore,
    /// A test is todo (`node` set).
    TestTodo,
    /// Run finished (`stats` set).
    End,
}

impl RunnerEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RunnerEventKind::State => "state",
            RunnerEventKind::InProgress => "in-progress",
            RunnerEventKind::Pass => "pass",
            RunnerEventKind::Fail => "fail",
            RunnerEventKind::Start => "start",
            RunnerEventKind::TestStart => "test-start",
            RunnerEventKind::TestPass => "test-pass",
            RunnerEventKind::TestFail => "test-fail",
            RunnerEventKind::TestSkip => "test-skip",
            RunnerEventKind::TestIgnore => "test-ignore",
            RunnerEventKind::TestTodo => "test-todo",
            RunnerEventKind::End => "end",
        }
    }

    pub(crate) fn for_state(state: RunnerState) -> Option<Self> {
        match state {
            RunnerState::Pending => None,
            RunnerState::InProgress => Some(RunnerEventKind::InProgress),
            RunnerState::Pass => Some(RunnerEventKind::Pass),
            RunnerState::Fail => Some(RunnerEventKind::Fail),
        }
    }

    /// Runner translation of a node state event.
    pub(crate) fn for_test(kind: NodeEventKind) -> Option<Self> {
        match kind {
            NodeEventKind::InProgress => Some(RunnerEventKind::TestStart),
            NodeEventKind::Pass => Some(RunnerEventKind::TestPass),
            NodeEventKind::Fail => Some(RunnerEventKind::TestFail),
            NodeEventKind::Skipped => Some(RunnerEventKind::TestSkip),
            NodeEventKind::Ignored => Some(RunnerEventKind::TestIgnore),
            NodeEventKind::Todo => Some(RunnerEventKind::TestTodo),
            NodeEventKind::State | NodeEventKind::End | NodeEventKind::Reset => None,
        }
    }
}

impl fmt::Display for RunnerEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event published by the runner.
#[derive(Debug, Clone)]
pub struct RunnerEvent {
    /// Globally unique sequence number.
    pub seq: u64,
    /// Classification.
    pub kind: RunnerEventKind,
    /// Test node concerned (per-test events).
    pub node: Option<Arc<TestNode>>,
    /// New runner state (`state`).
    pub state: Option<RunnerState>,
    /// Previous runner state (`state`).
    pub prev: Option<RunnerState>,
    /// Number of tests loaded (`start`, `in-progress`).
    pub count: Option<usize>,
    /// Final stats (`end`).
    pub stats: Option<Stats>,
    /// Value returned by the test (`test-pass`).
    pub result: Option<Value>,
    /// Failure (`test-fail`).
    pub error: Option<TestError>,
}

impl RunnerEvent {
    /// Creates a new event of the given kind with the next sequence number.
    pub fn new(kind: RunnerEventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            kind,
            node: None,
            state: None,
            prev: None,
            count: None,
            stats: None,
            result: None,
            error: None,
        }
    }

    #[inline]
    pub fn with_node(mut self, node: Arc<TestNode>) -> Self {
        self.node = Some(node);
        self
    }

    #[inline]
    pub fn with_transition(mut self, prev: RunnerState, state: RunnerState) -> Self {
        self.prev = Some(prev);
        self.state = Some(state);
        self
    }

    #[inline]
    pub fn with_count(mut self, count: usize) -> Self {
        self.count = Some(count);
        self
    }

    #[inline]
    pub fn with_stats(mut self, stats: Stats) -> Self {
        self.stats = Some(stats);
        self
    }

    #[inline]
    pub fn with_result(mut self, result: Option<Value>) -> Self {
        self.result = result;
        self
    }

    #[inline]
    pub fn with_error(mut self, error: Option<TestError>) -> Self {
        self.error = error;
        self
    }
}

impl Emitted for RunnerEvent {
    type Kind = RunnerEventKind;

    fn kind(&self) -> RunnerEventKind {
        self.kind
    }
}
