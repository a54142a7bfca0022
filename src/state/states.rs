//! # Test and runner states.
//!
//! ```text
//! TestState:
//!   pending ─┬─► in-progress ─┬─► pass
//!            │                └─► fail
//!            ├─► skipped
//!            ├─► ignored
//!            └─► todo
//!
//! RunnerState:
//!   pending ──► in-progress ─┬─► pass
//!                            └─► fail
//! ```

use std::fmt;
use std::process::ExitCode;

use super::machine::State;

/// Lifecycle state of a single test node.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum TestState {
    #[default]
    Pending,
    InProgress,
    Skipped,
    Ignored,
    Todo,
    Pass,
    Fail,
}

impl TestState {
    /// Transition table for test nodes.
    pub const MOVES: &'static [(TestState, TestState)] = &[
        (TestState::Pending, TestState::InProgress),
        (TestState::Pending, TestState::Skipped),
        (TestState::Pending, TestState::Ignored),
        (TestState::Pending, TestState::Todo),
        (TestState::InProgress, TestState::Pass),
        (TestState::InProgress, TestState::Fail),
    ];

    /// True for `pass` and `fail`, the states that end an executed test.
    #[inline]
    pub fn is_ended(&self) -> bool {
        matches!(self, TestState::Pass | TestState::Fail)
    }

    /// True for every state a node can settle in.
    #[inline]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, TestState::Pending | TestState::InProgress)
    }
}

impl State for TestState {
    fn as_str(&self) -> &'static str {
        match self {
            TestState::Pending => "pending",
            TestState::InProgress => "in-progress",
            TestState::Skipped => "skipped",
            TestState::Ignored => "ignored",
            TestState::Todo => "todo",
            TestState::Pass => "pass",
            TestState::Fail => "fail",
        }
    }
}

impl fmt::Display for TestState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Aggregate state of a run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
pub enum RunnerState {
    #[default]
    Pending,
    InProgress,
    Pass,
    Fail,
}

impl RunnerState {
    /// Transition table for the runner.
    pub const MOVES: &'static [(RunnerState, RunnerState)] = &[
        (RunnerState::Pending, RunnerState::InProgress),
        (RunnerState::InProgress, RunnerState::Pass),
        (RunnerState::InProgress, RunnerState::Fail),
    ];

    /// Process exit status for this state: `1` for `fail`, `0` otherwise.
    ///
    /// # Example
    /// ```
    /// use tom_runner::RunnerState;
    ///
    /// assert_eq!(RunnerState::Pass.exit_code(), 0);
    /// assert_eq!(RunnerState::Fail.exit_code(), 1);
    /// ```
    pub fn exit_code(&self) -> u8 {
        match self {
            RunnerState::Fail => 1,
            _ => 0,
        }
    }
}

impl State for RunnerState {
    fn as_str(&self) -> &'static str {
        match self {
            RunnerState::Pending => "pending",
            RunnerState::InProgress => "in-progress",
            RunnerState::Pass => "pass",
            RunnerState::Fail => "fail",
        }
    }
}

impl fmt::Display for RunnerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<RunnerState> for ExitCode {
    fn from(state: RunnerState) -> Self {
        ExitCode::from(state.exit_code())
    }
}
