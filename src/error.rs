//! Error types used by the test object model, the runner and views.
//!
//! This module defines one error enum per concern:
//!
//! - [`TreeError`] - errors raised while building a suite (construction errors).
//! - [`StateError`] - an attempted state change not present in a transition table.
//! - [`TestError`] - a single test body failed, panicked or timed out.
//! - [`RunnerError`] - errors raised by the runner itself.
//! - [`ViewError`] - a view failed to initialise.
//! - [`JobError`] - a queued job did not return a value.
//!
//! All of them provide `as_label` (a short stable label for logs/metrics).

use std::time::Duration;
use thiserror::Error;

/// # Errors produced while building or combining test trees.
///
/// Construction errors are returned to the immediate caller; they are never recoverable
/// by the runner.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TreeError {
    /// A sibling with the same name already exists under the parent.
    #[error("Duplicate name: {name}")]
    DuplicateName {
        /// The rejected name.
        name: String,
    },

    /// The child being added already belongs to another parent.
    #[error("node '{name}' already has a parent")]
    Attached {
        /// Name of the attached node.
        name: String,
    },

    /// The child being added is the parent itself or one of its ancestors.
    #[error("adding '{name}' would create a cycle")]
    Cycle {
        /// Name of the rejected node.
        name: String,
    },

    /// The supplied tree is not a valid, runnable test tree.
    #[error("Valid TOM required: '{name}' {reason}")]
    Invalid {
        /// Name of the offending node.
        name: String,
        /// What made it invalid.
        reason: &'static str,
    },

    /// `combine` was called without any tree.
    #[error("Valid TOM required: no trees supplied")]
    Empty,
}

impl TreeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tom_runner::TreeError;
    ///
    /// let err = TreeError::DuplicateName { name: "one".into() };
    /// assert_eq!(err.as_label(), "tree_duplicate_name");
    /// assert_eq!(err.to_string(), "Duplicate name: one");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TreeError::DuplicateName { .. } => "tree_duplicate_name",
            TreeError::Attached { .. } => "tree_attached",
            TreeError::Cycle { .. } => "tree_cycle",
            TreeError::Invalid { .. } => "tree_invalid",
            TreeError::Empty => "tree_empty",
        }
    }
}

/// # Invalid state transition.
///
/// Raised by a [`StateMachine`](crate::StateMachine) when a requested move is absent
/// from its transition table.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// No rule in the table leads to the attempted state at all.
    #[error("Invalid state: {attempted}")]
    UnknownTarget {
        /// The requested state.
        attempted: &'static str,
    },

    /// Rules lead to the attempted state, but not from the current one.
    #[error("Can only move to '{attempted}' from {} (not '{current}')", quoted(.valid_from))]
    InvalidMove {
        /// The requested state.
        attempted: &'static str,
        /// The state the machine was in.
        current: &'static str,
        /// States from which `attempted` is reachable.
        valid_from: Vec<&'static str>,
    },
}

fn quoted(states: &[&'static str]) -> String {
    if states.is_empty() {
        return "<unspecified>".to_string();
    }
    states
        .iter()
        .map(|s| format!("'{s}'"))
        .collect::<Vec<_>>()
        .join(" or ")
}

impl StateError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StateError::UnknownTarget { .. } => "state_unknown_target",
            StateError::InvalidMove { .. } => "state_invalid_move",
        }
    }

    /// The state that was requested.
    pub fn attempted(&self) -> &'static str {
        match self {
            StateError::UnknownTarget { attempted } => attempted,
            StateError::InvalidMove { attempted, .. } => attempted,
        }
    }
}

/// # Errors produced by test execution.
///
/// A `TestError` is stored as the node's result and surfaced through its `fail` event.
/// Synchronous failures and asynchronous failures share this one shape.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TestError {
    /// The test body returned an error.
    #[error("{message}")]
    Failed {
        /// The error rendered with `Display`.
        message: String,
    },

    /// The test body panicked.
    #[error("panicked: {message}")]
    Panicked {
        /// Panic payload, when it was a string.
        message: String,
    },

    /// The asynchronous test body did not settle within the node's timeout.
    #[error("Timeout expired [{}]", .timeout.as_millis())]
    Timeout {
        /// The timeout that was exceeded.
        timeout: Duration,
    },

    /// The node could not enter the requested state (e.g. it already ran).
    #[error(transparent)]
    State(#[from] StateError),
}

impl TestError {
    /// Builds a [`TestError::Failed`] from anything displayable.
    pub fn failed(message: impl std::fmt::Display) -> Self {
        TestError::Failed {
            message: message.to_string(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use tom_runner::TestError;
    /// use std::time::Duration;
    ///
    /// let err = TestError::Timeout { timeout: Duration::from_millis(50) };
    /// assert_eq!(err.as_label(), "test_timeout");
    /// assert_eq!(err.to_string(), "Timeout expired [50]");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            TestError::Failed { .. } => "test_failed",
            TestError::Panicked { .. } => "test_panicked",
            TestError::Timeout { .. } => "test_timeout",
            TestError::State(_) => "test_invalid_state",
        }
    }

    /// Returns a human-readable message with details about the error.
    pub fn as_message(&self) -> String {
        match self {
            TestError::Failed { message } => format!("error: {message}"),
            TestError::Panicked { message } => format!("panic: {message}"),
            TestError::Timeout { timeout } => format!("timeout: {timeout:?}"),
            TestError::State(e) => format!("state: {e}"),
        }
    }

    /// True if the test was abandoned because of its timeout.
    pub fn is_timeout(&self) -> bool {
        matches!(self, TestError::Timeout { .. })
    }
}

impl From<&str> for TestError {
    fn from(message: &str) -> Self {
        TestError::failed(message)
    }
}

impl From<String> for TestError {
    fn from(message: String) -> Self {
        TestError::Failed { message }
    }
}

/// # A view failed to initialise.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("view init failed: {message}")]
pub struct ViewError {
    /// What went wrong.
    pub message: String,
}

impl ViewError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// # Errors produced by the runner.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RunnerError {
    /// The tree handed to the runner failed validation.
    #[error(transparent)]
    InvalidTree(#[from] TreeError),

    /// The view's `init` hook failed; the run did not start.
    #[error(transparent)]
    View(#[from] ViewError),

    /// The runner was asked to make an invalid move (e.g. `start()` twice).
    #[error(transparent)]
    State(#[from] StateError),
}

impl RunnerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RunnerError::InvalidTree(_) => "runner_invalid_tree",
            RunnerError::View(_) => "runner_view_init",
            RunnerError::State(_) => "runner_invalid_state",
        }
    }
}

/// # A queued job that did not return.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JobError {
    /// The job panicked; other jobs kept running.
    #[error("job panicked: {message}")]
    Panicked {
        /// Panic payload, when it was a string.
        message: String,
    },

    /// The job was never started or its task was cancelled by the runtime.
    #[error("job aborted")]
    Aborted,
}

impl JobError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            JobError::Panicked { .. } => "job_panicked",
            JobError::Aborted => "job_aborted",
        }
    }
}
