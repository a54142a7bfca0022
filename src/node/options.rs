//! # Per-node test options.
//!
//! ## Sentinel values
//! - `timeout = 0s` → default timeout (10s)
//! - `max_concurrency = 0` → default concurrency (10)
//!
//! ## Phases
//! Children of a node run in three strictly ordered phases:
//! ```text
//! before (options.before) ──► main (neither) ──► after (options.after)
//! ```
//! A node flagged both `before` and `after` runs in the before phase.

use std::time::Duration;

/// Options set when creating a test node.
///
/// All fields are public; prefer the accessors for the sentinel-aware values.
///
/// ## Example
/// ```rust
/// use std::time::Duration;
/// use tom_runner::{Phase, TestOptions};
///
/// let opts = TestOptions::default()
///     .with_timeout(Duration::from_millis(50))
///     .with_before();
/// assert_eq!(opts.timeout(), Duration::from_millis(50));
/// assert_eq!(opts.phase(), Phase::Before);
///
/// let zero = TestOptions { max_concurrency: 0, ..TestOptions::default() };
/// assert_eq!(zero.max_concurrency(), 10);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestOptions {
    /// Time limit for an asynchronous test body.
    pub timeout: Duration,
    /// How many children may run at once.
    pub max_concurrency: usize,
    /// Skip this test.
    pub skip: bool,
    /// Only run this test (and other `only` tests) in the whole tree.
    pub only: bool,
    /// Run before its siblings.
    pub before: bool,
    /// Run after its siblings.
    pub after: bool,
    /// Incomplete; never executed.
    pub todo: bool,
    /// Marked as a group.
    pub group: bool,
}

impl TestOptions {
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_millis(10_000);
    pub const DEFAULT_MAX_CONCURRENCY: usize = 10;

    /// Effective timeout (`0s` → default).
    #[inline]
    pub fn timeout(&self) -> Duration {
        if self.timeout == Duration::ZERO {
            Self::DEFAULT_TIMEOUT
        } else {
            self.timeout
        }
    }

    /// Effective child concurrency (`0` → default).
    #[inline]
    pub fn max_concurrency(&self) -> usize {
        if self.max_concurrency == 0 {
            Self::DEFAULT_MAX_CONCURRENCY
        } else {
            self.max_concurrency
        }
    }

    /// The phase this node runs in among its siblings.
    pub fn phase(&self) -> Phase {
        if self.before {
            Phase::Before
        } else if self.after {
            Phase::After
        } else {
            Phase::Main
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max;
        self
    }

    pub fn with_skip(mut self) -> Self {
        self.skip = true;
        self
    }

    pub fn with_only(mut self) -> Self {
        self.only = true;
        self
    }

    pub fn with_before(mut self) -> Self {
        self.before = true;
        self
    }

    pub fn with_after(mut self) -> Self {
        self.after = true;
        self
    }

    pub fn with_todo(mut self) -> Self {
        self.todo = true;
        self
    }

    pub fn with_group(mut self) -> Self {
        self.group = true;
        self
    }
}

impl Default for TestOptions {
    /// Default options:
    ///
    /// - `timeout = 10s`
    /// - `max_concurrency = 10`
    /// - every flag `false`
    fn default() -> Self {
        Self {
            timeout: Self::DEFAULT_TIMEOUT,
            max_concurrency: Self::DEFAULT_MAX_CONCURRENCY,
            skip: false,
            only: false,
            before: false,
            after: false,
            todo: false,
            group: false,
        }
    }
}

/// Sibling execution phase.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Phase {
    Before,
    Main,
    After,
}

impl Phase {
    /// Phases in execution order.
    pub const ORDER: [Phase; 3] = [Phase::Before, Phase::Main, Phase::After];

    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Before => "before",
            Phase::Main => "main",
            Phase::After => "after",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_values_fall_back_to_defaults() {
        let opts = TestOptions {
            timeout: Duration::ZERO,
            max_concurrency: 0,
            ..TestOptions::default()
        };
        assert_eq!(opts.timeout(), Duration::from_secs(10));
        assert_eq!(opts.max_concurrency(), 10);
    }

    #[test]
    fn before_wins_over_after() {
        assert_eq!(TestOptions::default().phase(), Phase::Main);
        assert_eq!(TestOptions::default().with_after().phase(), Phase::After);
        assert_eq!(
            TestOptions::default().with_after().with_before().phase(),
            Phase::Before
        );
    }
}
