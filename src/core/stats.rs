//! # Run and test statistics.
//!
//! - [`Stats`] counters aggregated by the runner, plus wall-clock start/end.
//! - [`TestStats`] per-node timing on the monotonic clock.

use std::time::{Duration, SystemTime};

use tokio::time::Instant;

/// Aggregate counters for a run.
///
/// `total` is fixed when the run starts (number of nodes with a test body);
/// the other counters move as test events arrive.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Stats {
    pub total: usize,
    pub pass: usize,
    pub fail: usize,
    pub skip: usize,
    pub todo: usize,
    pub ignore: usize,
    /// Tests currently executing.
    pub in_progress: usize,
    pub start: Option<SystemTime>,
    pub end: Option<SystemTime>,
}

impl Stats {
    /// Wall-clock time between start and end (zero until both are set).
    pub fn time_elapsed(&self) -> Duration {
        match (self.start, self.end) {
            (Some(start), Some(end)) => end.duration_since(start).unwrap_or_default(),
            _ => Duration::ZERO,
        }
    }

    /// Number of tests that settled so far.
    pub fn settled(&self) -> usize {
        self.pass + self.fail + self.skip + self.todo + self.ignore
    }
}

/// Timing of one test execution.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TestStats {
    pub start: Option<Instant>,
    pub end: Option<Instant>,
    pub duration: Duration,
}

impl TestStats {
    pub(crate) fn begin(&mut self, now: Instant) {
        self.start = Some(now);
    }

    pub(crate) fn finish(&mut self, now: Instant) {
        self.end = Some(now);
        self.duration = self
            .start
            .map(|start| now.saturating_duration_since(start))
            .unwrap_or_default();
    }
}
