//! # Run a test tree.
//!
//! [`Runner`] executes every node of a validated tree, aggregates [`Stats`] and
//! forwards progress to an optional [`View`].
//!
//! ## Execution
//! ```text
//! start()
//!   ├─► view.init()
//!   ├─► stats.start, total = nodes with a body, state in-progress, emit start(total)
//!   ├─► run(root)
//!   ├─► run_children(root)
//!   │     for phase in [before, main, after]:            (strictly in order)
//!   │       Queue(max_concurrency of the parent):
//!   │         job(child) = join!(run(child), run_children(child))
//!   └─► ended, state pass (unless fail), stats.end, emit end(stats)
//! ```
//!
//! ## Event wiring
//! A wildcard listener on the root sees every node event (bubbling) and:
//! - updates counters (`in-progress`, `pass`, `fail`, `skipped`, `ignored`, `todo`);
//! - moves the runner to `fail` on the first failing test;
//! - emits the matching runner event (`test-start`, `test-pass`, ...);
//! - calls the matching view hook.
//!
//! ## Rules
//! - A failing node never aborts traversal; its siblings and children still run.
//! - A node's own body and its subtree run as two concurrently joined branches.
//! - `start()` can only be called once.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::SystemTime;

use futures::FutureExt;
use futures::future::BoxFuture;
use tracing::{debug, error, trace};

use crate::config::Config;
use crate::core::queue::{Job, Queue, job};
use crate::core::stats::Stats;
use crate::error::{RunnerError, StateError};
use crate::events::{
    Emitter, ListenerId, NodeEvent, NodeEventKind, RunnerEvent, RunnerEventKind,
};
use crate::node::{Phase, TestNode};
use crate::state::{RunnerState, State, StateMachine, Transition};
use crate::tree::Composite;
use crate::views::View;

#[derive(Debug)]
struct RunnerInner {
    machine: StateMachine<RunnerState>,
    stats: Stats,
    ended: bool,
}

/// State shared between the runner and its root listener.
struct Shared {
    inner: Mutex<RunnerInner>,
    events: Emitter<RunnerEvent>,
    view: Mutex<Option<Arc<dyn View>>>,
}

impl Shared {
    fn lock(&self) -> MutexGuard<'_, RunnerInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn view(&self) -> Option<Arc<dyn View>> {
        self.view
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Publishes `state` and the state-named runner event for a completed move.
    fn publish_transition(&self, t: Transition<RunnerState>, count: Option<usize>) {
        debug!(from = t.from.as_str(), to = t.to.as_str(), "runner state change");
        self.events
            .emit(&RunnerEvent::new(RunnerEventKind::State).with_transition(t.from, t.to));
        if let Some(kind) = RunnerEventKind::for_state(t.to) {
            let mut ev = RunnerEvent::new(kind).with_transition(t.from, t.to);
            if let Some(count) = count {
                ev = ev.with_count(count);
            }
            self.events.emit(&ev);
        }
    }

    /// Root listener body: stats, runner events, view hooks.
    fn on_node_event(&self, ev: &NodeEvent) {
        let Some(kind) = RunnerEventKind::for_test(ev.kind) else {
            return;
        };

        let failed = {
            let mut inner = self.lock();
            let stats = &mut inner.stats;
            match ev.kind {
                NodeEventKind::InProgress => stats.in_progress += 1,
                NodeEventKind::Pass => {
                    stats.pass += 1;
                    stats.in_progress = stats.in_progress.saturating_sub(1);
                }
                NodeEventKind::Fail => {
                    stats.fail += 1;
                    stats.in_progress = stats.in_progress.saturating_sub(1);
                }
                NodeEventKind::Skipped => stats.skip += 1,
                NodeEventKind::Ignored => stats.ignore += 1,
                NodeEventKind::Todo => stats.todo += 1,
                _ => {}
            }
            if ev.kind == NodeEventKind::Fail {
                inner.machine.set_state(RunnerState::Fail)
            } else {
                Ok(None)
            }
        };
        match failed {
            Ok(Some(t)) => self.publish_transition(t, None),
            Ok(None) => {}
            Err(e) => debug!(error = %e, label = e.as_label(), "runner did not enter fail"),
        }

        self.events.emit(
            &RunnerEvent::new(kind)
                .with_node(Arc::clone(&ev.target))
                .with_result(ev.result.clone())
                .with_error(ev.error.clone()),
        );

        let Some(view) = self.view() else {
            return;
        };
        let node = ev.target.as_ref();
        match kind {
            RunnerEventKind::TestStart => view.test_start(node),
            RunnerEventKind::TestPass => view.test_pass(node),
            RunnerEventKind::TestFail => {
                if let Some(error) = &ev.error {
                    view.test_fail(node, error);
                }
            }
            RunnerEventKind::TestSkip => view.test_skip(node),
            RunnerEventKind::TestIgnore => view.test_ignore(node),
            RunnerEventKind::TestTodo => view.test_todo(node),
            _ => {}
        }
    }
}

/// Executes a test tree once.
///
/// ## Example
/// ```rust
/// use tom_runner::{Config, Runner, RunnerState, TestError, TestFn, TestNode};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let root = TestNode::new("math");
/// root.test("adds", TestFn::sync(|_| Ok(1 + 1)))?;
/// root.test("divides", TestFn::future(|_| async { Err::<(), _>(TestError::from("by zero")) }))?;
///
/// let runner = Runner::new(root, Config::default())?;
/// let state = runner.start().await?;
/// assert_eq!(state, RunnerState::Fail);
/// assert_eq!((runner.stats().pass, runner.stats().fail), (1, 1));
/// # Ok(())
/// # }
/// ```
pub struct Runner {
    root: Arc<TestNode>,
    config: Config,
    shared: Arc<Shared>,
}

impl Runner {
    /// Creates a runner for `root`, a suite or any subtree of one that has not run yet.
    pub fn new(root: Arc<TestNode>, config: Config) -> Result<Self, RunnerError> {
        TestNode::validate(&root)?;
        Ok(Self {
            root,
            config,
            shared: Arc::new(Shared {
                inner: Mutex::new(RunnerInner {
                    machine: StateMachine::new(RunnerState::Pending, RunnerState::MOVES),
                    stats: Stats::default(),
                    ended: false,
                }),
                events: Emitter::new(),
                view: Mutex::new(None),
            }),
        })
    }

    /// Reports the run to `view`, replacing any previous one.
    pub fn with_view(self, view: Arc<dyn View>) -> Self {
        *self
            .shared
            .view
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(view);
        self
    }

    pub fn root(&self) -> &Arc<TestNode> {
        &self.root
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn state(&self) -> RunnerState {
        self.shared.lock().machine.state()
    }

    /// A snapshot of the counters.
    pub fn stats(&self) -> Stats {
        self.shared.lock().stats.clone()
    }

    /// True once the run finished.
    pub fn ended(&self) -> bool {
        self.shared.lock().ended
    }

    /// Registers a listener for runner events of `kind`.
    pub fn on<F>(&self, kind: RunnerEventKind, handler: F) -> ListenerId
    where
        F: Fn(&RunnerEvent) + Send + Sync + 'static,
    {
        self.shared.events.on(kind, handler)
    }

    /// Registers a listener for every runner event.
    pub fn on_any<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&RunnerEvent) + Send + Sync + 'static,
    {
        self.shared.events.on_any(handler)
    }

    /// Registers a listener for the next runner event of `kind`.
    pub fn once<F>(&self, kind: RunnerEventKind, handler: F) -> ListenerId
    where
        F: Fn(&RunnerEvent) + Send + Sync + 'static,
    {
        self.shared.events.once(kind, handler)
    }

    pub fn once_any<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&RunnerEvent) + Send + Sync + 'static,
    {
        self.shared.events.once_any(handler)
    }

    pub fn off(&self, id: ListenerId) -> bool {
        self.shared.events.off(id)
    }

    /// Runs the whole tree and returns the final state.
    pub async fn start(&self) -> Result<RunnerState, RunnerError> {
        let view = self.shared.view();
        if let Some(view) = &view {
            view.init().await?;
            trace!(view = view.name(), "view initialised");
        }

        let total = self.root.iter().filter(|n| n.has_body()).count();
        let started = {
            let mut inner = self.shared.lock();
            let t = inner.machine.set_state(RunnerState::InProgress)?;
            inner.stats.start = Some(SystemTime::now());
            inner.stats.total = total;
            t
        };
        let Some(started) = started else {
            return Err(StateError::InvalidMove {
                attempted: RunnerState::InProgress.as_str(),
                current: RunnerState::InProgress.as_str(),
                valid_from: vec![RunnerState::Pending.as_str()],
            }
            .into());
        };

        let shared = Arc::clone(&self.shared);
        let listener = self.root.on_any(move |ev| shared.on_node_event(ev));

        debug!(root = %self.root, total, "run started");
        self.shared.publish_transition(started, Some(total));
        self.shared
            .events
            .emit(&RunnerEvent::new(RunnerEventKind::Start).with_count(total));
        if let Some(view) = &view {
            view.start(total);
        }

        run_node(&self.root, self.config.debug).await;
        run_children(Arc::clone(&self.root), self.config.debug).await;

        let (finished, stats) = {
            let mut inner = self.shared.lock();
            inner.ended = true;
            let finished = if inner.machine.state() == RunnerState::Fail {
                Ok(None)
            } else {
                inner.machine.set_state(RunnerState::Pass)
            };
            inner.stats.end = Some(SystemTime::now());
            (finished, inner.stats.clone())
        };
        if let Some(t) = finished? {
            self.shared.publish_transition(t, None);
        }
        self.root.off(listener);

        debug!(
            pass = stats.pass,
            fail = stats.fail,
            skip = stats.skip,
            elapsed_ms = stats.time_elapsed().as_millis() as u64,
            "run finished"
        );
        self.shared
            .events
            .emit(&RunnerEvent::new(RunnerEventKind::End).with_stats(stats.clone()));
        if let Some(view) = &view {
            view.end(&stats);
        }
        Ok(self.state())
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("root", &self.root.name())
            .field("state", &self.state())
            .field("config", &self.config)
            .finish()
    }
}

/// Runs one node; a failure is logged and otherwise left to the event path.
async fn run_node(node: &Arc<TestNode>, debug: bool) {
    if let Err(e) = node.run().await {
        if debug {
            error!(test = %node, label = e.as_label(), error = %e, "test failed");
        } else {
            debug!(test = %node, label = e.as_label(), error = %e, "test failed");
        }
    }
}

/// Runs the children of `node` phase by phase, recursing into each child.
fn run_children(node: Arc<TestNode>, debug: bool) -> BoxFuture<'static, ()> {
    async move {
        let children = node.children();
        if children.is_empty() {
            return;
        }
        let max = node.options().max_concurrency();

        for phase in Phase::ORDER {
            let jobs: Vec<Job<()>> = children
                .iter()
                .filter(|c| c.options().phase() == phase)
                .map(|c| {
                    let child = Arc::clone(c);
                    job(move || async move {
                        futures::join!(
                            run_node(&child, debug),
                            run_children(Arc::clone(&child), debug)
                        );
                    })
                })
                .collect();
            if jobs.is_empty() {
                continue;
            }

            trace!(
                parent = %node,
                phase = phase.as_str(),
                jobs = jobs.len(),
                max,
                "phase started"
            );
            let outcome = Queue::new(jobs, max).process().await;
            if !outcome.is_ok() {
                error!(
                    parent = %node,
                    phase = phase.as_str(),
                    failed = outcome.failed(),
                    "phase jobs did not complete"
                );
            }
        }
    }
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::TestError;
    use crate::node::{TestFn, TestOptions};
    use crate::state::TestState;

    fn ok() -> TestFn {
        TestFn::sync(|_| Ok(()))
    }

    #[tokio::test]
    async fn empty_suite_passes() {
        let runner = Runner::new(TestNode::new("empty"), Config::default()).unwrap();
        assert_eq!(runner.start().await.unwrap(), RunnerState::Pass);
        let stats = runner.stats();
        assert_eq!(stats.total, 0);
        assert!(runner.ended());
        assert!(stats.start.is_some() && stats.end.is_some());
    }

    #[tokio::test]
    async fn counts_every_outcome() {
        let root = TestNode::new("root");
        root.test("pass", ok()).unwrap();
        root.test("fail", TestFn::sync(|_| Err::<(), _>(TestError::from("x"))))
            .unwrap();
        root.skip("skip", ok()).unwrap();
        root.todo("todo").unwrap();
        root.test_with("ignored", None, TestOptions::default()).unwrap();

        let runner = Runner::new(root, Config::default()).unwrap();
        assert_eq!(runner.start().await.unwrap(), RunnerState::Fail);
        let stats = runner.stats();
        assert_eq!(stats.total, 3);
        assert_eq!(
            (stats.pass, stats.fail, stats.skip, stats.todo, stats.ignore),
            (1, 1, 1, 1, 2)
        );
        assert_eq!(stats.in_progress, 0);
    }

    #[tokio::test]
    async fn start_twice_is_rejected() {
        let runner = Runner::new(TestNode::new("r"), Config::default()).unwrap();
        runner.start().await.unwrap();
        let err = runner.start().await.unwrap_err();
        assert_eq!(err.as_label(), "runner_invalid_state");
    }

    #[tokio::test]
    async fn rejects_a_tree_that_already_ran() {
        let node = TestNode::detached("ran", Some(ok()), TestOptions::default());
        node.run().await.unwrap();
        let err = Runner::new(node, Config::default()).unwrap_err();
        assert_eq!(err.as_label(), "runner_invalid_tree");
    }

    #[tokio::test]
    async fn runner_events_follow_the_run() {
        let root = TestNode::new("root");
        root.test("a", ok()).unwrap();
        let runner = Runner::new(root, Config::default()).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        runner.on_any(move |ev| s.lock().unwrap().push(ev.kind.as_str()));
        runner.start().await.unwrap();

        assert_eq!(
            *seen.lock().unwrap(),
            [
                "state",
                "in-progress",
                "start",
                "test-ignore",
                "test-start",
                "test-pass",
                "state",
                "pass",
                "end"
            ]
        );
    }

    #[tokio::test]
    async fn group_failure_does_not_stop_children() {
        let root = TestNode::new("root");
        let group = root
            .test("group", TestFn::sync(|_| Err::<(), _>(TestError::from("setup"))))
            .unwrap();
        let child = group.test("child", ok()).unwrap();

        let runner = Runner::new(root, Config { debug: true }).unwrap();
        runner.start().await.unwrap();
        assert_eq!(group.state(), TestState::Fail);
        assert_eq!(child.state(), TestState::Pass);
    }
}
