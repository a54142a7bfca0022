//! # TestNode: a test, group or hook in the suite tree.
//!
//! One concrete type carries three capabilities:
//! - **tree**: owned children (`Arc`), non-owning parent link (`Weak`), see [`Composite`];
//! - **state machine**: [`TestState`] over [`TestState::MOVES`];
//! - **events**: a listener list; every event is dispatched locally, then on each
//!   ancestor with the emitting node kept in [`NodeEvent::target`].
//!
//! ## Run flow
//! ```text
//! run()
//!   ├─ no body ─────────────► todo (options.todo) | ignored
//!   ├─ to_skip() ───────────► skipped
//!   ├─ options.todo ────────► todo
//!   └─ in-progress ─► invoke(body, fresh TestContext)
//!        ├─ Ready(Ok)  ─────► pass
//!        ├─ Ready(Err) ─────► fail
//!        └─ Pending(fut) ─► timeout(options.timeout, fut)
//!              ├─ Ok      ──► pass
//!              └─ Err / panic / elapsed ─► fail
//! ```
//!
//! ## Rules
//! - Builder calls reject a sibling name already in use; `add`/`prepend` do not.
//! - Indexes are 1-based and recomputed on each insert/remove.
//! - Only-mode is tree-wide: once any node has `only`, every other node is `disabled_by_only`.
//!   Recomputed with a full tree walk per insertion (O(n²) to build n tests).
//! - Locks are never held while listeners run or across an `.await`.

use std::fmt;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};

use futures::FutureExt;
use serde_json::Value;
use tokio::time::Instant;
use tracing::trace;

use crate::core::TestStats;
use crate::error::{StateError, TestError, TreeError};
use crate::events::{Emitter, ListenerId, NodeEvent, NodeEventKind};
use crate::node::test_fn::panicked;
use crate::node::{Invocation, Outcome, TestContext, TestFn, TestOptions};
use crate::state::{State, StateMachine, TestState};
use crate::tree::Composite;

/// Name given to nodes created without one.
const DEFAULT_NAME: &str = "tom";

/// Derived classification of a node.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NodeKind {
    Test,
    Group,
    Todo,
}

/// Mutable per-run state of a node.
#[derive(Debug)]
struct NodeInner {
    machine: StateMachine<TestState>,
    index: usize,
    disabled_by_only: bool,
    ended: bool,
    result: Option<Outcome>,
    stats: TestStats,
    context: Option<TestContext>,
}

impl NodeInner {
    fn new() -> Self {
        Self {
            machine: StateMachine::new(TestState::Pending, TestState::MOVES),
            index: 1,
            disabled_by_only: false,
            ended: false,
            result: None,
            stats: TestStats::default(),
            context: None,
        }
    }
}

/// A node of the test object model.
pub struct TestNode {
    name: String,
    body: Option<TestFn>,
    options: TestOptions,
    parent: RwLock<Weak<TestNode>>,
    children: RwLock<Vec<Arc<TestNode>>>,
    inner: Mutex<NodeInner>,
    events: Emitter<NodeEvent>,
}

impl TestNode {
    /// Creates a detached node without a body (a suite root or group).
    ///
    /// An empty name becomes `"tom"`.
    pub fn new(name: impl Into<String>) -> Arc<Self> {
        Self::detached(name, None, TestOptions::default())
    }

    /// Creates a detached node without a body, with options.
    pub fn with_options(name: impl Into<String>, options: TestOptions) -> Arc<Self> {
        Self::detached(name, None, options)
    }

    /// Creates a detached node.
    pub fn detached(
        name: impl Into<String>,
        body: Option<TestFn>,
        options: TestOptions,
    ) -> Arc<Self> {
        let mut name = name.into();
        if name.is_empty() {
            name = DEFAULT_NAME.to_string();
        }
        Arc::new(Self {
            name,
            body,
            options,
            parent: RwLock::new(Weak::new()),
            children: RwLock::new(Vec::new()),
            inner: Mutex::new(NodeInner::new()),
            events: Emitter::new(),
        })
    }

    // ---- Accessors ----

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn body(&self) -> Option<&TestFn> {
        self.body.as_ref()
    }

    pub fn has_body(&self) -> bool {
        self.body.is_some()
    }

    pub fn options(&self) -> &TestOptions {
        &self.options
    }

    pub fn state(&self) -> TestState {
        self.lock().machine.state()
    }

    /// 1-based position among siblings.
    pub fn index(&self) -> usize {
        self.lock().index
    }

    /// True if another node in the tree is marked `only` and this one is not.
    pub fn disabled_by_only(&self) -> bool {
        self.lock().disabled_by_only
    }

    /// True if this node will be skipped (by `skip` or by only-mode).
    pub fn to_skip(&self) -> bool {
        self.disabled_by_only() || self.options.skip
    }

    /// True once the node reached `pass` or `fail`.
    pub fn ended(&self) -> bool {
        self.lock().ended
    }

    /// The returned value (pass) or the failure (fail); `None` until settled.
    pub fn result(&self) -> Option<Outcome> {
        self.lock().result.clone()
    }

    pub fn stats(&self) -> TestStats {
        self.lock().stats
    }

    /// Context of the latest execution.
    pub fn context(&self) -> Option<TestContext> {
        self.lock().context.clone()
    }

    /// `test`, `group` or `todo`.
    pub fn kind(&self) -> NodeKind {
        if self.options.group {
            return NodeKind::Group;
        }
        if self.options.todo {
            return NodeKind::Todo;
        }
        let has_children = !self.read_children().is_empty();
        match (self.has_body(), has_children) {
            (true, false) => NodeKind::Test,
            (false, true) => NodeKind::Group,
            _ => NodeKind::Todo,
        }
    }

    // ---- Builder API ----

    /// Adds a test with a body and default options.
    pub fn test(
        self: &Arc<Self>,
        name: impl Into<String>,
        body: TestFn,
    ) -> Result<Arc<TestNode>, TreeError> {
        self.test_with(name, Some(body), TestOptions::default())
    }

    /// Adds a child node; rejects a name already used by a sibling.
    ///
    /// The general form behind every builder shortcut: `skip`, `only`, `before`,
    /// `after` and `todo` only preset a flag on `options`.
    pub fn test_with(
        self: &Arc<Self>,
        name: impl Into<String>,
        body: Option<TestFn>,
        options: TestOptions,
    ) -> Result<Arc<TestNode>, TreeError> {
        let child = TestNode::detached(name, body, options);
        if self.read_children().iter().any(|c| c.name == child.name) {
            return Err(TreeError::DuplicateName {
                name: child.name.clone(),
            });
        }
        self.add(child)
    }

    /// Adds a group.
    pub fn group(self: &Arc<Self>, name: impl Into<String>) -> Result<Arc<TestNode>, TreeError> {
        self.group_with(name, TestOptions::default())
    }

    /// Adds a group with options.
    pub fn group_with(
        self: &Arc<Self>,
        name: impl Into<String>,
        options: TestOptions,
    ) -> Result<Arc<TestNode>, TreeError> {
        self.test_with(name, None, options.with_group())
    }

    /// Adds a test that will be skipped.
    pub fn skip(
        self: &Arc<Self>,
        name: impl Into<String>,
        body: TestFn,
    ) -> Result<Arc<TestNode>, TreeError> {
        self.skip_with(name, Some(body), TestOptions::default())
    }

    pub fn skip_with(
        self: &Arc<Self>,
        name: impl Into<String>,
        body: Option<TestFn>,
        options: TestOptions,
    ) -> Result<Arc<TestNode>, TreeError> {
        self.test_with(name, body, options.with_skip())
    }

    /// Adds a test that disables every non-`only` test of the tree.
    pub fn only(
        self: &Arc<Self>,
        name: impl Into<String>,
        body: TestFn,
    ) -> Result<Arc<TestNode>, TreeError> {
        self.only_with(name, Some(body), TestOptions::default())
    }

    pub fn only_with(
        self: &Arc<Self>,
        name: impl Into<String>,
        body: Option<TestFn>,
        options: TestOptions,
    ) -> Result<Arc<TestNode>, TreeError> {
        self.test_with(name, body, options.with_only())
    }

    /// Adds a test that must complete before its siblings start.
    pub fn before(
        self: &Arc<Self>,
        name: impl Into<String>,
        body: TestFn,
    ) -> Result<Arc<TestNode>, TreeError> {
        self.before_with(name, Some(body), TestOptions::default())
    }

    /// [`TestNode::before`] with a custom timeout, concurrency or flags.
    pub fn before_with(
        self: &Arc<Self>,
        name: impl Into<String>,
        body: Option<TestFn>,
        options: TestOptions,
    ) -> Result<Arc<TestNode>, TreeError> {
        self.test_with(name, body, options.with_before())
    }

    /// Adds a test that starts after its siblings completed.
    pub fn after(
        self: &Arc<Self>,
        name: impl Into<String>,
        body: TestFn,
    ) -> Result<Arc<TestNode>, TreeError> {
        self.after_with(name, Some(body), TestOptions::default())
    }

    pub fn after_with(
        self: &Arc<Self>,
        name: impl Into<String>,
        body: Option<TestFn>,
        options: TestOptions,
    ) -> Result<Arc<TestNode>, TreeError> {
        self.test_with(name, body, options.with_after())
    }

    /// Adds an incomplete test; it is never executed.
    pub fn todo(self: &Arc<Self>, name: impl Into<String>) -> Result<Arc<TestNode>, TreeError> {
        self.todo_with(name, None, TestOptions::default())
    }

    /// Adds a todo that keeps its (unexecuted) body.
    pub fn todo_with(
        self: &Arc<Self>,
        name: impl Into<String>,
        body: Option<TestFn>,
        options: TestOptions,
    ) -> Result<Arc<TestNode>, TreeError> {
        self.test_with(name, body, options.with_todo())
    }

    /// Merges several trees under a new root named `name` (`"tom"` when `None`).
    ///
    /// Every tree must be detached and valid; nothing is attached unless all are.
    /// Trees may share a name. A single tree is returned unchanged. Only-flags are
    /// recomputed in both cases.
    pub fn combine(
        trees: Vec<Arc<TestNode>>,
        name: Option<&str>,
        options: TestOptions,
    ) -> Result<Arc<TestNode>, TreeError> {
        for tree in &trees {
            if tree.parent().is_some() {
                return Err(TreeError::Attached {
                    name: tree.name.clone(),
                });
            }
            Self::validate(tree)?;
        }
        let root = if trees.len() > 1 {
            let root = TestNode::with_options(name.unwrap_or_default(), options);
            for tree in trees {
                root.add(tree)?;
            }
            root
        } else {
            trees.into_iter().next().ok_or(TreeError::Empty)?
        };
        root.refresh_only();
        Ok(root)
    }

    /// Checks that no node of `tree` has run yet.
    ///
    /// `tree` may be a subtree; it is checked from itself down.
    pub fn validate(tree: &Arc<TestNode>) -> Result<(), TreeError> {
        match tree.iter().find(|n| n.state() != TestState::Pending) {
            Some(stale) => Err(TreeError::Invalid {
                name: stale.name.clone(),
                reason: "has already run",
            }),
            None => Ok(()),
        }
    }

    // ---- Tree mutation ----

    /// Appends `child`, setting its parent.
    pub fn add(self: &Arc<Self>, child: Arc<TestNode>) -> Result<Arc<TestNode>, TreeError> {
        self.insert(child, false)
    }

    /// Alias of [`TestNode::add`].
    pub fn append(self: &Arc<Self>, child: Arc<TestNode>) -> Result<Arc<TestNode>, TreeError> {
        self.insert(child, false)
    }

    /// Inserts `child` as the first child.
    pub fn prepend(self: &Arc<Self>, child: Arc<TestNode>) -> Result<Arc<TestNode>, TreeError> {
        self.insert(child, true)
    }

    /// Removes `child` (by identity) and detaches it. Returns `false` if it was not a child.
    pub fn remove(self: &Arc<Self>, child: &Arc<TestNode>) -> bool {
        let removed = {
            let mut children = self.write_children();
            match children.iter().position(|c| Arc::ptr_eq(c, child)) {
                Some(pos) => {
                    children.remove(pos);
                    Self::reindex(&children);
                    true
                }
                None => false,
            }
        };
        if removed {
            *child.parent.write().unwrap_or_else(PoisonError::into_inner) = Weak::new();
            self.refresh_only();
            child.refresh_only();
        }
        removed
    }

    fn insert(
        self: &Arc<Self>,
        child: Arc<TestNode>,
        front: bool,
    ) -> Result<Arc<TestNode>, TreeError> {
        if child.parent().is_some() {
            return Err(TreeError::Attached {
                name: child.name.clone(),
            });
        }
        if Arc::ptr_eq(self, &child) || self.parents().iter().any(|p| Arc::ptr_eq(p, &child)) {
            return Err(TreeError::Cycle {
                name: child.name.clone(),
            });
        }

        {
            let mut children = self.write_children();
            *child.parent.write().unwrap_or_else(PoisonError::into_inner) = Arc::downgrade(self);
            if front {
                children.insert(0, Arc::clone(&child));
            } else {
                children.push(Arc::clone(&child));
            }
            Self::reindex(&children);
        }

        self.refresh_only();
        Ok(child)
    }

    fn reindex(children: &[Arc<TestNode>]) {
        for (pos, c) in children.iter().enumerate() {
            c.lock().index = pos + 1;
        }
    }

    /// Recomputes `disabled_by_only` for the whole tree.
    fn refresh_only(self: &Arc<Self>) {
        let root = self.root();
        let only_exists = root.iter().any(|n| n.options.only);
        for node in root.iter() {
            node.lock().disabled_by_only = only_exists && !node.options.only;
        }
    }

    // ---- Events ----

    /// Registers a listener for `kind` on this node; it also sees descendants' events.
    pub fn on<F>(&self, kind: NodeEventKind, handler: F) -> ListenerId
    where
        F: Fn(&NodeEvent) + Send + Sync + 'static,
    {
        self.events.on(kind, handler)
    }

    /// Registers a listener for every event of this node and its descendants.
    pub fn on_any<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&NodeEvent) + Send + Sync + 'static,
    {
        self.events.on_any(handler)
    }

    /// Registers a listener for the next event of `kind`.
    pub fn once<F>(&self, kind: NodeEventKind, handler: F) -> ListenerId
    where
        F: Fn(&NodeEvent) + Send + Sync + 'static,
    {
        self.events.once(kind, handler)
    }

    /// Registers a listener for the next event of any kind.
    pub fn once_any<F>(&self, handler: F) -> ListenerId
    where
        F: Fn(&NodeEvent) + Send + Sync + 'static,
    {
        self.events.once_any(handler)
    }

    /// Removes a listener registered on this node.
    pub fn off(&self, id: ListenerId) -> bool {
        self.events.off(id)
    }

    /// Dispatches `event` here, then on every ancestor (nearest first).
    pub fn emit(&self, event: NodeEvent) {
        self.events.emit(&event);
        for ancestor in self.parents() {
            ancestor.events.emit(&event);
        }
    }

    /// Moves to `to`, then emits `state`, the state-named event and (for pass/fail) `end`.
    fn set_state(
        self: &Arc<Self>,
        to: TestState,
        result: Option<Value>,
        error: Option<TestError>,
    ) -> Result<(), StateError> {
        let transition = {
            let mut inner = self.lock();
            let transition = inner.machine.set_state(to)?;
            if transition.is_some() && to.is_ended() {
                inner.ended = true;
            }
            transition
        };
        let Some(transition) = transition else {
            return Ok(());
        };

        trace!(
            test = %self.name,
            from = transition.from.as_str(),
            to = to.as_str(),
            "state change"
        );
        self.emit(
            NodeEvent::new(NodeEventKind::State, Arc::clone(self))
                .with_state(to)
                .with_prev(transition.from),
        );
        if let Some(kind) = NodeEventKind::for_state(to) {
            self.emit(
                NodeEvent::new(kind, Arc::clone(self))
                    .with_state(to)
                    .with_result(result)
                    .with_error(error),
            );
        }
        if to.is_ended() {
            self.emit(NodeEvent::new(NodeEventKind::End, Arc::clone(self)));
        }
        Ok(())
    }

    // ---- Execution ----

    /// Executes the node once.
    ///
    /// Returns `Ok(Some(value))` on pass, `Ok(None)` when the node was skipped, ignored
    /// or todo, and `Err` on failure (the same error is stored as the node's result).
    pub async fn run(self: &Arc<Self>) -> Result<Option<Value>, TestError> {
        let Some(body) = self.body.clone() else {
            let to = if self.options.todo {
                TestState::Todo
            } else {
                TestState::Ignored
            };
            self.set_state(to, None, None)?;
            return Ok(None);
        };

        if self.to_skip() {
            self.set_state(TestState::Skipped, None, None)?;
            return Ok(None);
        }
        if self.options.todo {
            self.set_state(TestState::Todo, None, None)?;
            return Ok(None);
        }

        self.set_state(TestState::InProgress, None, None)?;
        let ctx = {
            let mut inner = self.lock();
            inner.stats.begin(Instant::now());
            let ctx = TestContext::new(self.name.as_str(), inner.index);
            inner.context = Some(ctx.clone());
            ctx
        };

        let outcome = match body.invoke(ctx) {
            Invocation::Ready(outcome) => outcome,
            Invocation::Pending(fut) => {
                let timeout = self.options.timeout();
                match tokio::time::timeout(timeout, AssertUnwindSafe(fut).catch_unwind()).await {
                    Ok(Ok(outcome)) => outcome,
                    Ok(Err(panic)) => Err(panicked(panic)),
                    Err(_elapsed) => Err(TestError::Timeout { timeout }),
                }
            }
        };
        self.settle(outcome)
    }

    fn settle(self: &Arc<Self>, outcome: Outcome) -> Result<Option<Value>, TestError> {
        {
            let mut inner = self.lock();
            inner.stats.finish(Instant::now());
            inner.result = Some(outcome.clone());
        }
        match outcome {
            Ok(value) => {
                self.set_state(TestState::Pass, Some(value.clone()), None)?;
                Ok(Some(value))
            }
            Err(err) => {
                self.set_state(TestState::Fail, None, Some(err.clone()))?;
                Err(err)
            }
        }
    }

    // ---- Reset ----

    /// Returns this node to `pending` and clears per-run data; emits `reset`.
    pub fn reset(self: &Arc<Self>) {
        let prev = {
            let mut inner = self.lock();
            inner.index = 1;
            inner.disabled_by_only = false;
            inner.ended = false;
            inner.result = None;
            inner.stats = TestStats::default();
            inner.context = None;
            inner.machine.reset()
        };
        self.emit(NodeEvent::new(NodeEventKind::Reset, Arc::clone(self)).with_prev(prev));
    }

    /// Resets every node of the subtree, this one included.
    pub fn reset_deep(self: &Arc<Self>) {
        for node in self.iter() {
            node.reset();
        }
    }

    // ---- Locks ----

    fn lock(&self) -> MutexGuard<'_, NodeInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read_children(&self) -> std::sync::RwLockReadGuard<'_, Vec<Arc<TestNode>>> {
        self.children.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_children(&self) -> std::sync::RwLockWriteGuard<'_, Vec<Arc<TestNode>>> {
        self.children.write().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Composite for TestNode {
    fn parent(&self) -> Option<Arc<Self>> {
        self.parent
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .upgrade()
    }

    fn children(&self) -> Vec<Arc<Self>> {
        self.read_children().clone()
    }
}

impl fmt::Display for TestNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

impl fmt::Debug for TestNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TestNode")
            .field("name", &self.name)
            .field("state", &self.state())
            .field("index", &self.index())
            .field("children", &self.read_children().len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn ok() -> TestFn {
        TestFn::sync(|_| Ok(()))
    }

    fn recorder(node: &TestNode) -> Arc<Mutex<Vec<String>>> {
        let log = Arc::new(Mutex::new(Vec::new()));
        let l = log.clone();
        node.on_any(move |ev| {
            l.lock()
                .unwrap()
                .push(format!("{}:{}", ev.target.name(), ev.kind));
        });
        log
    }

    #[test]
    fn builder_sets_parent_and_index() {
        let root = TestNode::new("");
        assert_eq!(root.name(), "tom");
        let one = root.test("one", ok()).unwrap();
        let two = root.test("two", ok()).unwrap();
        assert_eq!((one.index(), two.index()), (1, 2));
        assert!(Arc::ptr_eq(&two.parent().unwrap(), &root));
        assert_eq!(two.level(), 1);
    }

    #[test]
    fn duplicate_sibling_name_is_rejected() {
        let root = TestNode::new("root");
        root.test("one", ok()).unwrap();
        let err = root.test("one", ok()).unwrap_err();
        assert_eq!(err, TreeError::DuplicateName { name: "one".into() });
        assert_eq!(root.children().len(), 1);

        // same name under a different parent is fine
        let group = root.group("group").unwrap();
        group.test("one", ok()).unwrap();
    }

    #[test]
    fn attached_and_cyclic_children_are_rejected() {
        let root = TestNode::new("root");
        let group = root.group("group").unwrap();
        let other = TestNode::new("other");
        assert!(matches!(other.add(group.clone()), Err(TreeError::Attached { .. })));

        let detached = TestNode::new("loop");
        assert!(matches!(detached.add(detached.clone()), Err(TreeError::Cycle { .. })));
        group.group("child").unwrap();
        assert!(matches!(group.add(root.clone()), Err(TreeError::Cycle { .. })));
    }

    #[test]
    fn prepend_and_remove_reindex() {
        let root = TestNode::new("root");
        let b = root.test("b", ok()).unwrap();
        let a = root
            .prepend(TestNode::detached("a", Some(ok()), TestOptions::default()))
            .unwrap();
        assert_eq!((a.index(), b.index()), (1, 2));

        assert!(root.remove(&a));
        assert!(!root.remove(&a));
        assert!(a.parent().is_none());
        assert_eq!(b.index(), 1);
        assert_eq!(root.tree(), "- root\n  - b\n");
    }

    #[test]
    fn only_is_tree_wide() {
        let root = TestNode::new("root");
        let g1 = root.group("g1").unwrap();
        let a = g1.test("a", ok()).unwrap();
        let g2 = root.group("g2").unwrap();
        assert!(!a.disabled_by_only());

        let focused = g2.only("focused", ok()).unwrap();
        assert!(a.disabled_by_only());
        assert!(a.to_skip());
        assert!(root.disabled_by_only());
        assert!(!focused.disabled_by_only());

        // nodes added later are disabled too
        let late = g1.test("late", ok()).unwrap();
        assert!(late.disabled_by_only());

        // removing the only node lifts the filter
        assert!(g2.remove(&focused));
        assert!(!a.disabled_by_only());
    }

    #[test]
    fn kind_is_derived() {
        let root = TestNode::new("root");
        let t = root.test("t", ok()).unwrap();
        let g = root.group("g").unwrap();
        let todo = root.todo("todo").unwrap();
        let bare = root.test_with("bare", None, TestOptions::default()).unwrap();
        assert_eq!(t.kind(), NodeKind::Test);
        assert_eq!(g.kind(), NodeKind::Group);
        assert_eq!(todo.kind(), NodeKind::Todo);
        assert_eq!(bare.kind(), NodeKind::Todo);
        assert_eq!(root.kind(), NodeKind::Group);
    }

    #[tokio::test]
    async fn passing_sync_test() {
        let body = TestFn::sync(|ctx| Ok(ctx.index() as u64));
        let node = TestNode::detached("sync", Some(body), TestOptions::default());
        let log = recorder(&node);
        assert_eq!(node.run().await, Ok(Some(Value::from(1u64))));
        assert_eq!(node.state(), TestState::Pass);
        assert!(node.ended());
        assert_eq!(node.result(), Some(Ok(Value::from(1u64))));
        assert_eq!(
            *log.lock().unwrap(),
            ["sync:state", "sync:in-progress", "sync:state", "sync:pass", "sync:end"]
        );
    }

    #[tokio::test]
    async fn failing_sync_test_reports_like_async() {
        let node = TestNode::detached(
            "broken",
            Some(TestFn::sync(|_| Err::<(), _>(TestError::from("broken")))),
            TestOptions::default(),
        );
        let err = node.run().await.unwrap_err();
        assert_eq!(err, TestError::failed("broken"));
        assert_eq!(node.state(), TestState::Fail);
        assert_eq!(node.result(), Some(Err(err)));
    }

    #[tokio::test(start_paused = true)]
    async fn async_timeout_fails() {
        let node = TestNode::detached(
            "hang",
            Some(TestFn::future(|_| futures::future::pending::<Result<(), TestError>>())),
            TestOptions::default().with_timeout(Duration::from_millis(50)),
        );
        let started = Instant::now();
        let err = node.run().await.unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.to_string(), "Timeout expired [50]");
        assert_eq!(node.state(), TestState::Fail);
        let elapsed = started.elapsed();
        assert!(elapsed >= Duration::from_millis(50) && elapsed < Duration::from_millis(100));
        assert_eq!(node.stats().duration, elapsed);
    }

    #[tokio::test]
    async fn async_panic_fails() {
        let node = TestNode::detached(
            "panics",
            Some(TestFn::future(|_| async {
                if true {
                    panic!("inside");
                }
                Ok::<_, TestError>(())
            })),
            TestOptions::default(),
        );
        let err = node.run().await.unwrap_err();
        assert_eq!(err, TestError::Panicked { message: "inside".into() });
    }

    #[tokio::test]
    async fn bodiless_nodes_settle_without_running() {
        let root = TestNode::new("root");
        let ignored = root.test_with("ignored", None, TestOptions::default()).unwrap();
        let todo = root.todo("todo").unwrap();
        let todo_body = root
            .test_with("todo-body", Some(ok()), TestOptions::default().with_todo())
            .unwrap();
        let skipped = root.skip("skipped", ok()).unwrap();

        for node in [&ignored, &todo, &todo_body, &skipped] {
            assert_eq!(node.run().await, Ok(None));
            assert!(!node.ended());
        }
        assert_eq!(ignored.state(), TestState::Ignored);
        assert_eq!(todo.state(), TestState::Todo);
        assert_eq!(todo_body.state(), TestState::Todo);
        assert_eq!(skipped.state(), TestState::Skipped);
    }

    #[tokio::test]
    async fn running_twice_is_an_invalid_move() {
        let node = TestNode::detached("once", Some(ok()), TestOptions::default());
        node.run().await.unwrap();
        let err = node.run().await.unwrap_err();
        assert!(matches!(err, TestError::State(StateError::InvalidMove { .. })));
        assert_eq!(node.state(), TestState::Pass);
    }

    #[tokio::test]
    async fn context_is_fresh_per_run() {
        let node = TestNode::detached(
            "ctx",
            Some(TestFn::sync(|ctx| {
                assert!(ctx.data().is_none());
                ctx.set_data(serde_json::json!({ "n": 1 }));
                Ok(())
            })),
            TestOptions::default(),
        );
        node.run().await.unwrap();
        assert_eq!(node.context().unwrap().data(), Some(serde_json::json!({ "n": 1 })));
        node.reset();
        assert!(node.context().is_none());
        node.run().await.unwrap();
    }

    #[tokio::test]
    async fn reset_reproduces_transitions() {
        let node = TestNode::detached("again", Some(ok()), TestOptions::default());
        let log = recorder(&node);
        node.run().await.unwrap();
        let first: Vec<String> = log.lock().unwrap().drain(..).collect();

        node.reset();
        assert_eq!(node.state(), TestState::Pending);
        assert!(!node.ended());
        assert_eq!(log.lock().unwrap().drain(..).collect::<Vec<_>>(), ["again:reset"]);

        node.run().await.unwrap();
        assert_eq!(*log.lock().unwrap(), first);
    }

    #[tokio::test]
    async fn deep_reset_covers_subtree() {
        let root = TestNode::new("root");
        let group = root.group("group").unwrap();
        let leaf = group.test("leaf", ok()).unwrap();
        root.run().await.unwrap();
        group.run().await.unwrap();
        leaf.run().await.unwrap();

        root.reset_deep();
        for node in root.iter() {
            assert_eq!(node.state(), TestState::Pending);
            assert_eq!(node.index(), 1);
        }
    }

    #[tokio::test]
    async fn events_bubble_with_target() {
        let root = TestNode::new("root");
        let group = root.group("group").unwrap();
        let leaf = group.test("leaf", ok()).unwrap();

        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        root.on(NodeEventKind::Pass, move |ev| {
            s.lock().unwrap().push(Arc::clone(&ev.target));
        });

        leaf.run().await.unwrap();
        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(Arc::ptr_eq(&seen[0], &leaf));
    }

    #[test]
    fn combine_merges_or_validates() {
        let a = TestNode::new("a");
        let b = TestNode::new("b");
        b.only("focused", ok()).unwrap();
        let a_test = a.test("t", ok()).unwrap();

        let root = TestNode::combine(vec![a.clone(), b], Some("all"), TestOptions::default()).unwrap();
        assert_eq!(root.name(), "all");
        assert_eq!(root.children().len(), 2);
        assert!(a_test.disabled_by_only());

        let single = TestNode::new("single");
        let same = TestNode::combine(vec![single.clone()], None, TestOptions::default()).unwrap();
        assert!(Arc::ptr_eq(&single, &same));

        assert_eq!(
            TestNode::combine(vec![], None, TestOptions::default()).unwrap_err(),
            TreeError::Empty
        );
        assert!(matches!(
            TestNode::combine(vec![a], None, TestOptions::default()),
            Err(TreeError::Attached { .. })
        ));
    }

    #[test]
    fn combine_accepts_suites_with_the_same_name() {
        let first = TestNode::new("");
        first.test("x", ok()).unwrap();
        let second = TestNode::new("");
        second.test("y", ok()).unwrap();

        let root = TestNode::combine(vec![first.clone(), second.clone()], None, TestOptions::default())
            .unwrap();
        assert_eq!(root.name(), "tom");
        assert_eq!(root.children().len(), 2);
        assert_eq!((first.index(), second.index()), (1, 2));
        assert_eq!(root.tree(), "- tom\n  - tom\n    - x\n  - tom\n    - y\n");
    }

    #[tokio::test]
    async fn failed_combine_attaches_nothing() {
        let fresh = TestNode::new("fresh");
        fresh.test("x", ok()).unwrap();
        let stale = TestNode::new("stale");
        stale.run().await.unwrap();

        let err = TestNode::combine(vec![fresh.clone(), stale], None, TestOptions::default())
            .unwrap_err();
        assert!(matches!(err, TreeError::Invalid { .. }));
        assert!(fresh.parent().is_none());
        assert_eq!(fresh.index(), 1);
    }

    #[test]
    fn raw_add_allows_duplicate_names() {
        let root = TestNode::new("root");
        root.test("one", ok()).unwrap();
        root.add(TestNode::detached("one", Some(ok()), TestOptions::default()))
            .unwrap();
        assert_eq!(root.children().len(), 2);
        assert!(matches!(
            root.before("one", ok()),
            Err(TreeError::DuplicateName { .. })
        ));
    }

    #[test]
    fn shortcut_variants_keep_custom_options() {
        let root = TestNode::new("root");
        let slow = TestOptions::default().with_timeout(Duration::from_secs(9));

        let setup = root.before_with("setup", Some(ok()), slow.clone()).unwrap();
        assert!(setup.options().before);
        assert_eq!(setup.options().timeout, Duration::from_secs(9));

        let teardown = root.after_with("teardown", Some(ok()), slow.clone()).unwrap();
        assert!(teardown.options().after);
        let skipped = root.skip_with("skipped", None, slow.clone()).unwrap();
        assert!(skipped.to_skip());
        let later = root.todo_with("later", Some(ok()), slow).unwrap();
        assert!(later.has_body());
        assert_eq!(later.kind(), NodeKind::Todo);

        let focused = root
            .only_with("focused", Some(ok()), TestOptions::default())
            .unwrap();
        assert!(!focused.to_skip());
        assert!(setup.disabled_by_only());
    }

    #[tokio::test]
    async fn once_any_sees_the_first_event_only() {
        let node = TestNode::detached("t", Some(ok()), TestOptions::default());
        let first = Arc::new(Mutex::new(Vec::new()));
        let f = first.clone();
        node.once_any(move |ev| f.lock().unwrap().push(ev.kind));

        node.run().await.unwrap();
        assert_eq!(*first.lock().unwrap(), [NodeEventKind::State]);
    }
}
