//! The assertion chain engine.
//!
//! # Architecture
//!
//! A [`Chain`] is one node in a tree of assertion scopes. Every matcher call
//! derives a short-lived child with [`Chain::enter`], checks something,
//! possibly calls [`Chain::fail`], and finishes with [`Chain::leave`].
//!
//! - Context flows down: children copy the parent's context and extend
//!   their own path.
//! - Failure flows up: `fail` is reported to the handler immediately, and
//!   `leave` on a failed node marks every ancestor as having a failed
//!   descendant so none of them reports success.
//!
//! # Lifecycle
//!
//! ```text
//!   clone() ──► Cloned ──enter()──► Entered ──leave()──► Left
//!                 │                   │
//!           set_alias, ...        fail, replace
//! ```
//!
//! # Ownership
//!
//! Nodes are reference counted. A child holds a strong link to its parent;
//! parents never link to children, so the graph is acyclic and nodes are
//! freed as soon as the last child façade is dropped.
//!
//! # Locking
//!
//! Every node has its own mutex. Propagation locks one ancestor at a time
//! while walking towards the root, and the handler is always called with no
//! chain lock held, so a handler that panics (fatal reporting) cannot
//! deadlock the tree.
//!
//! # Validation
//!
//! Lifecycle misuse (failing a chain that was never entered, leaving twice,
//! setting the request twice) panics when validation is enabled and is
//! tolerated with a `tracing` warning otherwise. Validation is fixed when
//! the root is built and inherited by every descendant.

use crate::context::AssertionContext;
use crate::handler::AssertionHandler;
use crate::models::{AssertionFailure, Severity};
use crate::transport::{Request, Response};
use std::fmt;
use std::ops::Deref;
use std::sync::{Arc, Mutex, MutexGuard};

// ============================================================================
// Node State
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChainState {
    Cloned,
    Entered,
    Left,
}

impl ChainState {
    const fn name(self) -> &'static str {
        match self {
            Self::Cloned => "cloned",
            Self::Entered => "entered",
            Self::Left => "left",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct FailFlags(u8);

impl FailFlags {
    const SELF_FAILED: u8 = 0b01;
    const DESCENDANT_FAILED: u8 = 0b10;

    #[inline]
    fn contains(self, flag: u8) -> bool {
        self.0 & flag != 0
    }

    #[inline]
    fn insert(&mut self, flag: u8) {
        self.0 |= flag;
    }

    #[inline]
    fn any(self) -> bool {
        self.0 != 0
    }

    /// Flags a freshly derived child starts with.
    #[inline]
    fn inherited(self) -> Self {
        Self(self.0 & Self::SELF_FAILED)
    }
}

struct NodeState {
    parent: Option<Arc<ChainNode>>,
    state: ChainState,
    flags: FailFlags,
    severity: Severity,
    context: AssertionContext,
}

struct ChainNode {
    inner: Mutex<NodeState>,
    handler: Arc<dyn AssertionHandler>,
    validation: bool,
}

impl ChainNode {
    #[inline]
    fn lock(&self) -> MutexGuard<'_, NodeState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

// ============================================================================
// Chain
// ============================================================================

/// A node in the assertion-scope tree.
///
/// `Chain` is `Send + Sync`; distinct trees never share a lock, and a single
/// tree may be used from several threads.
///
/// [`Clone::clone`] is the `clone` lifecycle operation: it derives a new
/// child node rather than sharing this one.
///
/// # Example
///
/// ```rust
/// use fluent_expect::{
///     AssertionContext, AssertionFailure, AssertionKind, Chain, Environment, RecordingHandler,
/// };
/// use std::sync::Arc;
///
/// let handler = Arc::new(RecordingHandler::new());
/// let root = Chain::new(
///     AssertionContext::new("doc", "Body()", Arc::new(Environment::new())),
///     handler.clone(),
/// );
///
/// let op = root.enter("IsEqual()");
/// op.fail(AssertionFailure::new(AssertionKind::Equal));
/// op.leave();
///
/// assert!(root.tree_failed());
/// assert!(!root.failed());
/// assert_eq!(handler.failure_count(), 1);
/// ```
pub struct Chain {
    node: Arc<ChainNode>,
}

impl Chain {
    /// Create a root chain. Validation follows `debug_assertions`.
    pub fn new(context: AssertionContext, handler: Arc<dyn AssertionHandler>) -> Self {
        Self::with_validation(context, handler, cfg!(debug_assertions))
    }

    /// Create a root chain with an explicit validation mode.
    pub fn with_validation(
        context: AssertionContext,
        handler: Arc<dyn AssertionHandler>,
        validation: bool,
    ) -> Self {
        Self::from_state(
            NodeState {
                parent: None,
                state: ChainState::Cloned,
                flags: FailFlags::default(),
                severity: Severity::default(),
                context,
            },
            handler,
            validation,
        )
    }

    fn from_state(state: NodeState, handler: Arc<dyn AssertionHandler>, validation: bool) -> Self {
        Self {
            node: Arc::new(ChainNode {
                inner: Mutex::new(state),
                handler,
                validation,
            }),
        }
    }

    #[inline]
    fn lock(&self) -> MutexGuard<'_, NodeState> {
        self.node.lock()
    }

    /// Report lifecycle misuse.
    ///
    /// Panics in validation mode unless the thread is already unwinding;
    /// otherwise logs and lets the caller continue best-effort.
    fn misuse(&self, operation: &str, state: ChainState, expected: &str) {
        if self.node.validation && !std::thread::panicking() {
            panic!(
                "fluent_expect: unexpected {}() on {} chain (expected {})",
                operation,
                state.name(),
                expected
            );
        }
        tracing::warn!(
            target: "fluent_expect::chain",
            operation,
            state = state.name(),
            expected,
            "chain lifecycle misuse"
        );
    }

    fn derive(&self, operation: &str) -> NodeState {
        let st = self.lock();
        if st.state == ChainState::Left {
            self.misuse(operation, st.state, "cloned or entered");
        }
        NodeState {
            parent: Some(Arc::clone(&self.node)),
            state: ChainState::Cloned,
            flags: st.flags.inherited(),
            severity: st.severity,
            context: st.context.clone(),
        }
    }

    fn child(&self, state: NodeState) -> Chain {
        Self::from_state(state, Arc::clone(&self.node.handler), self.node.validation)
    }

    // ------------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------------

    /// Derive a child in the entered state, appending `name` to both paths
    /// unless it formats to an empty string.
    pub fn enter(&self, name: impl fmt::Display) -> Chain {
        let name = name.to_string();
        let mut state = self.derive("enter");
        state.state = ChainState::Entered;
        if !name.is_empty() {
            state.context.push_segment(name);
        }
        self.child(state)
    }

    /// Like [`enter`](Self::enter), but overwrites the last path element.
    ///
    /// Used when a generic operation relabels itself once more is known,
    /// e.g. `Object()` becoming `Array()` after type detection.
    pub fn replace(&self, name: impl fmt::Display) -> Chain {
        {
            let st = self.lock();
            if st.state != ChainState::Entered {
                self.misuse("replace", st.state, "entered");
            } else if st.context.path.is_empty() || st.context.aliased_path.is_empty() {
                self.misuse("replace", st.state, "non-empty path");
            }
        }

        let mut state = self.derive("replace");
        state.state = ChainState::Entered;
        state.context.replace_segment(name.to_string());
        self.child(state)
    }

    /// Finalize this chain.
    ///
    /// Reports success if neither this chain nor any descendant failed;
    /// otherwise marks every ancestor as having a failed descendant.
    pub fn leave(&self) {
        let (parent, context) = {
            let mut st = self.lock();
            match st.state {
                ChainState::Entered => {}
                ChainState::Left => {
                    self.misuse("leave", st.state, "entered");
                    return;
                }
                ChainState::Cloned => self.misuse("leave", st.state, "entered"),
            }
            st.state = ChainState::Left;

            let context = if st.flags.any() {
                None
            } else {
                Some(st.context.clone())
            };
            (st.parent.clone(), context)
        };

        match context {
            Some(context) => {
                tracing::trace!(
                    target: "fluent_expect::chain",
                    path = %context.display_path(),
                    "assertion passed"
                );
                self.node.handler.success(&context);
            }
            None => Self::propagate(parent),
        }
    }

    fn propagate(mut next: Option<Arc<ChainNode>>) {
        let mut depth = 0usize;
        while let Some(node) = next {
            let mut st = node.lock();
            st.flags.insert(FailFlags::DESCENDANT_FAILED);
            next = st.parent.clone();
            depth += 1;
        }
        tracing::debug!(
            target: "fluent_expect::chain",
            ancestors = depth,
            "failure propagated"
        );
    }

    /// Record a failed check and report it immediately.
    ///
    /// Only the first failure on a chain is reported; later calls are
    /// absorbed. The chain's severity is stamped onto the description.
    pub fn fail(&self, mut failure: AssertionFailure) {
        let context = {
            let mut st = self.lock();
            if st.state != ChainState::Entered {
                self.misuse("fail", st.state, "entered");
            }
            if st.flags.contains(FailFlags::SELF_FAILED) {
                return;
            }
            st.flags.insert(FailFlags::SELF_FAILED);
            failure.set_severity(st.severity);
            st.context.clone()
        };

        tracing::debug!(
            target: "fluent_expect::chain",
            path = %context.display_path(),
            kind = ?failure.kind(),
            severity = %failure.severity(),
            "assertion failed"
        );
        self.node.handler.failure(&context, &failure);
    }

    // ------------------------------------------------------------------------
    // Configuration
    // ------------------------------------------------------------------------

    fn configure(&self, operation: &str, apply: impl FnOnce(&mut NodeState)) {
        let mut st = self.lock();
        if st.state == ChainState::Left {
            self.misuse(operation, st.state, "cloned or entered");
            return;
        }
        apply(&mut *st);
    }

    /// Detach from the parent so failures here never reach it.
    pub fn set_root(&self) {
        self.configure("set_root", |st| st.parent = None);
    }

    /// Set the severity stamped on failures of this chain and its
    /// future descendants.
    pub fn set_severity(&self, severity: Severity) {
        self.configure("set_severity", |st| st.severity = severity);
    }

    /// Collapse the aliased path to a single name. An empty alias
    /// restores the full path.
    pub fn set_alias(&self, alias: impl Into<String>) {
        let alias = alias.into();
        self.configure("set_alias", |st| st.context.set_alias(alias));
    }

    /// Name the request shown in failure messages.
    pub fn set_request_name(&self, name: impl Into<String>) {
        let name = name.into();
        self.configure("set_request_name", |st| st.context.request_name = Some(name));
    }

    /// Attach the request under test. Single assignment.
    pub fn set_request(&self, request: impl Into<Arc<Request>>) {
        let request = request.into();
        let mut st = self.lock();
        if st.state == ChainState::Left {
            self.misuse("set_request", st.state, "cloned or entered");
            return;
        }
        if st.context.request.is_some() {
            self.misuse("set_request", st.state, "request not yet set");
            return;
        }
        st.context.request = Some(request);
    }

    /// Attach the response under test. Single assignment.
    pub fn set_response(&self, response: impl Into<Arc<Response>>) {
        let response = response.into();
        let mut st = self.lock();
        if st.state == ChainState::Left {
            self.misuse("set_response", st.state, "cloned or entered");
            return;
        }
        if st.context.response.is_some() {
            self.misuse("set_response", st.state, "response not yet set");
            return;
        }
        st.context.response = Some(response);
    }

    // ------------------------------------------------------------------------
    // Queries
    // ------------------------------------------------------------------------

    /// Whether this chain itself failed (or inherited a failure on clone).
    #[inline]
    pub fn failed(&self) -> bool {
        self.lock().flags.contains(FailFlags::SELF_FAILED)
    }

    /// Whether this chain or any descendant failed.
    #[inline]
    pub fn tree_failed(&self) -> bool {
        self.lock().flags.any()
    }

    /// Snapshot of the context.
    pub fn context(&self) -> AssertionContext {
        self.lock().context.clone()
    }

    /// Snapshot of the full path.
    pub fn path(&self) -> Vec<String> {
        self.lock().context.path.to_vec()
    }

    /// Snapshot of the aliased path.
    pub fn aliased_path(&self) -> Vec<String> {
        self.lock().context.aliased_path.to_vec()
    }

    /// Current severity.
    #[inline]
    pub fn severity(&self) -> Severity {
        self.lock().severity
    }

    /// Whether the chain is between `enter` and `leave`.
    #[inline]
    pub fn is_entered(&self) -> bool {
        self.lock().state == ChainState::Entered
    }

    /// Whether `leave` has run.
    #[inline]
    pub fn is_left(&self) -> bool {
        self.lock().state == ChainState::Left
    }

    /// Whether lifecycle misuse panics.
    #[inline]
    pub fn validation(&self) -> bool {
        self.node.validation
    }

    // ------------------------------------------------------------------------
    // Scoped use
    // ------------------------------------------------------------------------

    /// [`enter`](Self::enter), returning a guard that leaves on drop.
    pub fn enter_scope(&self, name: impl fmt::Display) -> ChainGuard {
        ChainGuard {
            chain: self.enter(name),
        }
    }

    /// [`replace`](Self::replace), returning a guard that leaves on drop.
    pub fn replace_scope(&self, name: impl fmt::Display) -> ChainGuard {
        ChainGuard {
            chain: self.replace(name),
        }
    }
}

impl Clone for Chain {
    /// Derive a child in the cloned state.
    fn clone(&self) -> Self {
        let state = self.derive("clone");
        self.child(state)
    }
}

impl fmt::Debug for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let st = self.lock();
        f.debug_struct("Chain")
            .field("path", &st.context.path)
            .field("state", &st.state)
            .field("flags", &st.flags)
            .field("severity", &st.severity)
            .field("root", &st.parent.is_none())
            .finish()
    }
}

// ============================================================================
// Scope Guard
// ============================================================================

/// Entered chain that leaves when dropped.
///
/// Guarantees `leave` pairs with `enter` on early return and during
/// unwinding. Never call `leave` on the guarded chain yourself.
#[must_use = "dropping the guard immediately leaves the chain"]
pub struct ChainGuard {
    chain: Chain,
}

impl Deref for ChainGuard {
    type Target = Chain;

    #[inline]
    fn deref(&self) -> &Chain {
        &self.chain
    }
}

impl Drop for ChainGuard {
    fn drop(&mut self) {
        self.chain.leave();
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Environment;
    use crate::handler::RecordingHandler;
    use crate::models::{AssertionKind, AssertionValue};

    fn root_with(name: &str, validation: bool) -> (Chain, Arc<RecordingHandler>) {
        let handler = Arc::new(RecordingHandler::new());
        let context = AssertionContext::new("chain_test", name, Arc::new(Environment::new()));
        let chain = Chain::with_validation(context, handler.clone(), validation);
        (chain, handler)
    }

    fn root(name: &str) -> (Chain, Arc<RecordingHandler>) {
        root_with(name, true)
    }

    fn equal_failure() -> AssertionFailure {
        AssertionFailure::new(AssertionKind::Equal)
            .actual(AssertionValue::value("foo"))
            .expected(AssertionValue::value("bar"))
    }

    #[test]
    fn leave_reports_success_when_nothing_failed() {
        let (chain, handler) = root("Value()");
        let op = chain.enter("IsEqual()");
        op.leave();

        assert_eq!(handler.success_count(), 1);
        assert_eq!(handler.failure_count(), 0);
        assert_eq!(handler.successes()[0].path(), ["Value()", "IsEqual()"]);
        assert!(!chain.tree_failed());
    }

    #[test]
    fn equality_failure_scenario() {
        let (chain, handler) = root("Body()");
        let op = chain.enter("Equal()");
        op.fail(equal_failure());
        op.leave();

        let failures = handler.failures();
        assert_eq!(failures.len(), 1);
        let (ctx, failure) = &failures[0];
        assert_eq!(ctx.path(), ["Body()", "Equal()"]);
        assert_eq!(failure.actual_value(), Some(&AssertionValue::value("foo")));
        assert_eq!(failure.expected_value(), Some(&AssertionValue::value("bar")));
        assert!(chain.tree_failed());
        assert_eq!(handler.success_count(), 0);
    }

    #[test]
    fn fail_is_idempotent() {
        let (chain, handler) = root("Value()");
        let op = chain.enter("IsEqual()");
        op.fail(equal_failure());
        op.fail(AssertionFailure::new(AssertionKind::NotEqual));
        op.leave();

        assert_eq!(handler.failure_count(), 1);
        assert_eq!(handler.failures()[0].1.kind(), AssertionKind::Equal);
    }

    #[test]
    fn three_level_propagation() {
        let (root, handler) = root("Root()");
        let a = root.enter("A()");
        let b = a.enter("B()");
        let c = b.enter("C()");

        c.fail(equal_failure());
        c.leave();
        b.leave();
        a.leave();

        assert!(a.tree_failed());
        assert!(b.tree_failed());
        assert!(!a.failed());
        assert!(!b.failed());
        assert!(root.tree_failed());
        assert_eq!(handler.success_count(), 0);
        assert_eq!(handler.failure_count(), 1);
    }

    #[test]
    fn propagation_through_clone() {
        let (root, handler) = root("Value()");
        let op = root.enter("Object()");
        let object = op.clone();
        op.leave();

        let inner = object.enter("ContainsKey()");
        inner.fail(AssertionFailure::new(AssertionKind::ContainsKey));
        inner.leave();

        assert!(object.tree_failed());
        assert!(op.tree_failed());
        assert!(root.tree_failed());
        assert_eq!(handler.success_count(), 1);
    }

    #[test]
    fn clone_inherits_self_failed_only() {
        let (root, _) = root("Value()");
        let op = root.enter("Number()");
        let child = op.enter("Gt()");
        child.fail(AssertionFailure::new(AssertionKind::Gt));
        child.leave();

        assert!(op.tree_failed());
        assert!(!op.failed());
        let from_op = op.clone();
        assert!(!from_op.tree_failed());

        op.fail(AssertionFailure::new(AssertionKind::Type));
        let from_failed = op.clone();
        assert!(from_failed.failed());
        assert!(from_failed.tree_failed());
    }

    #[test]
    fn enter_extends_path_of_child_only() {
        let (root, _) = root("Value()");
        let op = root.enter("Number()");

        assert_eq!(op.path(), ["Value()", "Number()"]);
        assert_eq!(root.path(), ["Value()"]);
    }

    #[test]
    fn enter_with_empty_name_keeps_path() {
        let (root, _) = root("Value()");
        let op = root.enter("");
        assert_eq!(op.path(), ["Value()"]);
        assert!(op.is_entered());
    }

    #[test]
    fn enter_accepts_format_args() {
        let (root, _) = root("Object()");
        let op = root.enter(format_args!("Value({:?})", "total"));
        assert_eq!(op.path(), ["Object()", "Value(\"total\")"]);
    }

    #[test]
    fn alias_affects_aliased_path_only() {
        let (root, _) = root("Value()");
        root.set_alias("total");
        let op = root.clone().enter("Number()");

        assert_eq!(op.aliased_path(), ["total", "Number()"]);
        assert_eq!(op.path(), ["Value()", "Number()"]);
    }

    #[test]
    fn replace_overwrites_last_segment() {
        let (root, _) = root("Value()");
        let op = root.enter("Object()");
        let replaced = op.replace("Array()");

        assert_eq!(replaced.path(), ["Value()", "Array()"]);
        assert_eq!(replaced.aliased_path(), ["Value()", "Array()"]);
        assert_eq!(op.path(), ["Value()", "Object()"]);

        replaced.leave();
        op.leave();
    }

    #[test]
    #[should_panic(expected = "unexpected replace()")]
    fn replace_requires_entered_chain() {
        let (root, _) = root("Value()");
        let _ = root.replace("Array()");
    }

    #[test]
    #[should_panic(expected = "non-empty path")]
    fn replace_requires_non_empty_path() {
        let (root, _) = root("");
        let op = root.enter("");
        let _ = op.replace("Array()");
    }

    #[test]
    fn set_root_isolates_failures() {
        let (root, handler) = root("Value()");
        let isolated = root.clone();
        isolated.set_root();

        let op = isolated.enter("IsEqual()");
        op.fail(equal_failure());
        op.leave();

        assert!(isolated.tree_failed());
        assert!(!root.tree_failed());
        assert_eq!(handler.failure_count(), 1);
    }

    #[test]
    fn severity_is_stamped_on_failures() {
        let (root, handler) = root("Value()");
        root.set_severity(Severity::NonFatal);

        let op = root.enter("IsEqual()");
        op.fail(equal_failure());
        op.leave();

        assert_eq!(handler.failures()[0].1.severity(), Severity::NonFatal);
    }

    #[test]
    fn request_and_response_are_visible_to_descendants() {
        let (root, handler) = root("Request()");
        root.set_request_name("health check");
        root.set_request(Request::new("GET", "/health"));
        root.set_response(Response::new(503));

        let op = root.enter("Status()");
        op.fail(AssertionFailure::new(AssertionKind::Equal));
        op.leave();

        let (ctx, _) = &handler.failures()[0];
        assert_eq!(ctx.request_name(), Some("health check"));
        assert_eq!(ctx.request().map(Request::url), Some("/health"));
        assert_eq!(ctx.response().map(Response::status), Some(503));
    }

    #[test]
    #[should_panic(expected = "unexpected set_request()")]
    fn request_is_single_assignment() {
        let (root, _) = root("Request()");
        root.set_request(Request::new("GET", "/a"));
        root.set_request(Request::new("GET", "/b"));
    }

    #[test]
    fn request_double_set_ignored_without_validation() {
        let (root, _) = root_with("Request()", false);
        root.set_request(Request::new("GET", "/a"));
        root.set_request(Request::new("GET", "/b"));
        assert_eq!(root.context().request().map(Request::url), Some("/a"));
    }

    #[test]
    #[should_panic(expected = "unexpected set_response()")]
    fn response_is_single_assignment() {
        let (root, _) = root("Request()");
        root.set_response(Response::new(200));
        root.set_response(Response::new(500));
    }

    #[test]
    fn response_double_set_ignored_without_validation() {
        let (root, _) = root_with("Request()", false);
        root.set_response(Response::new(200));
        root.set_response(Response::new(500));
        assert_eq!(root.context().response().map(Response::status), Some(200));
    }

    #[test]
    fn empty_alias_restores_full_path() {
        let (root, _) = root("Value()");
        root.set_alias("total");
        root.set_alias("");
        let op = root.clone().enter("Number()");

        assert_eq!(op.aliased_path(), ["Value()", "Number()"]);
        assert_eq!(op.aliased_path(), op.path());
    }

    #[test]
    #[should_panic(expected = "unexpected fail()")]
    fn fail_requires_entered_chain() {
        let (root, _) = root("Value()");
        root.fail(equal_failure());
    }

    #[test]
    #[should_panic(expected = "unexpected leave()")]
    fn double_leave_panics_with_validation() {
        let (root, _) = root("Value()");
        let op = root.enter("IsEqual()");
        op.leave();
        op.leave();
    }

    #[test]
    #[should_panic(expected = "unexpected enter()")]
    fn enter_after_leave_panics_with_validation() {
        let (root, _) = root("Value()");
        let op = root.enter("IsEqual()");
        op.leave();
        let _ = op.enter("Again()");
    }

    #[test]
    fn double_leave_tolerated_without_validation() {
        let (root, handler) = root_with("Value()", false);
        let op = root.enter("IsEqual()");
        op.leave();
        op.leave();

        assert_eq!(handler.success_count(), 1);
        assert!(op.is_left());
    }

    #[test]
    fn guard_leaves_on_drop() {
        let (root, handler) = root("Value()");
        {
            let op = root.enter_scope("IsNull()");
            assert!(op.is_entered());
        }
        assert_eq!(handler.success_count(), 1);
    }

    #[test]
    fn guard_leaves_on_early_return() {
        fn check(chain: &Chain, ok: bool) -> bool {
            let op = chain.enter_scope("Check()");
            if op.failed() {
                return false;
            }
            if !ok {
                op.fail(AssertionFailure::new(AssertionKind::Valid));
                return false;
            }
            true
        }

        let (root, handler) = root("Value()");
        assert!(!check(&root, false));
        assert!(check(&root, true));
        assert_eq!(handler.failure_count(), 1);
        assert_eq!(handler.success_count(), 1);
        assert!(root.tree_failed());
    }

    #[test]
    fn guard_leaves_during_unwind() {
        let (root, handler) = root("Value()");
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let op = root.enter_scope("Boom()");
            op.fail(equal_failure());
            panic!("fatal reporter");
        }));

        assert!(result.is_err());
        assert_eq!(handler.failure_count(), 1);
        assert!(root.tree_failed());
    }

    #[test]
    fn replace_scope_relabels_and_propagates() {
        let (root, handler) = root("Value()");
        let op = root.enter("Object()");
        {
            let arr = op.replace_scope("Array()");
            assert_eq!(arr.path(), ["Value()", "Array()"]);
            assert!(arr.is_entered());
            arr.fail(equal_failure());
        }
        op.leave();

        assert_eq!(handler.failure_count(), 1);
        assert_eq!(handler.success_count(), 0);
        assert_eq!(handler.failures()[0].0.path(), ["Value()", "Array()"]);
        assert!(op.tree_failed());
        assert!(!op.failed());
        assert!(root.tree_failed());
        assert!(!root.failed());
    }

    #[test]
    fn second_leave_during_unwind_does_not_abort() {
        struct LeaveOnDrop(Chain);

        impl Drop for LeaveOnDrop {
            fn drop(&mut self) {
                self.0.leave();
            }
        }

        let (root, handler) = root("Value()");
        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let op = root.enter("Once()");
            op.leave();
            let _late = LeaveOnDrop(op);
            panic!("outer failure");
        }));

        let payload = result.unwrap_err();
        assert_eq!(payload.downcast_ref::<&str>(), Some(&"outer failure"));
        assert_eq!(handler.success_count(), 1);
        assert_eq!(handler.failure_count(), 0);
    }

    #[test]
    fn queries_are_safe_after_leave() {
        let (root, _) = root("Value()");
        let op = root.enter("IsEqual()");
        op.fail(equal_failure());
        op.leave();

        assert!(op.failed());
        assert!(op.tree_failed());
        assert!(op.is_left());
        assert_eq!(op.path(), ["Value()", "IsEqual()"]);
    }

    #[test]
    fn validation_is_inherited() {
        let (root, _) = root_with("Value()", false);
        assert!(!root.enter("A()").clone().validation());
    }

    #[test]
    fn chain_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<Chain>();
        assert_send_sync::<ChainGuard>();
    }

    #[test]
    fn concurrent_independent_trees() {
        use std::thread;

        let handler = Arc::new(RecordingHandler::new());
        let mut handles = Vec::new();

        for worker in 0..8 {
            let handler = Arc::clone(&handler);
            handles.push(thread::spawn(move || {
                let context = AssertionContext::new(
                    format!("worker-{}", worker),
                    "Value()",
                    Arc::new(Environment::new()),
                );
                let root = Chain::with_validation(context, handler, true);
                for i in 0..100 {
                    let op = root.enter_scope(format_args!("Check({})", i));
                    if i % 4 == 0 {
                        op.fail(AssertionFailure::new(AssertionKind::Equal));
                    }
                }
                root.tree_failed()
            }));
        }

        for handle in handles {
            assert!(handle.join().expect("thread panicked"));
        }

        assert_eq!(handler.failure_count(), 8 * 25);
        assert_eq!(handler.success_count(), 8 * 75);
        for (ctx, _) in handler.failures() {
            let worker = ctx.test_name().to_string();
            assert!(worker.starts_with("worker-"));
            assert_eq!(ctx.path()[0], "Value()");
        }
    }

    #[test]
    fn concurrent_children_of_shared_root() {
        use std::thread;

        let (root, handler) = root("Value()");
        let root = Arc::new(root);
        let mut handles = Vec::new();

        for worker in 0..4 {
            let root = Arc::clone(&root);
            handles.push(thread::spawn(move || {
                for i in 0..50 {
                    let op = root.enter_scope("Check()");
                    let inner = op.enter_scope("Inner()");
                    if worker == 0 && i == 49 {
                        inner.fail(AssertionFailure::new(AssertionKind::Equal));
                    }
                }
            }));
        }

        for handle in handles {
            handle.join().expect("thread panicked");
        }

        assert!(root.tree_failed());
        assert!(!root.failed());
        assert_eq!(handler.failure_count(), 1);
        // Every inner and outer leave succeeds except the failing pair.
        assert_eq!(handler.success_count(), 4 * 50 * 2 - 2);
    }
}
