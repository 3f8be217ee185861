//! Diagnostic context carried by every chain node.
//!
//! # Architecture
//!
//! - [`AssertionContext`]: per-node record of where an assertion happened
//!   (test name, operation path, aliased path, request/response). Each
//!   chain owns its own copy; children extend their copy without touching
//!   the parent's.
//! - [`Environment`]: the one piece of context shared by the whole tree. It
//!   is a thread-safe key/value store tests can use to pass data between
//!   assertions.
//!
//! # Path vs Aliased Path
//!
//! `path` always records every operation from the root. `aliased_path`
//! starts out identical but can be collapsed with an alias, so failure
//! messages can say `total.IsEqual()` instead of
//! `Value().Object().Value("total").Number().IsEqual()`.

use crate::transport::{Request, Response};
use serde_json::Value;
use smallvec::SmallVec;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// Inline capacity for operation paths. Most assertion chains are shallow.
pub(crate) type PathSegments = SmallVec<[String; 8]>;

// ============================================================================
// Assertion Context
// ============================================================================

/// Where an assertion is running and what it is looking at.
///
/// Returned by value from [`Chain::context`](crate::Chain::context) and passed
/// by reference to [`AssertionHandler`](crate::AssertionHandler) callbacks.
#[derive(Debug, Clone)]
pub struct AssertionContext {
    pub(crate) test_name: String,
    pub(crate) path: PathSegments,
    pub(crate) aliased_path: PathSegments,
    pub(crate) request_name: Option<String>,
    pub(crate) request: Option<Arc<Request>>,
    pub(crate) response: Option<Arc<Response>>,
    pub(crate) environment: Arc<Environment>,
}

impl AssertionContext {
    /// Create a context for a root chain.
    ///
    /// `root_name` seeds both paths unless it is empty.
    pub fn new(test_name: impl Into<String>, root_name: &str, environment: Arc<Environment>) -> Self {
        let mut path = PathSegments::new();
        if !root_name.is_empty() {
            path.push(root_name.to_owned());
        }
        Self {
            test_name: test_name.into(),
            aliased_path: path.clone(),
            path,
            request_name: None,
            request: None,
            response: None,
            environment,
        }
    }

    /// Name of the test that owns this assertion tree.
    #[inline]
    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    /// Full operation path from the root.
    #[inline]
    pub fn path(&self) -> &[String] {
        &self.path
    }

    /// Display path, possibly collapsed by an alias.
    #[inline]
    pub fn aliased_path(&self) -> &[String] {
        &self.aliased_path
    }

    /// Optional human-readable request name.
    #[inline]
    pub fn request_name(&self) -> Option<&str> {
        self.request_name.as_deref()
    }

    /// Request under test, if any.
    #[inline]
    pub fn request(&self) -> Option<&Request> {
        self.request.as_deref()
    }

    /// Response under test, if any.
    #[inline]
    pub fn response(&self) -> Option<&Response> {
        self.response.as_deref()
    }

    /// Environment shared by the whole assertion tree.
    #[inline]
    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }

    /// Aliased path joined with `.`, as shown in failure messages.
    pub fn display_path(&self) -> String {
        join_path(&self.aliased_path)
    }

    pub(crate) fn push_segment(&mut self, name: String) {
        self.path.push(name.clone());
        self.aliased_path.push(name);
    }

    /// Returns false if either path is empty.
    pub(crate) fn replace_segment(&mut self, name: String) -> bool {
        match (self.path.last_mut(), self.aliased_path.last_mut()) {
            (Some(p), Some(a)) => {
                *a = name.clone();
                *p = name;
                true
            }
            _ => false,
        }
    }

    /// An empty alias restores the full path.
    pub(crate) fn set_alias(&mut self, alias: String) {
        if alias.is_empty() {
            self.aliased_path = self.path.clone();
            return;
        }
        self.aliased_path.clear();
        self.aliased_path.push(alias);
    }
}

fn join_path(segments: &[String]) -> String {
    let separator = ".";
    let capacity = segments.iter().map(String::len).sum::<usize>()
        + segments.len().saturating_sub(1) * separator.len();

    let mut result = String::with_capacity(capacity);
    for (i, segment) in segments.iter().enumerate() {
        if i > 0 {
            result.push_str(separator);
        }
        result.push_str(segment);
    }
    result
}

// ============================================================================
// Environment
// ============================================================================

/// Thread-safe key/value store shared by an assertion tree.
///
/// Uses `RwLock` so concurrent readers (parallel tests inspecting shared
/// fixtures) do not contend. A poisoned lock is recovered rather than
/// propagated: a panicking fatal reporter must not break sibling tests.
///
/// # Example
///
/// ```rust
/// use fluent_expect::Environment;
/// use serde_json::json;
///
/// let env = Environment::new();
/// env.put("token", json!("abc"));
/// assert_eq!(env.get("token"), Some(json!("abc")));
/// assert!(!env.has("missing"));
/// ```
#[derive(Debug, Default)]
pub struct Environment {
    data: RwLock<HashMap<String, Value>>,
}

impl Environment {
    /// Create an empty environment.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn read_data(&self) -> RwLockReadGuard<'_, HashMap<String, Value>> {
        match self.data.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[inline]
    fn write_data(&self) -> RwLockWriteGuard<'_, HashMap<String, Value>> {
        match self.data.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Store a value, replacing any previous one.
    pub fn put(&self, key: impl Into<String>, value: Value) {
        self.write_data().insert(key.into(), value);
    }

    /// Fetch a copy of a value.
    pub fn get(&self, key: &str) -> Option<Value> {
        self.read_data().get(key).cloned()
    }

    /// Whether a key is present.
    pub fn has(&self, key: &str) -> bool {
        self.read_data().contains_key(key)
    }

    /// Remove a key, returning its value.
    pub fn delete(&self, key: &str) -> Option<Value> {
        self.write_data().remove(key)
    }

    /// Sorted list of keys.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.read_data().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.read_data().len()
    }

    /// Whether the environment is empty.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ============================================================================
// Tests
// ============================================================================
