//! Matcher for a JSON array.
//!
//! Containment checks take any iterator of serializable values. An empty
//! iterator is a usage error, not a vacuous success.

use crate::chain::Chain;
use crate::models::{AssertionFailure, AssertionKind, AssertionValue};
use crate::number::Number;
use crate::value::{Value, to_json_list_or_fail, to_json_or_fail};
use serde::Serialize;
use serde_json::Value as Json;

/// Matcher over a JSON array.
pub struct Array {
    chain: Chain,
    items: Vec<Json>,
}

impl Array {
    pub(crate) fn new(chain: Chain, items: Vec<Json>) -> Self {
        Self { chain, items }
    }

    /// The wrapped elements.
    #[inline]
    pub fn raw(&self) -> &[Json] {
        &self.items
    }

    /// The chain this matcher reports through.
    #[inline]
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Name this array in failure messages.
    pub fn alias(&self, name: &str) -> &Self {
        self.chain.set_alias(name);
        self
    }

    fn actual(&self) -> AssertionValue {
        AssertionValue::List(self.items.clone())
    }

    /// Number of elements.
    pub fn length(&self) -> Number {
        let op = self.chain.enter_scope("Length()");
        Number::new(op.clone(), self.items.len() as f64)
    }

    /// Element at `index`. Fails if out of bounds.
    pub fn element(&self, index: usize) -> Value {
        let op = self.chain.enter_scope(format_args!("Element({})", index));
        if op.failed() {
            return Value::new(op.clone(), Json::Null);
        }
        match self.items.get(index) {
            Some(item) => Value::new(op.clone(), item.clone()),
            None => {
                let failure = AssertionFailure::new(AssertionKind::InBounds)
                    .actual(AssertionValue::value(index))
                    .error(format!("array has {} elements", self.items.len()));
                let failure = match self.items.len() {
                    0 => failure,
                    len => failure.expected(AssertionValue::range(0, len - 1)),
                };
                op.fail(failure);
                Value::new(op.clone(), Json::Null)
            }
        }
    }

    /// First element. Fails if empty.
    pub fn first(&self) -> Value {
        self.edge("First()", self.items.first())
    }

    /// Last element. Fails if empty.
    pub fn last(&self) -> Value {
        self.edge("Last()", self.items.last())
    }

    fn edge(&self, name: &str, item: Option<&Json>) -> Value {
        let op = self.chain.enter_scope(name);
        if op.failed() {
            return Value::new(op.clone(), Json::Null);
        }
        match item {
            Some(item) => Value::new(op.clone(), item.clone()),
            None => {
                op.fail(AssertionFailure::new(AssertionKind::NotEmpty).actual(self.actual()));
                Value::new(op.clone(), Json::Null)
            }
        }
    }

    /// Succeeds if there are no elements.
    pub fn is_empty(&self) -> &Self {
        let op = self.chain.enter_scope("IsEmpty()");
        if op.failed() {
            return self;
        }
        if !self.items.is_empty() {
            op.fail(AssertionFailure::new(AssertionKind::Empty).actual(self.actual()));
        }
        self
    }

    /// Succeeds if there is at least one element.
    pub fn not_empty(&self) -> &Self {
        let op = self.chain.enter_scope("NotEmpty()");
        if op.failed() {
            return self;
        }
        if self.items.is_empty() {
            op.fail(AssertionFailure::new(AssertionKind::NotEmpty).actual(self.actual()));
        }
        self
    }

    /// Succeeds if the array equals `expected` (order matters).
    pub fn is_equal<T: Serialize + ?Sized>(&self, expected: &T) -> &Self {
        let op = self.chain.enter_scope("IsEqual()");
        if op.failed() {
            return self;
        }
        let Some(expected) = to_json_or_fail(&op, expected) else {
            return self;
        };
        if Json::Array(self.items.clone()) != expected {
            op.fail(
                AssertionFailure::new(AssertionKind::Equal)
                    .actual(self.actual())
                    .expected(AssertionValue::value(expected)),
            );
        }
        self
    }

    /// Succeeds if the array differs from `expected`.
    pub fn not_equal<T: Serialize + ?Sized>(&self, expected: &T) -> &Self {
        let op = self.chain.enter_scope("NotEqual()");
        if op.failed() {
            return self;
        }
        let Some(expected) = to_json_or_fail(&op, expected) else {
            return self;
        };
        if Json::Array(self.items.clone()) == expected {
            op.fail(
                AssertionFailure::new(AssertionKind::NotEqual)
                    .actual(self.actual())
                    .expected(AssertionValue::value(expected)),
            );
        }
        self
    }

    /// Succeeds if every given value is an element, in any order.
    pub fn contains_all<I, T>(&self, values: I) -> &Self
    where
        I: IntoIterator<Item = T>,
        T: Serialize,
    {
        let op = self.chain.enter_scope("ContainsAll()");
        if op.failed() {
            return self;
        }
        let Some(expected) = to_json_list_or_fail(&op, values) else {
            return self;
        };
        if !expected.iter().all(|e| self.items.contains(e)) {
            op.fail(
                AssertionFailure::new(AssertionKind::ContainsSubset)
                    .actual(self.actual())
                    .expected(AssertionValue::List(expected)),
            );
        }
        self
    }

    /// Succeeds if the array holds the given values and nothing else,
    /// in any order, ignoring duplicates.
    pub fn contains_only<I, T>(&self, values: I) -> &Self
    where
        I: IntoIterator<Item = T>,
        T: Serialize,
    {
        let op = self.chain.enter_scope("ContainsOnly()");
        if op.failed() {
            return self;
        }
        let Some(expected) = to_json_list_or_fail(&op, values) else {
            return self;
        };
        let same = expected.iter().all(|e| self.items.contains(e))
            && self.items.iter().all(|a| expected.contains(a));
        if !same {
            op.fail(
                AssertionFailure::new(AssertionKind::ContainsSet)
                    .actual(self.actual())
                    .expected(AssertionValue::List(expected)),
            );
        }
        self
    }

    /// Succeeds if at least one given value is an element.
    pub fn contains_any<I, T>(&self, values: I) -> &Self
    where
        I: IntoIterator<Item = T>,
        T: Serialize,
    {
        let op = self.chain.enter_scope("ContainsAny()");
        if op.failed() {
            return self;
        }
        let Some(expected) = to_json_list_or_fail(&op, values) else {
            return self;
        };
        if !expected.iter().any(|e| self.items.contains(e)) {
            op.fail(
                AssertionFailure::new(AssertionKind::ContainsElement)
                    .actual(self.actual())
                    .expected(AssertionValue::List(expected)),
            );
        }
        self
    }

    /// Succeeds if none of the given values is an element.
    pub fn not_contains_any<I, T>(&self, values: I) -> &Self
    where
        I: IntoIterator<Item = T>,
        T: Serialize,
    {
        let op = self.chain.enter_scope("NotContainsAny()");
        if op.failed() {
            return self;
        }
        let Some(expected) = to_json_list_or_fail(&op, values) else {
            return self;
        };
        if expected.iter().any(|e| self.items.contains(e)) {
            op.fail(
                AssertionFailure::new(AssertionKind::NotContainsElement)
                    .actual(self.actual())
                    .expected(AssertionValue::List(expected)),
            );
        }
        self
    }
}
