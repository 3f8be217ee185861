//! Matcher for an arbitrary JSON value.
//!
//! Every matcher in this crate follows the same shape:
//!
//! ```text
//! let op = self.chain.enter_scope("Method(args)");   // child scope
//! if op.failed() { return self; }                    // earlier failure: skip
//! if !check { op.fail(description); }                // report once
//! ChildMatcher::new(op.clone(), payload)             // optional typed view
//! // guard drop: leave(), propagate failure upwards
//! ```

use crate::array::Array;
use crate::boolean::Boolean;
use crate::chain::Chain;
use crate::models::{AssertionFailure, AssertionKind, AssertionValue};
use crate::number::Number;
use crate::object::Object;
use crate::string::StringMatcher;
use serde::Serialize;
use serde_json::{Map, Value as Json};

/// Name of a JSON value's type, as shown in type-mismatch failures.
pub(crate) fn json_type_name(value: &Json) -> &'static str {
    match value {
        Json::Null => "null",
        Json::Bool(_) => "boolean",
        Json::Number(_) => "number",
        Json::String(_) => "string",
        Json::Array(_) => "array",
        Json::Object(_) => "object",
    }
}

/// Type-mismatch description for `actual` when `expected` was wanted.
pub(crate) fn type_failure(actual: &Json, expected: &'static str) -> AssertionFailure {
    AssertionFailure::new(AssertionKind::Type)
        .actual(AssertionValue::value(actual.clone()))
        .expected(AssertionValue::value(expected))
        .error(format!("value is {}, not {}", json_type_name(actual), expected))
}

/// Usage description for an argument that could not be serialized.
pub(crate) fn usage_failure(error: impl std::fmt::Display) -> AssertionFailure {
    AssertionFailure::new(AssertionKind::Usage).error(format!("unexpected argument: {}", error))
}

/// Convert a user argument to JSON, failing `chain` with a usage error if
/// it cannot be serialized.
pub(crate) fn to_json_or_fail<T: Serialize + ?Sized>(chain: &Chain, value: &T) -> Option<Json> {
    match serde_json::to_value(value) {
        Ok(json) => Some(json),
        Err(err) => {
            chain.fail(usage_failure(err));
            None
        }
    }
}

/// Convert a non-empty list of user arguments to JSON.
pub(crate) fn to_json_list_or_fail<I, T>(chain: &Chain, values: I) -> Option<Vec<Json>>
where
    I: IntoIterator<Item = T>,
    T: Serialize,
{
    let mut list = Vec::new();
    for value in values {
        list.push(to_json_or_fail(chain, &value)?);
    }
    if list.is_empty() {
        chain.fail(
            AssertionFailure::new(AssertionKind::Usage)
                .error("unexpected empty list argument: at least one value is required"),
        );
        return None;
    }
    Some(list)
}

/// Matcher over any JSON value.
pub struct Value {
    chain: Chain,
    value: Json,
}

impl Value {
    pub(crate) fn new(chain: Chain, value: Json) -> Self {
        Self { chain, value }
    }

    /// The wrapped value.
    #[inline]
    pub fn raw(&self) -> &Json {
        &self.value
    }

    /// The chain this matcher reports through.
    #[inline]
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Name this value in failure messages.
    pub fn alias(&self, name: &str) -> &Self {
        self.chain.set_alias(name);
        self
    }

    /// View as an object. Fails if the value is not an object.
    pub fn object(&self) -> Object {
        let op = self.chain.enter_scope("Object()");
        if op.failed() {
            return Object::new(op.clone(), Map::new());
        }
        match &self.value {
            Json::Object(map) => Object::new(op.clone(), map.clone()),
            other => {
                op.fail(type_failure(other, "object"));
                Object::new(op.clone(), Map::new())
            }
        }
    }

    /// View as an array. Fails if the value is not an array.
    pub fn array(&self) -> Array {
        let op = self.chain.enter_scope("Array()");
        if op.failed() {
            return Array::new(op.clone(), Vec::new());
        }
        match &self.value {
            Json::Array(items) => Array::new(op.clone(), items.clone()),
            other => {
                op.fail(type_failure(other, "array"));
                Array::new(op.clone(), Vec::new())
            }
        }
    }

    /// View as a string. Fails if the value is not a string.
    pub fn string(&self) -> StringMatcher {
        let op = self.chain.enter_scope("String()");
        if op.failed() {
            return StringMatcher::new(op.clone(), String::new());
        }
        match &self.value {
            Json::String(s) => StringMatcher::new(op.clone(), s.clone()),
            other => {
                op.fail(type_failure(other, "string"));
                StringMatcher::new(op.clone(), String::new())
            }
        }
    }

    /// View as a number. Fails if the value is not a number.
    pub fn number(&self) -> Number {
        let op = self.chain.enter_scope("Number()");
        if op.failed() {
            return Number::new(op.clone(), 0.0);
        }
        match self.value.as_f64() {
            Some(n) => Number::new(op.clone(), n),
            None => {
                op.fail(type_failure(&self.value, "number"));
                Number::new(op.clone(), 0.0)
            }
        }
    }

    /// View as a boolean. Fails if the value is not a boolean.
    pub fn boolean(&self) -> Boolean {
        let op = self.chain.enter_scope("Boolean()");
        if op.failed() {
            return Boolean::new(op.clone(), false);
        }
        match self.value {
            Json::Bool(b) => Boolean::new(op.clone(), b),
            ref other => {
                op.fail(type_failure(other, "boolean"));
                Boolean::new(op.clone(), false)
            }
        }
    }

    /// Succeeds if the value is null.
    pub fn is_null(&self) -> &Self {
        let op = self.chain.enter_scope("IsNull()");
        if op.failed() {
            return self;
        }
        if !self.value.is_null() {
            op.fail(
                AssertionFailure::new(AssertionKind::Nil)
                    .actual(AssertionValue::value(self.value.clone())),
            );
        }
        self
    }

    /// Succeeds if the value is not null.
    pub fn not_null(&self) -> &Self {
        let op = self.chain.enter_scope("NotNull()");
        if op.failed() {
            return self;
        }
        if self.value.is_null() {
            op.fail(
                AssertionFailure::new(AssertionKind::NotNil)
                    .actual(AssertionValue::value(Json::Null)),
            );
        }
        self
    }

    /// Succeeds if the value equals `expected` after serialization.
    pub fn is_equal<T: Serialize + ?Sized>(&self, expected: &T) -> &Self {
        let op = self.chain.enter_scope("IsEqual()");
        if op.failed() {
            return self;
        }
        let Some(expected) = to_json_or_fail(&op, expected) else {
            return self;
        };
        if self.value != expected {
            op.fail(
                AssertionFailure::new(AssertionKind::Equal)
                    .actual(AssertionValue::value(self.value.clone()))
                    .expected(AssertionValue::value(expected)),
            );
        }
        self
    }

    /// Succeeds if the value differs from `expected` after serialization.
    pub fn not_equal<T: Serialize + ?Sized>(&self, expected: &T) -> &Self {
        let op = self.chain.enter_scope("NotEqual()");
        if op.failed() {
            return self;
        }
        let Some(expected) = to_json_or_fail(&op, expected) else {
            return self;
        };
        if self.value == expected {
            op.fail(
                AssertionFailure::new(AssertionKind::NotEqual)
                    .actual(AssertionValue::value(self.value.clone()))
                    .expected(AssertionValue::value(expected)),
            );
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AssertionContext, Environment};
    use crate::handler::RecordingHandler;
    use serde_json::json;
    use std::sync::Arc;

    fn value(json: Json) -> (Value, Arc<RecordingHandler>) {
        let handler = Arc::new(RecordingHandler::new());
        let context = AssertionContext::new("value_test", "Value()", Arc::new(Environment::new()));
        let chain = Chain::with_validation(context, handler.clone(), true);
        (Value::new(chain, json), handler)
    }

    #[test]
    fn type_views_succeed_on_matching_types() {
        let (v, handler) = value(json!({"a": 1}));
        v.object();
        assert_eq!(handler.failure_count(), 0);
        assert_eq!(handler.success_count(), 1);

        let (v, handler) = value(json!([1, 2]));
        v.array();
        assert_eq!(handler.failure_count(), 0);

        let (v, handler) = value(json!(1.5));
        v.number().is_equal(1.5);
        assert_eq!(handler.failure_count(), 0);
    }

    #[test]
    fn type_mismatch_fails_and_poisons_child() {
        let (v, handler) = value(json!("text"));
        let number = v.number();
        number.gt(1.0).lt(100.0);

        let failures = handler.failures();
        assert_eq!(failures.len(), 1);
        assert_eq!(failures[0].1.kind(), AssertionKind::Type);
        assert_eq!(failures[0].0.path(), ["Value()", "Number()"]);
        assert!(number.chain().failed());
        assert!(v.chain().tree_failed());
        assert_eq!(handler.success_count(), 0);
    }

    #[test]
    fn child_paths_include_view() {
        let (v, handler) = value(json!({"total": 3}));
        v.object().value("total").number().is_equal(4.0);

        let failures = handler.failures();
        assert_eq!(
            failures[0].0.path(),
            ["Value()", "Object()", "Value(\"total\")", "Number()", "IsEqual(4)"]
        );
    }

    #[test]
    fn alias_shortens_display_path() {
        let (v, handler) = value(json!({"total": 3}));
        v.object().value("total").alias("total").number().is_equal(4.0);

        let (ctx, _) = &handler.failures()[0];
        assert_eq!(ctx.aliased_path(), ["total", "Number()", "IsEqual(4)"]);
        assert_eq!(ctx.path().len(), 5);
    }

    #[test]
    fn null_checks() {
        let (v, handler) = value(Json::Null);
        v.is_null().not_null();
        assert_eq!(handler.failure_count(), 1);
        assert_eq!(handler.failures()[0].1.kind(), AssertionKind::NotNil);
    }

    #[test]
    fn equality_uses_serialized_form() {
        #[derive(Serialize)]
        struct User {
            id: u32,
            name: &'static str,
        }

        let (v, handler) = value(json!({"id": 1, "name": "ann"}));
        v.is_equal(&User { id: 1, name: "ann" });
        v.not_equal(&User { id: 2, name: "ann" });
        assert_eq!(handler.failure_count(), 0);

        v.is_equal(&json!({"id": 2}));
        assert_eq!(handler.failures()[0].1.kind(), AssertionKind::Equal);
    }

    #[test]
    fn unserializable_argument_is_usage_error() {
        use std::collections::HashMap;

        let mut bad = HashMap::new();
        bad.insert(vec![1u8], 1);

        let (v, handler) = value(json!({}));
        v.is_equal(&bad);
        assert_eq!(handler.failures()[0].1.kind(), AssertionKind::Usage);
    }
}
