//! Matcher for a JSON object.

use crate::array::Array;
use crate::chain::Chain;
use crate::models::{AssertionFailure, AssertionKind, AssertionValue};
use crate::value::{Value, to_json_or_fail};
use serde::Serialize;
use serde_json::{Map, Value as Json};

/// Matcher over a JSON object.
pub struct Object {
    chain: Chain,
    map: Map<String, Json>,
}

impl Object {
    pub(crate) fn new(chain: Chain, map: Map<String, Json>) -> Self {
        Self { chain, map }
    }

    /// The wrapped map.
    #[inline]
    pub fn raw(&self) -> &Map<String, Json> {
        &self.map
    }

    /// The chain this matcher reports through.
    #[inline]
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Name this object in failure messages.
    pub fn alias(&self, name: &str) -> &Self {
        self.chain.set_alias(name);
        self
    }

    /// Keys as an array of strings, sorted.
    pub fn keys(&self) -> Array {
        let op = self.chain.enter_scope("Keys()");
        let mut keys: Vec<&String> = self.map.keys().collect();
        keys.sort();
        let keys = keys.into_iter().map(|k| Json::String(k.clone())).collect();
        Array::new(op.clone(), keys)
    }

    /// Value under `key`. Fails if the key is missing.
    pub fn value(&self, key: &str) -> Value {
        let op = self.chain.enter_scope(format_args!("Value({:?})", key));
        if op.failed() {
            return Value::new(op.clone(), Json::Null);
        }
        match self.map.get(key) {
            Some(v) => Value::new(op.clone(), v.clone()),
            None => {
                op.fail(
                    AssertionFailure::new(AssertionKind::ContainsKey)
                        .actual(AssertionValue::value(Json::Object(self.map.clone())))
                        .expected(AssertionValue::value(key)),
                );
                Value::new(op.clone(), Json::Null)
            }
        }
    }

    /// Succeeds if `key` is present.
    pub fn contains_key(&self, key: &str) -> &Self {
        let op = self.chain.enter_scope(format_args!("ContainsKey({:?})", key));
        if op.failed() {
            return self;
        }
        if !self.map.contains_key(key) {
            op.fail(
                AssertionFailure::new(AssertionKind::ContainsKey)
                    .actual(AssertionValue::value(Json::Object(self.map.clone())))
                    .expected(AssertionValue::value(key)),
            );
        }
        self
    }

    /// Succeeds if `key` is absent.
    pub fn not_contains_key(&self, key: &str) -> &Self {
        let op = self.chain.enter_scope(format_args!("NotContainsKey({:?})", key));
        if op.failed() {
            return self;
        }
        if self.map.contains_key(key) {
            op.fail(
                AssertionFailure::new(AssertionKind::NotContainsKey)
                    .actual(AssertionValue::value(Json::Object(self.map.clone())))
                    .expected(AssertionValue::value(key)),
            );
        }
        self
    }

    /// Succeeds if the object has no keys.
    pub fn is_empty(&self) -> &Self {
        let op = self.chain.enter_scope("IsEmpty()");
        if op.failed() {
            return self;
        }
        if !self.map.is_empty() {
            op.fail(
                AssertionFailure::new(AssertionKind::Empty)
                    .actual(AssertionValue::value(Json::Object(self.map.clone()))),
            );
        }
        self
    }

    /// Succeeds if the object has at least one key.
    pub fn not_empty(&self) -> &Self {
        let op = self.chain.enter_scope("NotEmpty()");
        if op.failed() {
            return self;
        }
        if self.map.is_empty() {
            op.fail(
                AssertionFailure::new(AssertionKind::NotEmpty)
                    .actual(AssertionValue::value(Json::Object(Map::new()))),
            );
        }
        self
    }

    /// Succeeds if the object equals `expected` after serialization.
    pub fn is_equal<T: Serialize + ?Sized>(&self, expected: &T) -> &Self {
        let op = self.chain.enter_scope("IsEqual()");
        if op.failed() {
            return self;
        }
        let Some(expected) = to_json_or_fail(&op, expected) else {
            return self;
        };
        let actual = Json::Object(self.map.clone());
        if actual != expected {
            op.fail(
                AssertionFailure::new(AssertionKind::Equal)
                    .actual(AssertionValue::value(actual))
                    .expected(AssertionValue::value(expected)),
            );
        }
        self
    }

    /// Succeeds if the object differs from `expected` after serialization.
    pub fn not_equal<T: Serialize + ?Sized>(&self, expected: &T) -> &Self {
        let op = self.chain.enter_scope("NotEqual()");
        if op.failed() {
            return self;
        }
        let Some(expected) = to_json_or_fail(&op, expected) else {
            return self;
        };
        let actual = Json::Object(self.map.clone());
        if actual == expected {
            op.fail(
                AssertionFailure::new(AssertionKind::NotEqual)
                    .actual(AssertionValue::value(actual))
                    .expected(AssertionValue::value(expected)),
            );
        }
        self
    }

    /// Succeeds if every key of `expected` is present with a matching value.
    ///
    /// Nested objects are compared the same way; arrays match when every
    /// expected element matches some actual element.
    pub fn contains_subset<T: Serialize + ?Sized>(&self, expected: &T) -> &Self {
        let op = self.chain.enter_scope("ContainsSubset()");
        if op.failed() {
            return self;
        }
        let Some(expected) = to_json_or_fail(&op, expected) else {
            return self;
        };
        let actual = Json::Object(self.map.clone());
        if !is_subset(&expected, &actual) {
            op.fail(
                AssertionFailure::new(AssertionKind::ContainsSubset)
                    .actual(AssertionValue::value(actual))
                    .expected(AssertionValue::value(expected)),
            );
        }
        self
    }
}

fn is_subset(expected: &Json, actual: &Json) -> bool {
    match (expected, actual) {
        (Json::Object(exp), Json::Object(act)) => exp
            .iter()
            .all(|(k, v)| act.get(k).is_some_and(|a| is_subset(v, a))),
        (Json::Array(exp), Json::Array(act)) => exp
            .iter()
            .all(|e| act.iter().any(|a| is_subset(e, a))),
        _ => expected == actual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{AssertionContext, Environment};
    use crate::handler::RecordingHandler;
    use serde_json::json;
    use std::sync::Arc;

    fn object(json: Json) -> (Object, Arc<RecordingHandler>) {
        let handler = Arc::new(RecordingHandler::new());
        let context = AssertionContext::new("object_test", "Object()", Arc::new(Environment::new()));
        let chain = Chain::with_validation(context, handler.clone(), true);
        let Json::Object(map) = json else {
            panic!("fixture must be an object");
        };
        (Object::new(chain, map), handler)
    }

    #[test]
    fn key_checks() {
        let (o, handler) = object(json!({"a": 1}));
        o.contains_key("a").not_contains_key("b");
        assert_eq!(handler.failure_count(), 0);

        o.contains_key("b");
        let (ctx, failure) = &handler.failures()[0];
        assert_eq!(failure.kind(), AssertionKind::ContainsKey);
        assert_eq!(ctx.path(), ["Object()", "ContainsKey(\"b\")"]);
    }

    #[test]
    fn missing_value_fails_once() {
        let (o, handler) = object(json!({"a": 1}));
        o.value("missing").string().is_equal("x").not_empty();

        assert_eq!(handler.failure_count(), 1);
        assert!(o.chain().tree_failed());
        assert!(!o.chain().failed());
    }

    #[test]
    fn keys_are_sorted() {
        let (o, _) = object(json!({"b": 1, "a": 2}));
        assert_eq!(o.keys().raw(), &vec![json!("a"), json!("b")]);
    }

    #[test]
    fn emptiness() {
        let (o, handler) = object(json!({}));
        o.is_empty().not_empty();
        assert_eq!(handler.failures()[0].1.kind(), AssertionKind::NotEmpty);
    }

    #[test]
    fn equality() {
        let (o, handler) = object(json!({"a": [1, 2]}));
        o.is_equal(&json!({"a": [1, 2]})).not_equal(&json!({"a": []}));
        assert_eq!(handler.failure_count(), 0);
        o.is_equal(&json!({"a": [2, 1]}));
        assert_eq!(handler.failure_count(), 1);
    }

    #[test]
    fn subset_matching() {
        let (o, handler) = object(json!({
            "id": 1,
            "user": {"name": "ann", "roles": ["admin", "dev"]},
        }));
        o.contains_subset(&json!({"user": {"roles": ["dev"]}}));
        assert_eq!(handler.failure_count(), 0);

        o.contains_subset(&json!({"user": {"name": "bob"}}));
        assert_eq!(handler.failures()[0].1.kind(), AssertionKind::ContainsSubset);
    }
}
