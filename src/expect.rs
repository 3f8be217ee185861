//! Entry point: builds a fresh root chain for every value or request under
//! test.
//!
//! Roots are independent trees. A failure under one root never marks
//! another, and every root carries the severity and validation mode of the
//! [`Config`] it came from.

use crate::array::Array;
use crate::boolean::Boolean;
use crate::chain::Chain;
use crate::config::Config;
use crate::context::{AssertionContext, Environment};
use crate::models::{AssertionFailure, AssertionKind};
use crate::number::Number;
use crate::object::Object;
use crate::response::ResponseMatcher;
use crate::string::StringMatcher;
use crate::transport::Request;
use crate::value::{Value, type_failure, usage_failure};
use crate::ExpectError;
use serde::Serialize;
use serde_json::{Map, Value as Json};
use std::sync::Arc;

/// Creates matchers bound to one configuration.
///
/// Cheap to clone; clones share the configuration, handler and environment.
#[derive(Clone)]
pub struct Expect {
    config: Arc<Config>,
}

impl Expect {
    /// Create from a configuration.
    pub fn new(config: Config) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// The configuration in use.
    #[inline]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Environment shared by every root.
    #[inline]
    pub fn env(&self) -> &Arc<Environment> {
        &self.config.environment
    }

    /// Build a fresh root chain named `name`.
    pub fn root(&self, name: &str) -> Chain {
        let context = AssertionContext::new(
            self.config.test_name.clone(),
            name,
            Arc::clone(&self.config.environment),
        );
        let chain = Chain::with_validation(
            context,
            Arc::clone(&self.config.handler),
            self.config.validation,
        );
        chain.set_severity(self.config.severity);
        chain
    }

    /// Matcher over any serializable value.
    ///
    /// A value that fails to serialize is reported as a usage error and the
    /// returned matcher skips every check.
    pub fn value<T: Serialize>(&self, value: T) -> Value {
        let root = self.root("Value()");
        match serde_json::to_value(&value) {
            Ok(json) => Value::new(root.clone(), json),
            Err(err) => {
                let op = root.enter_scope("");
                op.fail(usage_failure(err));
                Value::new(op.clone(), Json::Null)
            }
        }
    }

    /// Matcher over a JSON object.
    pub fn object<T: Serialize>(&self, value: T) -> Object {
        let root = self.root("Object()");
        let op = root.enter_scope("");
        match serde_json::to_value(&value) {
            Ok(Json::Object(map)) => Object::new(root.clone(), map),
            Ok(other) => {
                op.fail(type_failure(&other, "object"));
                Object::new(op.clone(), Map::new())
            }
            Err(err) => {
                op.fail(usage_failure(err));
                Object::new(op.clone(), Map::new())
            }
        }
    }

    /// Matcher over a JSON array.
    pub fn array<T: Serialize>(&self, value: T) -> Array {
        let root = self.root("Array()");
        let op = root.enter_scope("");
        match serde_json::to_value(&value) {
            Ok(Json::Array(items)) => Array::new(root.clone(), items),
            Ok(other) => {
                op.fail(type_failure(&other, "array"));
                Array::new(op.clone(), Vec::new())
            }
            Err(err) => {
                op.fail(usage_failure(err));
                Array::new(op.clone(), Vec::new())
            }
        }
    }

    /// Matcher over a string.
    pub fn string(&self, value: impl Into<String>) -> StringMatcher {
        StringMatcher::new(self.root("String()").clone(), value.into())
    }

    /// Matcher over a number.
    pub fn number(&self, value: impl Into<f64>) -> Number {
        Number::new(self.root("Number()").clone(), value.into())
    }

    /// Matcher over a boolean.
    pub fn boolean(&self, value: bool) -> Boolean {
        Boolean::new(self.root("Boolean()").clone(), value)
    }

    /// Send `request` through the configured transport and match the
    /// response.
    ///
    /// Printers see the request before it is sent and the response after it
    /// arrives. A missing transport is a usage error; a transport error is
    /// an operation failure. Either way the returned matcher skips every
    /// check.
    pub fn perform(&self, request: Request) -> ResponseMatcher {
        let root = self.root("Request()");
        let request = Arc::new(request);
        root.set_request(Arc::clone(&request));

        for printer in &self.config.printers {
            printer.request(&request);
        }

        let Some(transport) = &self.config.transport else {
            let op = root.enter_scope("");
            op.fail(AssertionFailure::new(AssertionKind::Usage).error(ExpectError::NoTransport));
            return ResponseMatcher::new(op.clone(), None);
        };

        match transport.round_trip(&request) {
            Ok(response) => {
                let response = Arc::new(response);
                for printer in &self.config.printers {
                    printer.response(&response);
                }
                root.set_response(Arc::clone(&response));
                ResponseMatcher::new(root.clone(), Some(response))
            }
            Err(err) => {
                tracing::debug!(
                    target: "fluent_expect::transport",
                    request = %request,
                    error = %err,
                    "round trip failed"
                );
                let op = root.enter_scope("");
                op.fail(AssertionFailure::new(AssertionKind::Operation).error(err));
                ResponseMatcher::new(op.clone(), None)
            }
        }
    }
}

impl Default for Expect {
    fn default() -> Self {
        Self::new(Config::default())
    }
}
