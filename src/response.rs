//! Matcher for an HTTP response.
//!
//! Built by [`Expect::perform`](crate::Expect::perform). When the round trip
//! itself failed, the matcher carries no response and every check is
//! skipped, so only the transport failure is reported.

use crate::chain::Chain;
use crate::models::{AssertionFailure, AssertionKind, AssertionValue};
use crate::string::StringMatcher;
use crate::transport::Response;
use crate::value::Value;
use serde_json::Value as Json;
use std::fmt;
use std::sync::Arc;

/// Class of HTTP status codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StatusRange {
    /// 1xx
    Informational,
    /// 2xx
    Success,
    /// 3xx
    Redirection,
    /// 4xx
    ClientError,
    /// 5xx
    ServerError,
}

impl StatusRange {
    /// Inclusive bounds of the class.
    pub const fn bounds(&self) -> (u16, u16) {
        match self {
            Self::Informational => (100, 199),
            Self::Success => (200, 299),
            Self::Redirection => (300, 399),
            Self::ClientError => (400, 499),
            Self::ServerError => (500, 599),
        }
    }

    /// Whether `status` belongs to this class.
    #[inline]
    pub const fn contains(&self, status: u16) -> bool {
        let (min, max) = self.bounds();
        min <= status && status <= max
    }
}

impl fmt::Display for StatusRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (min, _) = self.bounds();
        write!(f, "{}xx", min / 100)
    }
}

/// Matcher over an HTTP response.
pub struct ResponseMatcher {
    chain: Chain,
    response: Option<Arc<Response>>,
}

impl ResponseMatcher {
    pub(crate) fn new(chain: Chain, response: Option<Arc<Response>>) -> Self {
        Self { chain, response }
    }

    /// The response, if the round trip succeeded.
    #[inline]
    pub fn raw(&self) -> Option<&Response> {
        self.response.as_deref()
    }

    /// The chain this matcher reports through.
    #[inline]
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Name this response in failure messages.
    pub fn alias(&self, name: &str) -> &Self {
        self.chain.set_alias(name);
        self
    }

    /// Succeeds if the status code equals `status`.
    pub fn status(&self, status: u16) -> &Self {
        let op = self.chain.enter_scope(format_args!("Status({})", status));
        if op.failed() {
            return self;
        }
        let Some(response) = &self.response else {
            return self;
        };
        if response.status() != status {
            op.fail(
                AssertionFailure::new(AssertionKind::Equal)
                    .actual(AssertionValue::value(response.status()))
                    .expected(AssertionValue::value(status)),
            );
        }
        self
    }

    /// Succeeds if the status code belongs to `range`.
    pub fn status_range(&self, range: StatusRange) -> &Self {
        let op = self.chain.enter_scope(format_args!("StatusRange({})", range));
        if op.failed() {
            return self;
        }
        let Some(response) = &self.response else {
            return self;
        };
        if !range.contains(response.status()) {
            let (min, max) = range.bounds();
            op.fail(
                AssertionFailure::new(AssertionKind::InRange)
                    .actual(AssertionValue::value(response.status()))
                    .expected(AssertionValue::range(min, max)),
            );
        }
        self
    }

    /// Value of header `name`. Fails if the header is missing.
    pub fn header(&self, name: &str) -> StringMatcher {
        let op = self.chain.enter_scope(format_args!("Header({:?})", name));
        if op.failed() {
            return StringMatcher::new(op.clone(), String::new());
        }
        let Some(response) = &self.response else {
            return StringMatcher::new(op.clone(), String::new());
        };
        match response.header(name) {
            Some(value) => StringMatcher::new(op.clone(), value.to_owned()),
            None => {
                let names: Vec<Json> = response
                    .headers()
                    .iter()
                    .map(|(n, _)| Json::String(n.clone()))
                    .collect();
                op.fail(
                    AssertionFailure::new(AssertionKind::ContainsKey)
                        .actual(AssertionValue::List(names))
                        .expected(AssertionValue::value(name)),
                );
                StringMatcher::new(op.clone(), String::new())
            }
        }
    }

    /// Body as text. Fails if the body is not valid UTF-8.
    pub fn body(&self) -> StringMatcher {
        let op = self.chain.enter_scope("Body()");
        if op.failed() {
            return StringMatcher::new(op.clone(), String::new());
        }
        let Some(response) = &self.response else {
            return StringMatcher::new(op.clone(), String::new());
        };
        match std::str::from_utf8(response.body()) {
            Ok(text) => StringMatcher::new(op.clone(), text.to_owned()),
            Err(err) => {
                op.fail(
                    AssertionFailure::new(AssertionKind::Valid)
                        .error(format!("body is not valid UTF-8: {}", err)),
                );
                StringMatcher::new(op.clone(), String::new())
            }
        }
    }

    /// Body parsed as JSON. Fails if it does not parse.
    pub fn json(&self) -> Value {
        let op = self.chain.enter_scope("JSON()");
        if op.failed() {
            return Value::new(op.clone(), Json::Null);
        }
        let Some(response) = &self.response else {
            return Value::new(op.clone(), Json::Null);
        };
        match serde_json::from_slice::<Json>(response.body()) {
            Ok(json) => Value::new(op.clone(), json),
            Err(err) => {
                op.fail(
                    AssertionFailure::new(AssertionKind::Valid)
                        .actual(AssertionValue::value(
                            String::from_utf8_lossy(response.body()).into_owned(),
                        ))
                        .error(format!("body is not valid JSON: {}", err)),
                );
                Value::new(op.clone(), Json::Null)
            }
        }
    }
}
