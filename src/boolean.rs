//! Matcher for a boolean.

use crate::chain::Chain;
use crate::models::{AssertionFailure, AssertionKind, AssertionValue};

/// Matcher over a boolean.
pub struct Boolean {
    chain: Chain,
    value: bool,
}

impl Boolean {
    pub(crate) fn new(chain: Chain, value: bool) -> Self {
        Self { chain, value }
    }

    /// The wrapped boolean.
    #[inline]
    pub fn raw(&self) -> bool {
        self.value
    }

    /// The chain this matcher reports through.
    #[inline]
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Name this boolean in failure messages.
    pub fn alias(&self, name: &str) -> &Self {
        self.chain.set_alias(name);
        self
    }

    fn check(&self, name: &str, kind: AssertionKind, expected: bool) -> &Self {
        let op = self.chain.enter_scope(name);
        if op.failed() {
            return self;
        }
        let holds = match kind {
            AssertionKind::NotEqual => self.value != expected,
            _ => self.value == expected,
        };
        if !holds {
            op.fail(
                AssertionFailure::new(kind)
                    .actual(AssertionValue::value(self.value))
                    .expected(AssertionValue::value(expected)),
            );
        }
        self
    }

    /// Succeeds if the value is `true`.
    pub fn is_true(&self) -> &Self {
        self.check("IsTrue()", AssertionKind::Equal, true)
    }

    /// Succeeds if the value is `false`.
    pub fn is_false(&self) -> &Self {
        self.check("IsFalse()", AssertionKind::Equal, false)
    }

    /// Succeeds if the value equals `expected`.
    pub fn is_equal(&self, expected: bool) -> &Self {
        let name = if expected { "IsEqual(true)" } else { "IsEqual(false)" };
        self.check(name, AssertionKind::Equal, expected)
    }

    /// Succeeds if the value differs from `expected`.
    pub fn not_equal(&self, expected: bool) -> &Self {
        let name = if expected { "NotEqual(true)" } else { "NotEqual(false)" };
        self.check(name, AssertionKind::NotEqual, expected)
    }
}
