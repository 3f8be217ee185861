//! Matcher for a number.
//!
//! Numbers are compared as `f64`. NaN never satisfies an ordering or
//! equality check.

use crate::chain::Chain;
use crate::models::{AssertionFailure, AssertionKind, AssertionValue};
use serde_json::Value as Json;

/// Integral values render without a trailing `.0`.
fn json_number(value: f64) -> Json {
    const EXACT: f64 = 9_007_199_254_740_992.0;
    if value.fract() == 0.0 && value.abs() < EXACT {
        Json::from(value as i64)
    } else {
        Json::from(value)
    }
}

/// Matcher over a number.
pub struct Number {
    chain: Chain,
    value: f64,
}

impl Number {
    pub(crate) fn new(chain: Chain, value: f64) -> Self {
        Self { chain, value }
    }

    /// The wrapped number.
    #[inline]
    pub fn raw(&self) -> f64 {
        self.value
    }

    /// The chain this matcher reports through.
    #[inline]
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Name this number in failure messages.
    pub fn alias(&self, name: &str) -> &Self {
        self.chain.set_alias(name);
        self
    }

    /// Shared body of single-operand checks.
    fn check(
        &self,
        name: std::fmt::Arguments<'_>,
        kind: AssertionKind,
        expected: f64,
        holds: impl FnOnce(f64) -> bool,
    ) -> &Self {
        let op = self.chain.enter_scope(name);
        if op.failed() {
            return self;
        }
        if !holds(self.value) {
            op.fail(
                AssertionFailure::new(kind)
                    .actual(AssertionValue::value(json_number(self.value)))
                    .expected(AssertionValue::value(json_number(expected))),
            );
        }
        self
    }

    /// Succeeds if the number equals `expected` exactly.
    pub fn is_equal(&self, expected: f64) -> &Self {
        self.check(
            format_args!("IsEqual({})", expected),
            AssertionKind::Equal,
            expected,
            |v| v == expected,
        )
    }

    /// Succeeds if the number differs from `expected`.
    pub fn not_equal(&self, expected: f64) -> &Self {
        self.check(
            format_args!("NotEqual({})", expected),
            AssertionKind::NotEqual,
            expected,
            |v| v != expected,
        )
    }

    /// Succeeds if `|number - expected| <= delta`.
    pub fn in_delta(&self, expected: f64, delta: f64) -> &Self {
        let op = self.chain.enter_scope(format_args!("InDelta({}, {})", expected, delta));
        if op.failed() {
            return self;
        }
        if !((self.value - expected).abs() <= delta) {
            op.fail(
                AssertionFailure::new(AssertionKind::EqualDelta)
                    .actual(AssertionValue::value(json_number(self.value)))
                    .expected(AssertionValue::value(json_number(expected)))
                    .delta(delta),
            );
        }
        self
    }

    /// Succeeds if `|number - expected| > delta`.
    pub fn not_in_delta(&self, expected: f64, delta: f64) -> &Self {
        let op = self.chain.enter_scope(format_args!("NotInDelta({}, {})", expected, delta));
        if op.failed() {
            return self;
        }
        if !((self.value - expected).abs() > delta) {
            op.fail(
                AssertionFailure::new(AssertionKind::NotEqualDelta)
                    .actual(AssertionValue::value(json_number(self.value)))
                    .expected(AssertionValue::value(json_number(expected)))
                    .delta(delta),
            );
        }
        self
    }

    /// Succeeds if the number is greater than `bound`.
    pub fn gt(&self, bound: f64) -> &Self {
        self.check(format_args!("Gt({})", bound), AssertionKind::Gt, bound, |v| v > bound)
    }

    /// Succeeds if the number is greater than or equal to `bound`.
    pub fn ge(&self, bound: f64) -> &Self {
        self.check(format_args!("Ge({})", bound), AssertionKind::Ge, bound, |v| v >= bound)
    }

    /// Succeeds if the number is less than `bound`.
    pub fn lt(&self, bound: f64) -> &Self {
        self.check(format_args!("Lt({})", bound), AssertionKind::Lt, bound, |v| v < bound)
    }

    /// Succeeds if the number is less than or equal to `bound`.
    pub fn le(&self, bound: f64) -> &Self {
        self.check(format_args!("Le({})", bound), AssertionKind::Le, bound, |v| v <= bound)
    }

    /// Succeeds if `min <= number <= max`. `min > max` is a usage error.
    pub fn in_range(&self, min: f64, max: f64) -> &Self {
        self.range_check(format_args!("InRange({}, {})", min, max), min, max, true)
    }

    /// Succeeds if the number lies outside `[min, max]`.
    pub fn not_in_range(&self, min: f64, max: f64) -> &Self {
        self.range_check(format_args!("NotInRange({}, {})", min, max), min, max, false)
    }

    fn range_check(
        &self,
        name: std::fmt::Arguments<'_>,
        min: f64,
        max: f64,
        inside: bool,
    ) -> &Self {
        let op = self.chain.enter_scope(name);
        if op.failed() {
            return self;
        }
        if !(min <= max) {
            op.fail(
                AssertionFailure::new(AssertionKind::Usage)
                    .error(format!("invalid range: min {} is greater than max {}", min, max)),
            );
            return self;
        }
        let within = min <= self.value && self.value <= max;
        if within != inside {
            let kind = if inside {
                AssertionKind::InRange
            } else {
                AssertionKind::NotInRange
            };
            op.fail(
                AssertionFailure::new(kind)
                    .actual(AssertionValue::value(json_number(self.value)))
                    .expected(AssertionValue::range(json_number(min), json_number(max))),
            );
        }
        self
    }

    /// Succeeds if the number has no fractional part.
    pub fn is_integer(&self) -> &Self {
        let op = self.chain.enter_scope("IsInteger()");
        if op.failed() {
            return self;
        }
        if !(self.value.is_finite() && self.value.fract() == 0.0) {
            op.fail(
                AssertionFailure::new(AssertionKind::Type)
                    .actual(AssertionValue::value(json_number(self.value)))
                    .expected(AssertionValue::value("integer")),
            );
        }
        self
    }
}
