//! Matcher for a string.
//!
//! Lengths count Unicode scalar values, not bytes. Regex checks use the
//! `regex` crate syntax; a pattern that fails to compile is reported as a
//! usage error on the calling scope.

use crate::chain::Chain;
use crate::models::{AssertionFailure, AssertionKind, AssertionValue};
use crate::number::Number;
use regex::Regex;

/// Matcher over a string.
pub struct StringMatcher {
    chain: Chain,
    value: String,
}

impl StringMatcher {
    pub(crate) fn new(chain: Chain, value: String) -> Self {
        Self { chain, value }
    }

    /// The wrapped string.
    #[inline]
    pub fn raw(&self) -> &str {
        &self.value
    }

    /// The chain this matcher reports through.
    #[inline]
    pub fn chain(&self) -> &Chain {
        &self.chain
    }

    /// Name this string in failure messages.
    pub fn alias(&self, name: &str) -> &Self {
        self.chain.set_alias(name);
        self
    }

    fn actual(&self) -> AssertionValue {
        AssertionValue::value(self.value.as_str())
    }

    fn check(
        &self,
        name: std::fmt::Arguments<'_>,
        kind: AssertionKind,
        expected: &str,
        holds: impl FnOnce(&str) -> bool,
    ) -> &Self {
        let op = self.chain.enter_scope(name);
        if op.failed() {
            return self;
        }
        if !holds(&self.value) {
            op.fail(
                AssertionFailure::new(kind)
                    .actual(self.actual())
                    .expected(AssertionValue::value(expected)),
            );
        }
        self
    }

    /// Number of characters.
    pub fn length(&self) -> Number {
        let op = self.chain.enter_scope("Length()");
        Number::new(op.clone(), self.value.chars().count() as f64)
    }

    /// Succeeds if the string is empty.
    pub fn is_empty(&self) -> &Self {
        let op = self.chain.enter_scope("IsEmpty()");
        if op.failed() {
            return self;
        }
        if !self.value.is_empty() {
            op.fail(AssertionFailure::new(AssertionKind::Empty).actual(self.actual()));
        }
        self
    }

    /// Succeeds if the string is not empty.
    pub fn not_empty(&self) -> &Self {
        let op = self.chain.enter_scope("NotEmpty()");
        if op.failed() {
            return self;
        }
        if self.value.is_empty() {
            op.fail(AssertionFailure::new(AssertionKind::NotEmpty).actual(self.actual()));
        }
        self
    }

    /// Succeeds if the string equals `expected`.
    pub fn is_equal(&self, expected: &str) -> &Self {
        self.check(
            format_args!("IsEqual({:?})", expected),
            AssertionKind::Equal,
            expected,
            |s| s == expected,
        )
    }

    /// Succeeds if the string differs from `expected`.
    pub fn not_equal(&self, expected: &str) -> &Self {
        self.check(
            format_args!("NotEqual({:?})", expected),
            AssertionKind::NotEqual,
            expected,
            |s| s != expected,
        )
    }

    /// Succeeds if the string equals `expected` ignoring case.
    pub fn is_equal_fold(&self, expected: &str) -> &Self {
        self.check(
            format_args!("IsEqualFold({:?})", expected),
            AssertionKind::Equal,
            expected,
            |s| s.to_lowercase() == expected.to_lowercase(),
        )
    }

    /// Succeeds if `needle` occurs in the string.
    pub fn contains(&self, needle: &str) -> &Self {
        self.check(
            format_args!("Contains({:?})", needle),
            AssertionKind::ContainsSubset,
            needle,
            |s| s.contains(needle),
        )
    }

    /// Succeeds if `needle` does not occur in the string.
    pub fn not_contains(&self, needle: &str) -> &Self {
        self.check(
            format_args!("NotContains({:?})", needle),
            AssertionKind::NotContainsSubset,
            needle,
            |s| !s.contains(needle),
        )
    }

    /// Succeeds if the string starts with `prefix`.
    pub fn has_prefix(&self, prefix: &str) -> &Self {
        self.check(
            format_args!("HasPrefix({:?})", prefix),
            AssertionKind::ContainsSubset,
            prefix,
            |s| s.starts_with(prefix),
        )
    }

    /// Succeeds if the string ends with `suffix`.
    pub fn has_suffix(&self, suffix: &str) -> &Self {
        self.check(
            format_args!("HasSuffix({:?})", suffix),
            AssertionKind::ContainsSubset,
            suffix,
            |s| s.ends_with(suffix),
        )
    }

    /// Succeeds if the string matches `pattern` anywhere.
    pub fn is_match(&self, pattern: &str) -> &Self {
        self.regex_check(format_args!("IsMatch({:?})", pattern), pattern, true)
    }

    /// Succeeds if the string does not match `pattern`.
    pub fn not_match(&self, pattern: &str) -> &Self {
        self.regex_check(format_args!("NotMatch({:?})", pattern), pattern, false)
    }

    fn regex_check(&self, name: std::fmt::Arguments<'_>, pattern: &str, want: bool) -> &Self {
        let op = self.chain.enter_scope(name);
        if op.failed() {
            return self;
        }
        let re = match Regex::new(pattern) {
            Ok(re) => re,
            Err(err) => {
                op.fail(
                    AssertionFailure::new(AssertionKind::Usage)
                        .error(format!("invalid regex {:?}: {}", pattern, err)),
                );
                return self;
            }
        };
        if re.is_match(&self.value) != want {
            let kind = if want {
                AssertionKind::MatchRegex
            } else {
                AssertionKind::NotMatchRegex
            };
            op.fail(
                AssertionFailure::new(kind)
                    .actual(self.actual())
                    .expected(AssertionValue::value(pattern)),
            );
        }
        self
    }

    /// Parse the string as a number. Fails if it does not parse.
    pub fn as_number(&self) -> Number {
        let op = self.chain.enter_scope("AsNumber()");
        if op.failed() {
            return Number::new(op.clone(), 0.0);
        }
        match self.value.trim().parse::<f64>() {
            Ok(n) => Number::new(op.clone(), n),
            Err(err) => {
                op.fail(
                    AssertionFailure::new(AssertionKind::Valid)
                        .actual(self.actual())
                        .error(format!("not a number: {}", err)),
                );
                Number::new(op.clone(), 0.0)
            }
        }
    }
}
