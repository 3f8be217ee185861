//! Assertion descriptions: the value records a chain hands to its handler.
//!
//! # Architecture
//!
//! A failed check is described by an [`AssertionFailure`]. It is pure data:
//!
//! - [`AssertionKind`]: which comparison failed (equality, ordering, regex, ...)
//! - [`AssertionValue`]: actual/expected payloads, kept as JSON so any
//!   handler can render them without knowing the matcher that produced them
//! - [`Severity`]: stamped by the chain at `fail()` time, never by the matcher
//!
//! Matchers build descriptions with the fluent setters and pass them to
//! [`Chain::fail`](crate::Chain::fail); they never report directly.

use serde_json::Value;
use std::fmt;

// ============================================================================
// Severity
// ============================================================================

/// Failure policy attached to a chain.
///
/// The chain only stamps this onto every failure it reports. Whether a
/// `Fatal` failure actually aborts the test is the handler's decision.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Severity {
    /// Abort the remaining checks of the calling test.
    #[default]
    Fatal,
    /// Record the failure and continue.
    NonFatal,
}

impl Severity {
    /// Short lowercase label used in formatted output.
    #[inline]
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Fatal => "fatal",
            Self::NonFatal => "non-fatal",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ============================================================================
// Assertion Kind
// ============================================================================

/// Kind of check that failed.
///
/// Variants come in positive/negative pairs where the negation is meaningful.
/// `Usage` and `Operation` are not comparisons: the former marks malformed
/// matcher calls, the latter a failed step such as a transport round trip.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssertionKind {
    /// Matcher called with invalid arguments.
    Usage,
    /// An operation needed by the assertion failed.
    Operation,

    /// Payload is not of the expected type.
    Type,
    /// Payload is of a type it must not be.
    NotType,

    /// Values must be equal.
    Equal,
    /// Values must differ.
    NotEqual,

    /// Actual must be less than expected.
    Lt,
    /// Actual must be less than or equal to expected.
    Le,
    /// Actual must be greater than expected.
    Gt,
    /// Actual must be greater than or equal to expected.
    Ge,

    /// Actual must lie within `[min, max]`.
    InRange,
    /// Actual must lie outside `[min, max]`.
    NotInRange,

    /// Collection or string must be empty.
    Empty,
    /// Collection or string must not be empty.
    NotEmpty,

    /// Collection must contain exactly the expected elements.
    ContainsSet,
    /// Collection must not contain exactly the expected elements.
    NotContainsSet,
    /// Collection must contain every expected element.
    ContainsSubset,
    /// Collection must not contain every expected element.
    NotContainsSubset,
    /// Collection must contain the expected element.
    ContainsElement,
    /// Collection must not contain the expected element.
    NotContainsElement,

    /// Value must be null.
    Nil,
    /// Value must not be null.
    NotNil,

    /// Index must be within bounds.
    InBounds,
    /// Index must be out of bounds.
    NotInBounds,

    /// Value must match a schema.
    MatchSchema,
    /// Value must not match a schema.
    NotMatchSchema,

    /// Numbers must be equal within a delta.
    EqualDelta,
    /// Numbers must differ by more than a delta.
    NotEqualDelta,

    /// Object must contain the key.
    ContainsKey,
    /// Object must not contain the key.
    NotContainsKey,

    /// String must match the regex.
    MatchRegex,
    /// String must not match the regex.
    NotMatchRegex,

    /// Value must be valid (e.g. parseable).
    Valid,
    /// Value must be invalid.
    NotValid,
}

impl AssertionKind {
    /// Human-readable description of the expectation that was violated.
    pub const fn display_name(&self) -> &'static str {
        match self {
            Self::Usage => "incorrect usage of expect",
            Self::Operation => "unexpected failure during operation",
            Self::Type => "expected: value type is",
            Self::NotType => "expected: value type is not",
            Self::Equal => "expected: values are equal",
            Self::NotEqual => "expected: values are non-equal",
            Self::Lt => "expected: value is less than",
            Self::Le => "expected: value is less than or equal to",
            Self::Gt => "expected: value is greater than",
            Self::Ge => "expected: value is greater than or equal to",
            Self::InRange => "expected: value is within range",
            Self::NotInRange => "expected: value is outside range",
            Self::Empty => "expected: value is empty",
            Self::NotEmpty => "expected: value is non-empty",
            Self::ContainsSet => "expected: container contains exactly these elements",
            Self::NotContainsSet => "expected: container does not contain exactly these elements",
            Self::ContainsSubset => "expected: container includes all of these elements",
            Self::NotContainsSubset => "expected: container does not include all of these elements",
            Self::ContainsElement => "expected: container includes element",
            Self::NotContainsElement => "expected: container does not include element",
            Self::Nil => "expected: value is null",
            Self::NotNil => "expected: value is non-null",
            Self::InBounds => "expected: index is within bounds",
            Self::NotInBounds => "expected: index is out of bounds",
            Self::MatchSchema => "expected: value matches schema",
            Self::NotMatchSchema => "expected: value does not match schema",
            Self::EqualDelta => "expected: numbers are equal within delta",
            Self::NotEqualDelta => "expected: numbers differ by more than delta",
            Self::ContainsKey => "expected: map contains key",
            Self::NotContainsKey => "expected: map does not contain key",
            Self::MatchRegex => "expected: string matches regex",
            Self::NotMatchRegex => "expected: string does not match regex",
            Self::Valid => "expected: value is valid",
            Self::NotValid => "expected: value is invalid",
        }
    }

    /// Whether this kind reports misuse or an operational error rather
    /// than a property of the value under test.
    #[inline]
    pub const fn is_internal(&self) -> bool {
        matches!(self, Self::Usage | Self::Operation)
    }
}

impl fmt::Display for AssertionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

// ============================================================================
// Assertion Values
// ============================================================================

/// Actual or expected payload of a failed check.
#[derive(Debug, Clone, PartialEq)]
pub enum AssertionValue {
    /// A single value.
    Value(Value),
    /// A list of alternatives or elements (e.g. for containment checks).
    List(Vec<Value>),
    /// An inclusive range.
    Range {
        /// Lower bound.
        min: Value,
        /// Upper bound.
        max: Value,
    },
}

impl AssertionValue {
    /// Wrap anything convertible into a JSON value.
    #[inline]
    pub fn value(value: impl Into<Value>) -> Self {
        Self::Value(value.into())
    }

    /// Build a list from an iterator of JSON-convertible items.
    pub fn list<I, T>(items: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<Value>,
    {
        Self::List(items.into_iter().map(Into::into).collect())
    }

    /// Build an inclusive range.
    #[inline]
    pub fn range(min: impl Into<Value>, max: impl Into<Value>) -> Self {
        Self::Range {
            min: min.into(),
            max: max.into(),
        }
    }
}

impl fmt::Display for AssertionValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Value(v) => write!(f, "{}", v),
            Self::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
            Self::Range { min, max } => write!(f, "[{}; {}]", min, max),
        }
    }
}

// ============================================================================
// Assertion Failure
// ============================================================================

/// Description of one failed check.
///
/// # Example
///
/// ```rust
/// use fluent_expect::{AssertionFailure, AssertionKind, AssertionValue};
///
/// let failure = AssertionFailure::new(AssertionKind::Equal)
///     .actual(AssertionValue::value("foo"))
///     .expected(AssertionValue::value("bar"));
///
/// assert_eq!(failure.kind(), AssertionKind::Equal);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct AssertionFailure {
    kind: AssertionKind,
    actual: Option<AssertionValue>,
    expected: Option<AssertionValue>,
    delta: Option<f64>,
    errors: Vec<String>,
    severity: Severity,
}

impl AssertionFailure {
    /// Start a description of the given kind.
    #[inline]
    pub fn new(kind: AssertionKind) -> Self {
        Self {
            kind,
            actual: None,
            expected: None,
            delta: None,
            errors: Vec::new(),
            severity: Severity::default(),
        }
    }

    /// Set the actual value.
    #[inline]
    pub fn actual(mut self, actual: AssertionValue) -> Self {
        self.actual = Some(actual);
        self
    }

    /// Set the expected value.
    #[inline]
    pub fn expected(mut self, expected: AssertionValue) -> Self {
        self.expected = Some(expected);
        self
    }

    /// Set the allowed delta for floating-point comparisons.
    #[inline]
    pub fn delta(mut self, delta: f64) -> Self {
        self.delta = Some(delta);
        self
    }

    /// Attach an underlying error message.
    #[inline]
    pub fn error(mut self, error: impl fmt::Display) -> Self {
        self.errors.push(error.to_string());
        self
    }

    /// Kind of the failed check.
    #[inline]
    pub fn kind(&self) -> AssertionKind {
        self.kind
    }

    /// Actual value, if recorded.
    #[inline]
    pub fn actual_value(&self) -> Option<&AssertionValue> {
        self.actual.as_ref()
    }

    /// Expected value, if recorded.
    #[inline]
    pub fn expected_value(&self) -> Option<&AssertionValue> {
        self.expected.as_ref()
    }

    /// Delta, if recorded.
    #[inline]
    pub fn delta_value(&self) -> Option<f64> {
        self.delta
    }

    /// Underlying error messages.
    #[inline]
    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    /// Severity advertised by the chain that reported this failure.
    #[inline]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    pub(crate) fn set_severity(&mut self, severity: Severity) {
        self.severity = severity;
    }
}

// ============================================================================
// Tests
// ============================================================================
