//! Rendering of assertion failures for humans.
//!
//! [`FailureReport`] borrows a context and a failure for the duration of a
//! single formatting call and writes them field by field. Every rendered
//! field is bounded so a multi-megabyte response body cannot flood test
//! output.
//!
//! Output shape:
//!
//! ```text
//! [fatal] expected: values are equal
//!   test: user_api
//!   assertion: Body().IsEqual()
//!   request: GET /users/1
//!   response: 200 (17 bytes)
//!   expected: "bar"
//!   actual: "foo"
//! ```

use crate::context::AssertionContext;
use crate::models::AssertionFailure;
use std::borrow::Cow;
use std::fmt;

/// Default bound for any individual field in formatted output.
pub const MAX_FIELD_OUTPUT_LEN: usize = 1024;

/// Truncation indicator appended to truncated strings
const TRUNCATION_INDICATOR: &str = "...[TRUNCATED]";

// ============================================================================
// Formatter
// ============================================================================

/// Turns assertion outcomes into text.
pub trait Formatter: Send + Sync {
    /// One-line message for a passed assertion.
    fn format_success(&self, context: &AssertionContext) -> String;

    /// Multi-line message for a failed assertion.
    fn format_failure(&self, context: &AssertionContext, failure: &AssertionFailure) -> String;
}

/// Plain-text formatter with bounded fields.
#[derive(Debug, Clone, Copy)]
pub struct DefaultFormatter {
    max_field_len: usize,
    show_exchange: bool,
}

impl DefaultFormatter {
    /// Bound every field to `max_field_len` bytes.
    pub fn with_max_field_len(mut self, max_field_len: usize) -> Self {
        self.max_field_len = max_field_len;
        self
    }

    /// Include the request/response summary lines (on by default).
    pub fn with_exchange(mut self, show: bool) -> Self {
        self.show_exchange = show;
        self
    }
}

impl Default for DefaultFormatter {
    fn default() -> Self {
        Self {
            max_field_len: MAX_FIELD_OUTPUT_LEN,
            show_exchange: true,
        }
    }
}

impl Formatter for DefaultFormatter {
    fn format_success(&self, context: &AssertionContext) -> String {
        format!(
            "[ok] {}",
            truncate_with_indicator(&context.display_path(), self.max_field_len)
        )
    }

    fn format_failure(&self, context: &AssertionContext, failure: &AssertionFailure) -> String {
        let report = FailureReport::new(context, failure);
        let mut output = String::new();
        // Writing into a String cannot fail.
        let _ = report.write_to(&mut output, self.max_field_len, self.show_exchange);
        output
    }
}

// ============================================================================
// Failure Report
// ============================================================================

/// Borrowed view of one failure, tied to the context that produced it.
#[derive(Debug, Clone, Copy)]
pub struct FailureReport<'a> {
    context: &'a AssertionContext,
    failure: &'a AssertionFailure,
}

impl<'a> FailureReport<'a> {
    /// Pair a context with its failure.
    #[inline]
    pub fn new(context: &'a AssertionContext, failure: &'a AssertionFailure) -> Self {
        Self { context, failure }
    }

    /// Context of the failed scope.
    #[inline]
    pub fn context(&self) -> &'a AssertionContext {
        self.context
    }

    /// The failure itself.
    #[inline]
    pub fn failure(&self) -> &'a AssertionFailure {
        self.failure
    }

    /// Write the report without intermediate allocation for short fields.
    pub fn write_to(
        &self,
        f: &mut impl fmt::Write,
        max_field_len: usize,
        show_exchange: bool,
    ) -> fmt::Result {
        let ctx = self.context;
        let failure = self.failure;

        write!(f, "[{}] {}", failure.severity(), failure.kind())?;

        if !ctx.test_name().is_empty() {
            write!(
                f,
                "\n  test: {}",
                truncate_with_indicator(ctx.test_name(), max_field_len)
            )?;
        }

        write!(
            f,
            "\n  assertion: {}",
            truncate_with_indicator(&ctx.display_path(), max_field_len)
        )?;

        if show_exchange {
            if let Some(name) = ctx.request_name() {
                write!(f, "\n  request name: {}", truncate_with_indicator(name, max_field_len))?;
            }
            if let Some(request) = ctx.request() {
                write!(
                    f,
                    "\n  request: {}",
                    truncate_with_indicator(&request.to_string(), max_field_len)
                )?;
            }
            if let Some(response) = ctx.response() {
                write!(f, "\n  response: {}", response)?;
            }
        }

        if let Some(expected) = failure.expected_value() {
            write!(
                f,
                "\n  expected: {}",
                truncate_with_indicator(&expected.to_string(), max_field_len)
            )?;
        }

        if let Some(actual) = failure.actual_value() {
            write!(
                f,
                "\n  actual: {}",
                truncate_with_indicator(&actual.to_string(), max_field_len)
            )?;
        }

        if let Some(delta) = failure.delta_value() {
            write!(f, "\n  delta: {}", delta)?;
        }

        for error in failure.errors() {
            write!(f, "\n  error: {}", truncate_with_indicator(error, max_field_len))?;
        }

        Ok(())
    }
}

/// Truncate a string for display, keeping UTF-8 boundaries.
///
/// Returns a `Cow` so the common short case does not allocate.
pub(crate) fn truncate_with_indicator(s: &str, max_len: usize) -> Cow<'_, str> {
    if s.len() <= max_len {
        return Cow::Borrowed(s);
    }

    let max_content_len = max_len.saturating_sub(TRUNCATION_INDICATOR.len());

    let mut idx = max_content_len;
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }

    if idx == 0 {
        return Cow::Borrowed(TRUNCATION_INDICATOR);
    }

    let mut result = String::with_capacity(idx + TRUNCATION_INDICATOR.len());
    result.push_str(&s[..idx]);
    result.push_str(TRUNCATION_INDICATOR);
    Cow::Owned(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::Environment;
    use crate::models::{AssertionKind, AssertionValue};
    use crate::transport::{Request, Response};
    use std::sync::Arc;

    fn context() -> AssertionContext {
        let mut ctx = AssertionContext::new("fmt_test", "Body()", Arc::new(Environment::new()));
        ctx.push_segment("IsEqual()".into());
        ctx
    }

    #[test]
    fn failure_includes_path_and_values() {
        let failure = AssertionFailure::new(AssertionKind::Equal)
            .actual(AssertionValue::value("foo"))
            .expected(AssertionValue::value("bar"));

        let text = DefaultFormatter::default().format_failure(&context(), &failure);

        assert!(text.starts_with("[fatal] expected: values are equal"));
        assert!(text.contains("test: fmt_test"));
        assert!(text.contains("assertion: Body().IsEqual()"));
        assert!(text.contains("expected: \"bar\""));
        assert!(text.contains("actual: \"foo\""));
    }

    #[test]
    fn failure_includes_exchange_when_present() {
        let mut ctx = context();
        ctx.request = Some(Arc::new(Request::new("GET", "/users/1")));
        ctx.response = Some(Arc::new(Response::new(404)));

        let failure = AssertionFailure::new(AssertionKind::Equal);
        let text = DefaultFormatter::default().format_failure(&ctx, &failure);
        assert!(text.contains("request: GET /users/1"));
        assert!(text.contains("response: 404"));

        let quiet = DefaultFormatter::default().with_exchange(false);
        let text = quiet.format_failure(&ctx, &failure);
        assert!(!text.contains("request:"));
    }

    #[test]
    fn failure_lists_delta_and_errors() {
        let failure = AssertionFailure::new(AssertionKind::EqualDelta)
            .delta(0.5)
            .error("first")
            .error("second");
        let text = DefaultFormatter::default().format_failure(&context(), &failure);

        assert!(text.contains("delta: 0.5"));
        assert!(text.contains("error: first"));
        assert!(text.contains("error: second"));
    }

    #[test]
    fn long_actual_is_truncated() {
        let failure = AssertionFailure::new(AssertionKind::Equal)
            .actual(AssertionValue::value("x".repeat(5000)));
        let text = DefaultFormatter::default()
            .with_max_field_len(64)
            .format_failure(&context(), &failure);

        assert!(text.contains(TRUNCATION_INDICATOR));
        assert!(text.len() < 400);
    }

    #[test]
    fn success_line() {
        let text = DefaultFormatter::default().format_success(&context());
        assert_eq!(text, "[ok] Body().IsEqual()");
    }

    #[test]
    fn no_truncate_when_under_limit() {
        let truncated = truncate_with_indicator("short string", MAX_FIELD_OUTPUT_LEN);
        assert!(matches!(truncated, Cow::Borrowed(_)));
    }

    #[test]
    fn exactly_at_limit() {
        let s = "a".repeat(MAX_FIELD_OUTPUT_LEN);
        let truncated = truncate_with_indicator(&s, MAX_FIELD_OUTPUT_LEN);
        assert!(matches!(truncated, Cow::Borrowed(_)));
    }

    #[test]
    fn truncate_utf8_boundary() {
        let s = "й".repeat(MAX_FIELD_OUTPUT_LEN);
        let truncated = truncate_with_indicator(&s, MAX_FIELD_OUTPUT_LEN);

        assert!(truncated.len() <= MAX_FIELD_OUTPUT_LEN);
        assert!(truncated.ends_with(TRUNCATION_INDICATOR));
    }
}
