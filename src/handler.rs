//! Result sinks: where chains send success and failure reports.
//!
//! - [`AssertionHandler`]: the trait every chain reports through
//! - [`DefaultAssertionHandler`]: formats failures and hands them to a
//!   [`Reporter`] (fatal) or to `tracing` (non-fatal)
//! - [`RecordingHandler`]: stores every call, for testing code built on chains
//!
//! [`FailureLog`](crate::ring_buffer::FailureLog) is a third, bounded sink
//! for long-running suites.
//!
//! Handlers are shared by every node of a tree and may be called from many
//! threads at once; implementations serialize their own mutable state.

use crate::context::AssertionContext;
use crate::formatter::{DefaultFormatter, Formatter};
use crate::models::{AssertionFailure, Severity};
use std::sync::{Arc, Mutex, MutexGuard};

// ============================================================================
// Traits
// ============================================================================

/// Receives the outcome of every finished assertion.
pub trait AssertionHandler: Send + Sync {
    /// An entered chain left without any failure in its subtree.
    fn success(&self, context: &AssertionContext);

    /// A chain failed. Called once per chain, at `fail()` time.
    ///
    /// A handler for [`Severity::Fatal`] failures may panic to abort the
    /// calling test; chains are unwind-safe with respect to this.
    fn failure(&self, context: &AssertionContext, failure: &AssertionFailure);
}

/// Textual sink for formatted failure messages.
pub trait Reporter: Send + Sync {
    /// Report a formatted failure.
    fn report(&self, message: &str);
}

/// Reporter that panics with the message, aborting the current test.
#[derive(Debug, Default, Clone, Copy)]
pub struct PanicReporter;

impl Reporter for PanicReporter {
    fn report(&self, message: &str) {
        panic!("{}", message);
    }
}

// ============================================================================
// Default Handler
// ============================================================================

/// Formats failures and routes them by severity.
///
/// - `Fatal` failures go to the reporter.
/// - `NonFatal` failures are emitted as `tracing` warnings, and to the
///   optional non-fatal reporter when one is configured.
/// - Successes are formatted and traced at `trace` level, and sent to the
///   optional success reporter.
pub struct DefaultAssertionHandler {
    formatter: Arc<dyn Formatter>,
    reporter: Arc<dyn Reporter>,
    non_fatal: Option<Arc<dyn Reporter>>,
    success: Option<Arc<dyn Reporter>>,
}

impl DefaultAssertionHandler {
    /// Create a handler with the default formatter.
    pub fn new(reporter: Arc<dyn Reporter>) -> Self {
        Self {
            formatter: Arc::new(DefaultFormatter::default()),
            reporter,
            non_fatal: None,
            success: None,
        }
    }

    /// Replace the formatter.
    pub fn with_formatter(mut self, formatter: Arc<dyn Formatter>) -> Self {
        self.formatter = formatter;
        self
    }

    /// Also send non-fatal failures to `reporter`.
    pub fn with_non_fatal_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.non_fatal = Some(reporter);
        self
    }

    /// Send formatted successes to `reporter`.
    pub fn with_success_reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        self.success = Some(reporter);
        self
    }
}

impl Default for DefaultAssertionHandler {
    fn default() -> Self {
        Self::new(Arc::new(PanicReporter))
    }
}

impl AssertionHandler for DefaultAssertionHandler {
    fn success(&self, context: &AssertionContext) {
        let traced = tracing::enabled!(target: "fluent_expect::handler", tracing::Level::TRACE);
        if !traced && self.success.is_none() {
            return;
        }
        let message = self.formatter.format_success(context);
        tracing::trace!(
            target: "fluent_expect::handler",
            test = %context.test_name(),
            "{}",
            message
        );
        if let Some(reporter) = &self.success {
            reporter.report(&message);
        }
    }

    fn failure(&self, context: &AssertionContext, failure: &AssertionFailure) {
        let message = self.formatter.format_failure(context, failure);
        match failure.severity() {
            Severity::Fatal => self.reporter.report(&message),
            Severity::NonFatal => {
                tracing::warn!(
                    target: "fluent_expect::handler",
                    test = %context.test_name(),
                    path = %context.display_path(),
                    kind = ?failure.kind(),
                    "{}",
                    message
                );
                if let Some(reporter) = &self.non_fatal {
                    reporter.report(&message);
                }
            }
        }
    }
}

// ============================================================================
// Recording Handler
// ============================================================================

/// Handler that records every call for later inspection.
///
/// Wrap in `Arc` to share it between a chain and the test inspecting it.
#[derive(Debug, Default)]
pub struct RecordingHandler {
    successes: Mutex<Vec<AssertionContext>>,
    failures: Mutex<Vec<(AssertionContext, AssertionFailure)>>,
}

impl RecordingHandler {
    /// Create an empty recorder.
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
        match mutex.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    /// Contexts of all successes, in report order.
    pub fn successes(&self) -> Vec<AssertionContext> {
        Self::lock(&self.successes).clone()
    }

    /// All failures with their contexts, in report order.
    pub fn failures(&self) -> Vec<(AssertionContext, AssertionFailure)> {
        Self::lock(&self.failures).clone()
    }

    /// Number of successes.
    pub fn success_count(&self) -> usize {
        Self::lock(&self.successes).len()
    }

    /// Number of failures.
    pub fn failure_count(&self) -> usize {
        Self::lock(&self.failures).len()
    }

    /// Forget everything recorded so far.
    pub fn clear(&self) {
        Self::lock(&self.successes).clear();
        Self::lock(&self.failures).clear();
    }
}

impl AssertionHandler for RecordingHandler {
    fn success(&self, context: &AssertionContext) {
        Self::lock(&self.successes).push(context.clone());
    }

    fn failure(&self, context: &AssertionContext, failure: &AssertionFailure) {
        Self::lock(&self.failures).push((context.clone(), failure.clone()));
    }
}

// ============================================================================
// Tests
// ============================================================================
