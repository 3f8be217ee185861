//! Configuration for [`Expect`](crate::Expect).
//!
//! Everything a root chain needs is decided here, once, and threaded down
//! the tree: the handler, the default severity, and whether lifecycle
//! misuse panics. There is no process-wide switch.
//!
//! # Example
//!
//! ```rust
//! use fluent_expect::{Config, PanicReporter, Severity};
//! use std::sync::Arc;
//!
//! let config = Config::builder()
//!     .test_name("orders_api")
//!     .reporter(Arc::new(PanicReporter))
//!     .severity(Severity::Fatal)
//!     .validation(true)
//!     .build();
//!
//! assert_eq!(config.test_name(), "orders_api");
//! ```

use crate::context::Environment;
use crate::handler::{AssertionHandler, DefaultAssertionHandler, Reporter};
use crate::models::Severity;
use crate::transport::{Printer, Transport};
use crate::ExpectError;
use std::sync::Arc;

/// Immutable settings shared by every chain an [`Expect`](crate::Expect)
/// creates.
#[derive(Clone)]
pub struct Config {
    pub(crate) test_name: String,
    pub(crate) handler: Arc<dyn AssertionHandler>,
    pub(crate) severity: Severity,
    pub(crate) validation: bool,
    pub(crate) transport: Option<Arc<dyn Transport>>,
    pub(crate) printers: Vec<Arc<dyn Printer>>,
    pub(crate) environment: Arc<Environment>,
}

impl Config {
    /// Start building a configuration.
    #[inline]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }

    /// Test name stamped on every context.
    #[inline]
    pub fn test_name(&self) -> &str {
        &self.test_name
    }

    /// Handler receiving every report.
    #[inline]
    pub fn handler(&self) -> &Arc<dyn AssertionHandler> {
        &self.handler
    }

    /// Severity of root chains.
    #[inline]
    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Whether lifecycle misuse panics.
    #[inline]
    pub fn validation(&self) -> bool {
        self.validation
    }

    /// Environment shared by every tree.
    #[inline]
    pub fn environment(&self) -> &Arc<Environment> {
        &self.environment
    }
}

impl Default for Config {
    fn default() -> Self {
        ConfigBuilder::new().build()
    }
}

/// Fluent builder for [`Config`].
///
/// # State Tracking
///
/// Setting the handler (or reporter) twice panics in debug builds; in
/// release builds the last write wins. Setting both a handler and a
/// reporter is rejected by [`try_build`](Self::try_build) because the
/// reporter would be silently ignored.
#[derive(Default)]
pub struct ConfigBuilder {
    test_name: Option<String>,
    handler: Option<Arc<dyn AssertionHandler>>,
    reporter: Option<Arc<dyn Reporter>>,
    severity: Severity,
    validation: Option<bool>,
    transport: Option<Arc<dyn Transport>>,
    printers: Vec<Arc<dyn Printer>>,
    environment: Option<Arc<Environment>>,
}

impl ConfigBuilder {
    /// Defaults: panic on fatal failures, `Fatal` severity, validation
    /// following `debug_assertions`, no transport.
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    /// Name of the owning test.
    pub fn test_name(mut self, name: impl Into<String>) -> Self {
        self.test_name = Some(name.into());
        self
    }

    /// Use a custom handler.
    pub fn handler(mut self, handler: Arc<dyn AssertionHandler>) -> Self {
        debug_assert!(
            self.handler.is_none(),
            "ConfigBuilder: handler already set (attempted overwrite)"
        );
        self.handler = Some(handler);
        self
    }

    /// Use the default handler with this reporter for fatal failures.
    pub fn reporter(mut self, reporter: Arc<dyn Reporter>) -> Self {
        debug_assert!(
            self.reporter.is_none(),
            "ConfigBuilder: reporter already set (attempted overwrite)"
        );
        self.reporter = Some(reporter);
        self
    }

    /// Severity of root chains.
    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Whether lifecycle misuse panics.
    pub fn validation(mut self, enabled: bool) -> Self {
        self.validation = Some(enabled);
        self
    }

    /// Transport used by [`Expect::perform`](crate::Expect::perform).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Add a printer. Printers are called in insertion order.
    pub fn printer(mut self, printer: Arc<dyn Printer>) -> Self {
        self.printers.push(printer);
        self
    }

    /// Share an existing environment.
    pub fn environment(mut self, environment: Arc<Environment>) -> Self {
        self.environment = Some(environment);
        self
    }

    /// Build, panicking on inconsistent settings.
    ///
    /// # Panics
    ///
    /// Panics if both a handler and a reporter were set. Use
    /// [`try_build`](Self::try_build) for a non-panicking version.
    #[inline]
    pub fn build(self) -> Config {
        match self.try_build() {
            Ok(config) => config,
            Err(err) => panic!("ConfigBuilder: {}", err),
        }
    }

    /// Build, returning an error on inconsistent settings.
    pub fn try_build(self) -> Result<Config, ExpectError> {
        let handler: Arc<dyn AssertionHandler> = match (self.handler, self.reporter) {
            (Some(_), Some(_)) => {
                return Err(ExpectError::InvalidConfig {
                    reason: "handler and reporter are mutually exclusive",
                });
            }
            (Some(handler), None) => handler,
            (None, Some(reporter)) => Arc::new(DefaultAssertionHandler::new(reporter)),
            (None, None) => Arc::new(DefaultAssertionHandler::default()),
        };

        Ok(Config {
            test_name: self.test_name.unwrap_or_default(),
            handler,
            severity: self.severity,
            validation: self.validation.unwrap_or(cfg!(debug_assertions)),
            transport: self.transport,
            printers: self.printers,
            environment: self.environment.unwrap_or_default(),
        })
    }
}
