//! # Fluent Expect
//!
//! Fluent assertion chains for exercising HTTP endpoints in tests.
//!
//! ## Design Philosophy
//!
//! 1. **Every matcher call is a scope** in a tree of assertion chains
//! 2. **Failures are reported once**, where they happen, with the full path
//! 3. **Ancestors learn about failures** without re-reporting them
//! 4. **Reporting is pluggable**: panic at the first failure or collect them
//! 5. **Lifecycle misuse is a bug in the caller**, caught in validation mode
//!
//! ## Quick Start
//!
//! ```rust
//! use fluent_expect::{Config, Expect};
//! use serde_json::json;
//!
//! let expect = Expect::new(Config::builder().test_name("quick_start").build());
//!
//! let body = expect.value(json!({"id": 7, "tags": ["a", "b"]}));
//! let object = body.object();
//! object.contains_key("id");
//! object.value("id").number().is_equal(7.0);
//! object.value("tags").array().contains_all(["a"]);
//! ```
//!
//! ## Exercising a Handler
//!
//! ```rust
//! use fluent_expect::{Config, Expect, FnTransport, Request, Response};
//! use std::sync::Arc;
//!
//! let transport = FnTransport::new(|req: &Request| {
//!     Ok(Response::new(200)
//!         .with_header("Content-Type", "application/json")
//!         .with_body(format!(r#"{{"path":"{}"}}"#, req.url())))
//! });
//!
//! let expect = Expect::new(Config::builder().transport(Arc::new(transport)).build());
//!
//! let resp = expect.perform(Request::new("GET", "/ping"));
//! resp.status(200);
//! resp.json().object().value("path").string().is_equal("/ping");
//! ```
//!
//! ## Collecting Failures Instead of Panicking
//!
//! ```rust
//! use fluent_expect::{Config, Expect, RecordingHandler, Severity};
//! use std::sync::Arc;
//!
//! let handler = Arc::new(RecordingHandler::new());
//! let expect = Expect::new(
//!     Config::builder()
//!         .handler(handler.clone())
//!         .severity(Severity::NonFatal)
//!         .build(),
//! );
//!
//! expect.string("foo").is_equal("bar");
//!
//! let failures = handler.failures();
//! assert_eq!(failures.len(), 1);
//! assert_eq!(failures[0].0.path(), ["String()", "IsEqual(\"bar\")"]);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

use std::fmt;
use std::result;

pub mod array;
pub mod boolean;
pub mod chain;
pub mod config;
pub mod context;
pub mod expect;
pub mod formatter;
pub mod handler;
pub mod models;
pub mod number;
pub mod object;
pub mod response;
pub mod ring_buffer;
pub mod string;
pub mod transport;
pub mod value;

pub use array::*;
pub use boolean::*;
pub use chain::*;
pub use config::*;
pub use context::*;
pub use expect::*;
pub use formatter::*;
pub use handler::*;
pub use models::*;
pub use number::*;
pub use object::*;
pub use response::*;
pub use ring_buffer::*;
pub use string::*;
pub use transport::*;
pub use value::*;

/// Type alias for Results using the crate error type.
pub type Result<T> = result::Result<T, ExpectError>;

// ============================================================================
// Library Error
// ============================================================================

/// Errors surfaced outside the assertion chain.
///
/// Assertion failures never show up here: they go through the chain to the
/// configured handler. This type covers the collaborators around it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExpectError {
    /// The transport could not complete the round trip.
    Transport {
        /// Transport-specific reason.
        reason: String,
    },
    /// The request could not be built.
    InvalidRequest {
        /// What was wrong with it.
        reason: String,
    },
    /// The configuration is inconsistent.
    InvalidConfig {
        /// Which rule was violated.
        reason: &'static str,
    },
    /// A request was performed without a configured transport.
    NoTransport,
}

impl fmt::Display for ExpectError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Transport { reason } => write!(f, "transport failed: {}", reason),
            Self::InvalidRequest { reason } => write!(f, "invalid request: {}", reason),
            Self::InvalidConfig { reason } => write!(f, "invalid configuration: {}", reason),
            Self::NoTransport => f.write_str("no transport configured"),
        }
    }
}

impl std::error::Error for ExpectError {}
