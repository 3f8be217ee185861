//! Request/response handles and the collaborators that move them.
//!
//! The chain engine never performs I/O. It only stores the [`Request`] and
//! [`Response`] produced here into the assertion context so failures can be
//! shown next to the exchange that caused them.
//!
//! - [`Transport`]: "send a request, get a response or an error"
//! - [`FnTransport`]: binds a closure directly as the round-tripper, so a
//!   handler under test can be exercised without a socket
//! - [`Printer`]: records exchanges for diagnostics

use crate::{ExpectError, Result};
use std::fmt;
use std::time::{Duration, Instant};

// ============================================================================
// Request / Response
// ============================================================================

/// An HTTP request as seen by assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
    method: String,
    url: String,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
}

impl Request {
    /// Create a request with no headers and an empty body.
    pub fn new(method: impl Into<String>, url: impl Into<String>) -> Self {
        Self {
            method: method.into(),
            url: url.into(),
            headers: Vec::new(),
            body: Vec::new(),
        }
    }

    /// Append a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace the body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Serialize `value` as the JSON body and set `Content-Type`.
    pub fn with_json<T: serde::Serialize>(self, value: &T) -> Result<Self> {
        let body = serde_json::to_vec(value).map_err(|e| ExpectError::InvalidRequest {
            reason: e.to_string(),
        })?;
        Ok(self
            .with_header("Content-Type", "application/json")
            .with_body(body))
    }

    /// HTTP method.
    #[inline]
    pub fn method(&self) -> &str {
        &self.method
    }

    /// Target URL.
    #[inline]
    pub fn url(&self) -> &str {
        &self.url
    }

    /// All headers in insertion order.
    #[inline]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// Raw body bytes.
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl fmt::Display for Request {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.method, self.url)
    }
}

/// An HTTP response as seen by assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    status: u16,
    headers: Vec<(String, String)>,
    body: Vec<u8>,
    rtt: Option<Duration>,
}

impl Response {
    /// Create a response with the given status and no headers or body.
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: Vec::new(),
            rtt: None,
        }
    }

    /// Append a header.
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Replace the body.
    pub fn with_body(mut self, body: impl Into<Vec<u8>>) -> Self {
        self.body = body.into();
        self
    }

    /// Record the round-trip time.
    pub fn with_rtt(mut self, rtt: Duration) -> Self {
        self.rtt = Some(rtt);
        self
    }

    /// Status code.
    #[inline]
    pub fn status(&self) -> u16 {
        self.status
    }

    /// All headers in insertion order.
    #[inline]
    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    /// First header matching `name`, compared case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Raw body bytes.
    #[inline]
    pub fn body(&self) -> &[u8] {
        &self.body
    }

    /// Round-trip time, when the transport measured it.
    #[inline]
    pub fn rtt(&self) -> Option<Duration> {
        self.rtt
    }
}

impl fmt::Display for Response {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({} bytes)", self.status, self.body.len())
    }
}

// ============================================================================
// Transport
// ============================================================================

/// Sends a request and returns the response.
pub trait Transport: Send + Sync {
    /// Perform one round trip.
    fn round_trip(&self, request: &Request) -> Result<Response>;
}

/// Transport backed by a closure, typically the handler under test.
///
/// # Example
///
/// ```rust
/// use fluent_expect::{FnTransport, Request, Response, Transport};
///
/// let transport = FnTransport::new(|req: &Request| {
///     Ok(Response::new(if req.url() == "/health" { 200 } else { 404 }))
/// });
///
/// let resp = transport.round_trip(&Request::new("GET", "/health")).unwrap();
/// assert_eq!(resp.status(), 200);
/// ```
pub struct FnTransport<F> {
    handler: F,
}

impl<F> FnTransport<F>
where
    F: Fn(&Request) -> Result<Response> + Send + Sync,
{
    /// Wrap a handler function.
    pub fn new(handler: F) -> Self {
        Self { handler }
    }
}

impl<F> Transport for FnTransport<F>
where
    F: Fn(&Request) -> Result<Response> + Send + Sync,
{
    /// Stamps the elapsed time unless the handler recorded its own.
    fn round_trip(&self, request: &Request) -> Result<Response> {
        let started = Instant::now();
        let response = (self.handler)(request)?;
        Ok(match response.rtt() {
            Some(_) => response,
            None => response.with_rtt(started.elapsed()),
        })
    }
}

// ============================================================================
// Printer
// ============================================================================

/// Records requests and responses for diagnostic output.
pub trait Printer: Send + Sync {
    /// Called before the request is sent.
    fn request(&self, request: &Request);

    /// Called after a response is received.
    fn response(&self, response: &Response);
}

/// Printer that emits `tracing` events at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingPrinter;

impl Printer for TracingPrinter {
    fn request(&self, request: &Request) {
        tracing::debug!(
            target: "fluent_expect::transport",
            method = %request.method(),
            url = %request.url(),
            body_len = request.body().len(),
            "request"
        );
    }

    fn response(&self, response: &Response) {
        tracing::debug!(
            target: "fluent_expect::transport",
            status = response.status(),
            body_len = response.body().len(),
            rtt_us = response.rtt().map(|d| d.as_micros() as u64),
            "response"
        );
    }
}
