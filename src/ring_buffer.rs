// src/ring_buffer.rs
//! Ring buffer of recent assertion failures with bounded memory.
//!
//! [`FailureLog`] is a non-fatal [`AssertionHandler`]: it never aborts a
//! test, it records. Useful for soak suites and for parallel runners that
//! want a summary at the end instead of a panic at the first failure.
//!
//! # Design Principles
//!
//! - **Bounded memory**: fixed number of entries, FIFO eviction
//! - **Per-entry size caps**: no single failure can dominate the buffer
//! - **RwLock-based**: concurrent readers, exclusive writers
//! - **Exact counters**: totals survive eviction
//!
//! # Example
//!
//! ```rust
//! use fluent_expect::ring_buffer::FailureLog;
//! use fluent_expect::{Config, Expect, Severity};
//! use std::sync::Arc;
//!
//! let log = Arc::new(FailureLog::new(100, 1024));
//! let expect = Expect::new(
//!     Config::builder()
//!         .handler(log.clone())
//!         .severity(Severity::NonFatal)
//!         .build(),
//! );
//!
//! expect.number(3).gt(5.0);
//! expect.number(3).lt(5.0);
//!
//! assert_eq!(log.failure_count(), 1);
//! assert_eq!(log.success_count(), 1);
//! assert!(log.get_recent(1)[0].path.contains("Gt("));
//! ```

use crate::context::AssertionContext;
use crate::formatter::{DefaultFormatter, Formatter};
use crate::handler::AssertionHandler;
use crate::models::{AssertionFailure, AssertionKind, Severity};
use std::borrow::Cow;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::time::{SystemTime, UNIX_EPOCH};

/// One recorded failure.
///
/// Uses `Arc<str>` so `get_recent()` clones are refcount increments.
#[derive(Clone, Debug)]
pub struct FailureEntry {
    /// Unix timestamp of the report
    pub timestamp: u64,
    /// Owning test name
    pub test_name: Arc<str>,
    /// Aliased path joined with `.`
    pub path: Arc<str>,
    /// Kind of failed check
    pub kind: AssertionKind,
    /// Severity advertised by the chain
    pub severity: Severity,
    /// Formatted failure message
    pub message: Arc<str>,
    /// Approximate size in bytes
    pub size_bytes: usize,
}

/// Fixed-size ring buffer with exact allocation (no growth).
struct RingBuffer {
    entries: Box<[Option<FailureEntry>]>,
    tail: usize,
    head: usize,
    len: usize,
}

impl RingBuffer {
    fn new(capacity: usize) -> Self {
        Self {
            entries: std::iter::repeat_with(|| None)
                .take(capacity)
                .collect::<Box<[Option<FailureEntry>]>>(),
            tail: 0,
            head: 0,
            len: 0,
        }
    }

    fn push(&mut self, entry: FailureEntry) -> Option<FailureEntry> {
        let evicted = self.entries[self.tail].replace(entry);
        self.tail = (self.tail + 1) % self.entries.len();

        if self.len < self.entries.len() {
            self.len += 1;
        } else {
            self.head = (self.head + 1) % self.entries.len();
        }

        evicted
    }

    #[inline]
    fn len(&self) -> usize {
        self.len
    }

    fn iter(&self) -> impl DoubleEndedIterator<Item = &FailureEntry> {
        let head = self.head;
        let len = self.len;
        let cap = self.entries.len();

        (0..len).filter_map(move |i| {
            let idx = (head + i) % cap;
            self.entries[idx].as_ref()
        })
    }

    fn clear(&mut self) {
        for entry in self.entries.iter_mut() {
            *entry = None;
        }
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }
}

/// Bounded, thread-safe failure recorder.
///
/// Cloning shares the underlying buffer and counters.
pub struct FailureLog {
    buffer: Arc<RwLock<RingBuffer>>,
    max_entries: usize,
    max_entry_bytes: usize,
    formatter: DefaultFormatter,
    successes: Arc<AtomicU64>,
    failures: Arc<AtomicU64>,
    eviction_count: Arc<AtomicU64>,
}

impl FailureLog {
    /// Create a log holding at most `max_entries` failures of at most
    /// `max_entry_bytes` each (message and path combined).
    pub fn new(max_entries: usize, max_entry_bytes: usize) -> Self {
        let bounded_entries = max_entries.max(1);
        Self {
            buffer: Arc::new(RwLock::new(RingBuffer::new(bounded_entries))),
            max_entries: bounded_entries,
            max_entry_bytes,
            formatter: DefaultFormatter::default().with_max_field_len(max_entry_bytes.max(1)),
            successes: Arc::new(AtomicU64::new(0)),
            failures: Arc::new(AtomicU64::new(0)),
            eviction_count: Arc::new(AtomicU64::new(0)),
        }
    }

    #[inline]
    fn read_buffer(&self) -> RwLockReadGuard<'_, RingBuffer> {
        match self.buffer.read() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    #[inline]
    fn write_buffer(&self) -> RwLockWriteGuard<'_, RingBuffer> {
        match self.buffer.write() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }

    fn create_entry(&self, context: &AssertionContext, failure: &AssertionFailure) -> FailureEntry {
        let mut remaining = self.max_entry_bytes;

        let display_path = context.display_path();
        let path = truncate_to_bytes(&display_path, remaining.min(256));
        remaining = remaining.saturating_sub(path.len());

        let rendered = self.formatter.format_failure(context, failure);
        let message = truncate_to_bytes(&rendered, remaining);

        FailureEntry {
            timestamp: SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .map_or(0, |d| d.as_secs()),
            test_name: Arc::from(truncate_to_bytes(context.test_name(), 128).as_ref()),
            path: Arc::from(path.as_ref()),
            kind: failure.kind(),
            severity: failure.severity(),
            size_bytes: path.len() + message.len(),
            message: Arc::from(message.as_ref()),
        }
    }

    /// The N most recent failures, newest first.
    pub fn get_recent(&self, count: usize) -> Vec<FailureEntry> {
        let buffer = self.read_buffer();
        buffer.iter().rev().take(count).cloned().collect()
    }

    /// All retained failures, newest first.
    pub fn get_all(&self) -> Vec<FailureEntry> {
        let buffer = self.read_buffer();
        buffer.iter().rev().cloned().collect()
    }

    /// Retained failures matching a predicate, oldest first.
    pub fn get_filtered<F>(&self, predicate: F) -> Vec<FailureEntry>
    where
        F: Fn(&FailureEntry) -> bool,
    {
        let buffer = self.read_buffer();
        buffer.iter().filter(|e| predicate(e)).cloned().collect()
    }

    /// Number of retained failures.
    #[inline]
    pub fn len(&self) -> usize {
        self.read_buffer().len()
    }

    /// Whether nothing is retained.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total failures reported, including evicted ones.
    #[inline]
    pub fn failure_count(&self) -> u64 {
        self.failures.load(Ordering::Relaxed)
    }

    /// Total successes reported.
    #[inline]
    pub fn success_count(&self) -> u64 {
        self.successes.load(Ordering::Relaxed)
    }

    /// Failures dropped to make room for newer ones.
    #[inline]
    pub fn eviction_count(&self) -> u64 {
        self.eviction_count.load(Ordering::Relaxed)
    }

    /// Capacity in entries.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.max_entries
    }

    /// Drop all entries and reset counters.
    pub fn clear(&self) {
        self.write_buffer().clear();
        self.successes.store(0, Ordering::Relaxed);
        self.failures.store(0, Ordering::Relaxed);
        self.eviction_count.store(0, Ordering::Relaxed);
    }
}

impl Clone for FailureLog {
    fn clone(&self) -> Self {
        Self {
            buffer: Arc::clone(&self.buffer),
            max_entries: self.max_entries,
            max_entry_bytes: self.max_entry_bytes,
            formatter: self.formatter,
            successes: Arc::clone(&self.successes),
            failures: Arc::clone(&self.failures),
            eviction_count: Arc::clone(&self.eviction_count),
        }
    }
}

impl AssertionHandler for FailureLog {
    fn success(&self, _context: &AssertionContext) {
        self.successes.fetch_add(1, Ordering::Relaxed);
    }

    fn failure(&self, context: &AssertionContext, failure: &AssertionFailure) {
        let entry = self.create_entry(context, failure);
        self.failures.fetch_add(1, Ordering::Relaxed);

        let mut buffer = self.write_buffer();
        if buffer.push(entry).is_some() {
            self.eviction_count.fetch_add(1, Ordering::Relaxed);
        }
    }
}

/// Truncate string to maximum byte length, respecting UTF-8 boundaries.
fn truncate_to_bytes(s: &str, max_bytes: usize) -> Cow<'_, str> {
    if max_bytes == 0 {
        return Cow::Borrowed("");
    }
    if s.len() <= max_bytes {
        return Cow::Borrowed(s);
    }

    let indicator = "...[TRUNC]";
    if max_bytes <= indicator.len() {
        return Cow::Borrowed(&indicator[..max_bytes]);
    }
    let max_content = max_bytes - indicator.len();

    let mut idx = max_content;
    while idx > 0 && !s.is_char_boundary(idx) {
        idx -= 1;
    }

    if idx == 0 {
        return Cow::Borrowed(indicator);
    }

    let mut out = String::with_capacity(idx + indicator.len());
    out.push_str(&s[..idx]);
    out.push_str(indicator);
    Cow::Owned(out)
}
