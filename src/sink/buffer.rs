//! In-memory log buffer and flush policy
//!
//! Rendered messages accumulate here until the policy says they should reach the
//! sink's destination. The buffer itself is not synchronised; sinks guard it with a
//! [`WriteLock`].

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::level::Severity;

/// When buffered text must be flushed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FlushPolicy {
    /// Flush once the buffer holds at least this many bytes (0 = flush every write)
    pub max_buffer_size: usize,
    /// Flush after every accepted message regardless of size
    pub flush_after_write: bool,
}

impl FlushPolicy {
    pub fn new(max_buffer_size: usize, flush_after_write: bool) -> Self {
        Self {
            max_buffer_size,
            flush_after_write,
        }
    }

    /// Decide whether a buffer of `buffered` bytes must be flushed after a `level` append
    pub fn should_flush(&self, level: Severity, buffered: usize) -> bool {
        level.is_bad()
            || self.max_buffer_size == 0
            || buffered >= self.max_buffer_size
            || self.flush_after_write
    }
}

impl Default for FlushPolicy {
    fn default() -> Self {
        Self::new(0, true)
    }
}

/// Append-only text buffer, cleared by a successful flush
#[derive(Debug, Default)]
pub struct LogBuffer {
    content: String,
}

impl LogBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a message, terminating it with a newline if it has none
    pub fn append(&mut self, message: &str) {
        self.content.push_str(message);
        if !message.ends_with(['\n', '\r']) {
            self.content.push('\n');
        }
    }

    /// Buffered bytes
    pub fn len(&self) -> usize {
        self.content.len()
    }

    pub fn is_empty(&self) -> bool {
        self.content.is_empty()
    }

    pub fn as_str(&self) -> &str {
        &self.content
    }

    /// Drop all buffered text (after it was written out)
    pub fn clear(&mut self) {
        self.content.clear();
    }
}

/// Lock serialising append, flush decision and flush for every sink holding it
///
/// Each sink creates its own lock by default. Clone one lock into several sinks to
/// serialise their writes against each other.
#[derive(Debug, Clone, Default)]
pub struct WriteLock(Arc<Mutex<()>>);

impl WriteLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block until the lock is held. A poisoned lock is recovered.
    pub fn acquire(&self) -> MutexGuard<'_, ()> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Check whether two handles guard the same scope
    pub fn is_shared_with(&self, other: &WriteLock) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}
