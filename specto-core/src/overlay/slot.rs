//! The shared "current overlay text" cell.
//!
//! One writer (the classification pipeline), concurrent readers (the
//! display throttler, status queries). The cell holds an immutable
//! `Arc<str>` and swaps the whole handle under a `parking_lot::Mutex`, so
//! a reader always observes a complete string — never a partially written
//! one. Last-writer-wins; no history is retained.

use std::sync::Arc;

use parking_lot::Mutex;

/// Cloneable handle to the shared overlay text.
#[derive(Clone)]
pub struct DisplaySlot {
    current: Arc<Mutex<Arc<str>>>,
}

impl DisplaySlot {
    /// A fresh slot holding the empty string.
    pub fn new() -> Self {
        Self {
            current: Arc::new(Mutex::new(Arc::from(""))),
        }
    }

    /// Replace the overlay text. The previous value is discarded; readers
    /// holding a snapshot keep their (now stale) string alive.
    pub fn publish(&self, text: String) {
        *self.current.lock() = Arc::from(text);
    }

    /// Current overlay text. Reading never clears the slot.
    pub fn snapshot(&self) -> Arc<str> {
        Arc::clone(&self.current.lock())
    }
}

impl Default for DisplaySlot {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DisplaySlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DisplaySlot")
            .field("current", &self.snapshot())
            .finish()
    }
}
