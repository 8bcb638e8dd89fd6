//! Process-wide edit sequence counter.
//!
//! Every `EditorModule` frame gets an `edit_id` from this counter before it is
//! broadcast.  Clients apply edits in `edit_id` order, so the counter must hand
//! out unique, increasing values no matter how many connection tasks share it.
//!
//! # Thread safety
//!
//! The counter is a single `AtomicU64`.  Each connection's read path and the
//! coordination loop hold an `Arc<SequenceCounter>` and call [`next`] without
//! any lock.
//!
//! [`next`]: SequenceCounter::next

use std::sync::atomic::{AtomicU64, Ordering};

/// A thread-safe, monotonically increasing counter for edit sequence numbers.
///
/// Sequence numbers start at 0 and increment by 1 with each call to [`next`].
/// The counter wraps around at `u64::MAX` back to 0 without panicking.
///
/// # Examples
///
/// ```rust
/// use collab_core::protocol::SequenceCounter;
///
/// let counter = SequenceCounter::new();
/// assert_eq!(counter.next(), 0);
/// assert_eq!(counter.next(), 1);
/// ```
///
/// [`next`]: SequenceCounter::next
#[derive(Debug)]
pub struct SequenceCounter {
    inner: AtomicU64,
}

impl SequenceCounter {
    /// Creates a new counter starting at 0.
    pub fn new() -> Self {
        Self::starting_at(0)
    }

    /// Creates a counter whose first [`next`](Self::next) returns `first`.
    pub fn starting_at(first: u64) -> Self {
        Self {
            inner: AtomicU64::new(first),
        }
    }

    /// Returns the next sequence number and atomically increments the counter.
    ///
    /// `Relaxed` is enough: the value orders edits, it does not publish memory.
    pub fn next(&self) -> u64 {
        self.inner.fetch_add(1, Ordering::Relaxed)
    }

    /// Returns the value the next call to [`next`](Self::next) would hand out.
    pub fn current(&self) -> u64 {
        self.inner.load(Ordering::Relaxed)
    }
}

impl Default for SequenceCounter {
    fn default() -> Self {
        Self::new()
    }
}
