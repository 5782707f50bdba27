//! # History Engine
//!
//! A linear undo/redo stack of immutable snapshots with a single cursor.
//!
//! ```text
//!   entries:  [s0] [s1] [s2] [s3]
//!                        ^ cursor          set(x) drops s3, appends x
//! ```
//!
//! ## Invariants
//!
//! - `0 <= cursor < entries.len()`; the history is never empty.
//! - `set` truncates everything after the cursor before appending.
//! - The length never exceeds `max_size`; the oldest entries are evicted
//!   and the cursor stays on the most recent `set` result.
//! - `reset` is not itself undoable.
//!
//! [`SharedHistory`] serializes every read-modify-write behind one lock for
//! hosts where more than one task touches the same history.

use std::sync::Arc;

use parking_lot::Mutex;

/// Default maximum number of retained snapshots.
pub const DEFAULT_MAX_HISTORY: usize = 50;

/// Linear snapshot history with undo/redo.
#[derive(Debug, Clone)]
pub struct History<T> {
    entries: Vec<T>,
    cursor: usize,
    max_size: usize,
}

impl<T: Clone> History<T> {
    /// Start a history at `initial` with the default size cap.
    pub fn new(initial: T) -> Self {
        Self::with_max_size(initial, DEFAULT_MAX_HISTORY)
    }

    /// Start a history at `initial` retaining at most `max_size` snapshots.
    ///
    /// A cap of zero is treated as one: the current state is always retained.
    pub fn with_max_size(initial: T, max_size: usize) -> Self {
        Self {
            entries: vec![initial],
            cursor: 0,
            max_size: max_size.max(1),
        }
    }

    /// The snapshot under the cursor.
    pub fn state(&self) -> &T {
        &self.entries[self.cursor]
    }

    /// Append `next`, discarding any redo history.
    pub fn set(&mut self, next: T) {
        self.entries.truncate(self.cursor + 1);
        self.entries.push(next);
        self.cursor = self.entries.len() - 1;
        if self.entries.len() > self.max_size {
            let excess = self.entries.len() - self.max_size;
            self.entries.drain(..excess);
            self.cursor = self.entries.len() - 1;
        }
    }

    /// Step back one snapshot. Returns `false` at the oldest entry.
    pub fn undo(&mut self) -> bool {
        if self.cursor == 0 {
            return false;
        }
        self.cursor -= 1;
        true
    }

    /// Step forward one snapshot. Returns `false` at the newest entry.
    pub fn redo(&mut self) -> bool {
        if self.cursor + 1 >= self.entries.len() {
            return false;
        }
        self.cursor += 1;
        true
    }

    /// Replace the whole history with `fresh` ("load document").
    pub fn reset(&mut self, fresh: T) {
        self.entries.clear();
        self.entries.push(fresh);
        self.cursor = 0;
    }

    /// Whether an undo step is available.
    pub fn can_undo(&self) -> bool {
        self.cursor > 0
    }

    /// Whether a redo step is available.
    pub fn can_redo(&self) -> bool {
        self.cursor + 1 < self.entries.len()
    }

    /// Number of retained snapshots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; a history holds at least the current state.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// The configured size cap.
    pub fn max_size(&self) -> usize {
        self.max_size
    }
}

/// UI gating flags derived from a history.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryStatus {
    /// An undo step is available.
    pub can_undo: bool,
    /// A redo step is available.
    pub can_redo: bool,
}

/// Thread-safe handle around a [`History`]; all clones share one history.
#[derive(Debug)]
pub struct SharedHistory<T> {
    inner: Arc<Mutex<History<T>>>,
}

impl<T> Clone for SharedHistory<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: Clone> SharedHistory<T> {
    /// Wrap a fresh history.
    pub fn new(initial: T, max_size: usize) -> Self {
        Self {
            inner: Arc::new(Mutex::new(History::with_max_size(initial, max_size))),
        }
    }

    /// Clone of the current snapshot.
    pub fn state(&self) -> T {
        self.inner.lock().state().clone()
    }

    /// Append a snapshot.
    pub fn set(&self, next: T) {
        self.inner.lock().set(next);
    }

    /// Undo and return the new current snapshot, or `None` at the boundary.
    pub fn undo(&self) -> Option<T> {
        let mut history = self.inner.lock();
        history.undo().then(|| history.state().clone())
    }

    /// Redo and return the new current snapshot, or `None` at the boundary.
    pub fn redo(&self) -> Option<T> {
        let mut history = self.inner.lock();
        history.redo().then(|| history.state().clone())
    }

    /// Replace the history with a single snapshot.
    pub fn reset(&self, fresh: T) {
        self.inner.lock().reset(fresh);
    }

    /// Both gating flags, read under one lock.
    pub fn status(&self) -> HistoryStatus {
        let history = self.inner.lock();
        HistoryStatus {
            can_undo: history.can_undo(),
            can_redo: history.can_redo(),
        }
    }

    /// Run `f` against the history while holding the lock.
    pub fn with<R>(&self, f: impl FnOnce(&mut History<T>) -> R) -> R {
        f(&mut self.inner.lock())
    }
}
