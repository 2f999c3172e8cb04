//! Pending task store.

use std::collections::BinaryHeap;

use crate::domain::Priority;

use super::TaskEntry;

/// Not-yet-started entries ordered by `(priority desc, sequence asc)`.
///
/// Backed by a `BinaryHeap`, so push and pop are O(log n) regardless of how
/// deep the backlog grows. Entries are never reordered after insertion; the
/// sequence tie-break keeps equal priorities FIFO.
#[derive(Debug, Default)]
pub(crate) struct PendingStore {
    heap: BinaryHeap<TaskEntry>,
}

impl PendingStore {
    pub(crate) fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
        }
    }

    /// Insert an entry at its ordered position.
    pub(crate) fn push(&mut self, entry: TaskEntry) {
        self.heap.push(entry);
    }

    /// Remove the entry that should be admitted next.
    pub(crate) fn pop(&mut self) -> Option<TaskEntry> {
        self.heap.pop()
    }

    /// Priority of the entry that would be admitted next.
    pub(crate) fn peek_priority(&self) -> Option<Priority> {
        self.heap.peek().map(|entry| entry.priority)
    }

    pub(crate) fn len(&self) -> usize {
        self.heap.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    /// Remove every entry, returned in the order they would have been admitted.
    pub(crate) fn drain(&mut self) -> Vec<TaskEntry> {
        let mut entries = std::mem::take(&mut self.heap).into_sorted_vec();
        entries.reverse();
        entries
    }
}
