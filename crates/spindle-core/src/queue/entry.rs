//! Task entry: metadata + type-erased work.

use std::cmp::Ordering;
use std::fmt;

use futures::future::BoxFuture;

use crate::domain::{Priority, Sequence, Settlement, TaskId};

/// A finished task whose result handle has not been settled yet.
///
/// The queue releases the slot first and calls [`Completion::deliver`] after,
/// so a caller woken by its handle never sees the slot still taken.
pub(crate) struct Completion {
    pub(crate) settlement: Settlement,
    deliver: Box<dyn FnOnce() + Send>,
}

impl Completion {
    pub(crate) fn new<F>(settlement: Settlement, deliver: F) -> Self
    where
        F: FnOnce() + Send + 'static,
    {
        Self {
            settlement,
            deliver: Box::new(deliver),
        }
    }

    /// Settle the result handle.
    pub(crate) fn deliver(self) {
        (self.deliver)()
    }
}

impl fmt::Debug for Completion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Completion")
            .field("settlement", &self.settlement)
            .finish_non_exhaustive()
    }
}

/// Type-erased task together with the sender of its result handle.
///
/// Exactly one of `run` / `cancel` is ever called, and both consume the box,
/// so a result handle cannot be settled twice.
pub(crate) trait ErasedTask: Send {
    /// Run the task. The handle is settled once the returned
    /// [`Completion`] is delivered.
    fn run(self: Box<Self>) -> BoxFuture<'static, Completion>;

    /// Settle the handle with `TaskError::Cancelled` without running.
    fn cancel(self: Box<Self>);
}

/// One submitted unit of work waiting in the pending store.
///
/// Ordering:
/// - higher `priority` first
/// - lower `sequence` first among equal priorities (FIFO)
pub(crate) struct TaskEntry {
    pub(crate) id: TaskId,
    pub(crate) priority: Priority,
    pub(crate) sequence: Sequence,
    pub(crate) task: Box<dyn ErasedTask>,
}

impl TaskEntry {
    pub(crate) fn new(
        id: TaskId,
        priority: Priority,
        sequence: Sequence,
        task: Box<dyn ErasedTask>,
    ) -> Self {
        Self {
            id,
            priority,
            sequence,
            task,
        }
    }

    pub(crate) fn cancel(self) {
        self.task.cancel();
    }
}

impl fmt::Debug for TaskEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskEntry")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .field("sequence", &self.sequence)
            .finish_non_exhaustive()
    }
}

impl PartialEq for TaskEntry {
    fn eq(&self, other: &Self) -> bool {
        self.priority == other.priority && self.sequence == other.sequence
    }
}

impl Eq for TaskEntry {}

impl PartialOrd for TaskEntry {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for TaskEntry {
    fn cmp(&self, other: &Self) -> Ordering {
        // BinaryHeap is a max-heap: the "greatest" entry is admitted first.
        self.priority
            .cmp(&other.priority)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}
