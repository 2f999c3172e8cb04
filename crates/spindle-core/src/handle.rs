//! TaskHandle - the caller's side of a task's one-shot result.

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::task::{Context, Poll};

use tokio::sync::oneshot;

use crate::domain::{Priority, TaskId};
use crate::error::TaskError;

/// Future resolving to the outcome of one submitted task.
///
/// Settled exactly once: with the task's value, with its error, or with
/// `TaskError::Cancelled` if the entry was cleared before it started.
/// Dropping the handle does not cancel the task.
#[must_use = "dropping a TaskHandle discards the task's result"]
pub struct TaskHandle<T> {
    id: TaskId,
    priority: Priority,
    rx: oneshot::Receiver<Result<T, TaskError>>,
}

impl<T> TaskHandle<T> {
    pub(crate) fn new(
        id: TaskId,
        priority: Priority,
        rx: oneshot::Receiver<Result<T, TaskError>>,
    ) -> Self {
        Self { id, priority, rx }
    }

    pub fn id(&self) -> TaskId {
        self.id
    }

    pub fn priority(&self) -> Priority {
        self.priority
    }
}

impl<T> Future for TaskHandle<T> {
    type Output = Result<T, TaskError>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or_else(|_| Err(TaskError::Dropped)))
    }
}

impl<T> fmt::Debug for TaskHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("id", &self.id)
            .field("priority", &self.priority)
            .finish_non_exhaustive()
    }
}
