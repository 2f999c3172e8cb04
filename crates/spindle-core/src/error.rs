use std::error::Error as StdError;

use thiserror::Error;

/// Boxed error a task may fail with.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Why a task's result handle was rejected.
///
/// Only the caller holding the handle ever sees this; the queue itself keeps
/// running whatever a task does.
#[derive(Debug, Error)]
pub enum TaskError {
    /// The task returned an error. The original error is kept as the source.
    #[error("task failed: {0}")]
    Failed(#[source] BoxError),

    /// The task panicked while running.
    #[error("task panicked: {0}")]
    Panicked(String),

    /// The task was discarded by `clear()` before it was admitted.
    #[error("task was cancelled before it started")]
    Cancelled,

    /// The task was dropped without settling (its runtime shut down).
    #[error("task was dropped before it settled")]
    Dropped,
}

impl TaskError {
    pub fn is_failed(&self) -> bool {
        matches!(self, TaskError::Failed(_))
    }

    pub fn is_panic(&self) -> bool {
        matches!(self, TaskError::Panicked(_))
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, TaskError::Cancelled)
    }

    /// Borrow the task's own error as a concrete type.
    pub fn downcast_ref<E: StdError + 'static>(&self) -> Option<&E> {
        match self {
            TaskError::Failed(inner) => inner.downcast_ref::<E>(),
            _ => None,
        }
    }

    /// Take the task's own error out, if this is a `Failed`.
    pub fn into_inner(self) -> Option<BoxError> {
        match self {
            TaskError::Failed(inner) => Some(inner),
            _ => None,
        }
    }
}

/// Invalid queue configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({reason})")]
    InvalidValue {
        key: &'static str,
        value: String,
        reason: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Error)]
    #[error("disk on fire")]
    struct DiskError;

    #[test]
    fn failed_keeps_the_original_error() {
        let err = TaskError::Failed(Box::new(DiskError));
        assert!(err.is_failed());
        assert_eq!(err.to_string(), "task failed: disk on fire");
        assert!(err.downcast_ref::<DiskError>().is_some());
        assert!(err.source().is_some());
    }

    #[test]
    fn non_failures_have_no_inner_error() {
        assert!(TaskError::Cancelled.downcast_ref::<DiskError>().is_none());
        assert!(TaskError::Panicked("boom".into()).into_inner().is_none());
        assert!(TaskError::Cancelled.is_cancelled());
    }
}
