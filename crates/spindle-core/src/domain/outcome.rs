//! Settlement of a task's result handle.

use serde::{Deserialize, Serialize};

use crate::error::TaskError;

/// Terminal state a result handle was settled with.
///
/// The handle itself carries the value or the error; the queue only keeps
/// this summary for its counters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Settlement {
    /// The task produced a value.
    Fulfilled,
    /// The task returned an error or panicked.
    Rejected,
}

impl Settlement {
    pub fn of<T>(result: &Result<T, TaskError>) -> Self {
        match result {
            Ok(_) => Settlement::Fulfilled,
            Err(_) => Settlement::Rejected,
        }
    }

    pub fn is_fulfilled(self) -> bool {
        matches!(self, Settlement::Fulfilled)
    }
}
