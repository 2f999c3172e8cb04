//! Queue module: pending task store and its entries.

pub(crate) mod entry;
mod pending;

pub(crate) use entry::{Completion, ErasedTask, TaskEntry};
pub(crate) use pending::PendingStore;
