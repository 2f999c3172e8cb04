//! Domain model (identifiers, priority, settlement).

pub mod ids;
pub mod outcome;
pub mod priority;

pub use ids::{Sequence, TaskId};
pub use outcome::Settlement;
pub use priority::Priority;
