//! Task priority.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Priority of a task. Higher values are admitted sooner.
///
/// `Priority::default()` is `0`, the priority `submit` uses.
#[repr(transparent)]
#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Priority(i32);

impl Priority {
    pub const NORMAL: Priority = Priority(0);

    pub fn new(value: i32) -> Self {
        Self(value)
    }

    pub fn value(self) -> i32 {
        self.0
    }
}

impl From<i32> for Priority {
    fn from(value: i32) -> Self {
        Self(value)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_normal() {
        assert_eq!(Priority::default(), Priority::NORMAL);
        assert_eq!(Priority::NORMAL.value(), 0);
    }

    #[test]
    fn higher_value_compares_greater() {
        assert!(Priority::from(10) > Priority::from(5));
        assert!(Priority::from(-1) < Priority::NORMAL);
    }

    #[test]
    fn serializes_as_plain_integer() {
        let json = serde_json::to_string(&Priority::new(7)).unwrap();
        assert_eq!(json, "7");
    }
}
