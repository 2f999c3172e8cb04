//! Task identifiers.
//!
//! # ULID ベースの TaskId
//! `TaskId` はログや `TaskHandle::id()` で task を追跡するためだけに使います。
//! キュー内の順序付けには使いません。それは [`Sequence`] の役目で、
//! キューのロック内で払い出されます。

use serde::{Deserialize, Serialize};
use std::fmt;
use ulid::Ulid;

/// 投入された task 1 つの識別子
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct TaskId(Ulid);

impl TaskId {
    /// 現在時刻から新しい ID を生成
    pub fn generate() -> Self {
        Self(Ulid::new())
    }

    pub fn from_ulid(ulid: Ulid) -> Self {
        Self(ulid)
    }

    pub fn as_ulid(&self) -> Ulid {
        self.0
    }
}

impl From<Ulid> for TaskId {
    fn from(ulid: Ulid) -> Self {
        Self::from_ulid(ulid)
    }
}

impl fmt::Display for TaskId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// キュー内での投入順
///
/// キューごとに狭義単調増加。同じ priority の順序付け（FIFO）にだけ使う。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Sequence(u64);

impl Sequence {
    pub const FIRST: Sequence = Sequence(0);

    pub fn new(value: u64) -> Self {
        Self(value)
    }

    pub fn value(self) -> u64 {
        self.0
    }

    /// 次の sequence
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for Sequence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_ids_are_unique() {
        let id1 = TaskId::generate();
        let id2 = TaskId::generate();
        assert_ne!(id1, id2);
    }

    #[test]
    fn task_id_display_has_prefix() {
        let id = TaskId::generate();
        assert!(id.to_string().starts_with("task-"));
        assert_eq!(id.to_string(), format!("task-{}", id.as_ulid()));
    }

    #[test]
    fn sequence_increases() {
        let first = Sequence::FIRST;
        let second = first.next();
        assert!(second > first);
        assert_eq!(second.value(), 1);
        assert_eq!(second.to_string(), "#1");
    }
}
