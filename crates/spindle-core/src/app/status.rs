//! Status - キューの状態をシリアライズ可能な形で見せる

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::Priority;

/// ロック内で取ったキューのスナップショット
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueStatus {
    /// admit 待ちの entry 数
    pub pending: usize,
    /// 実行中の entry 数
    pub running: usize,
    pub concurrency: usize,
    pub paused: bool,
    /// 次に admit される entry の priority
    pub next_priority: Option<Priority>,
    pub succeeded: u64,
    pub failed: u64,
    /// `clear()` で破棄された entry 数
    pub cancelled: u64,
    /// 最後に idle 遷移した時刻
    pub last_idle_at: Option<DateTime<Utc>>,
}

impl QueueStatus {
    pub fn is_idle(&self) -> bool {
        self.pending == 0 && self.running == 0
    }

    /// 実行を終えた entry の合計
    pub fn settled(&self) -> u64 {
        self.succeeded + self.failed + self.cancelled
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serializes_counts() {
        let status = QueueStatus {
            pending: 2,
            running: 1,
            concurrency: 1,
            paused: false,
            next_priority: Some(Priority::new(5)),
            succeeded: 3,
            failed: 1,
            cancelled: 0,
            last_idle_at: None,
        };
        let value = serde_json::to_value(&status).unwrap();
        assert_eq!(value["pending"], 2);
        assert_eq!(value["next_priority"], 5);
        assert!(value["last_idle_at"].is_null());
        assert_eq!(status.settled(), 4);
        assert!(!status.is_idle());
    }
}
