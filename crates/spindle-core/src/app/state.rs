//! QueueState - キューの単一 Mutex が守る可変状態

use chrono::{DateTime, Utc};

use super::idle::IdleNotifier;
use super::status::QueueStatus;
use crate::domain::{Sequence, Settlement};
use crate::queue::PendingStore;

/// admission・確定・idle 判定が読み書きするすべて
///
/// 不変条件: `running <= concurrency`
pub(crate) struct QueueState {
    pub(crate) pending: PendingStore,
    pub(crate) running: usize,
    pub(crate) concurrency: usize,
    pub(crate) paused: bool,
    pub(crate) idle: IdleNotifier,
    pub(crate) last_idle_at: Option<DateTime<Utc>>,
    succeeded: u64,
    failed: u64,
    cancelled: u64,
    next_sequence: Sequence,
}

impl QueueState {
    pub(crate) fn new(concurrency: usize, paused: bool) -> Self {
        Self {
            pending: PendingStore::new(),
            running: 0,
            concurrency,
            paused,
            idle: IdleNotifier::default(),
            last_idle_at: None,
            succeeded: 0,
            failed: 0,
            cancelled: 0,
            next_sequence: Sequence::FIRST,
        }
    }

    /// 次の投入 sequence を払い出す
    pub(crate) fn next_sequence(&mut self) -> Sequence {
        let sequence = self.next_sequence;
        self.next_sequence = sequence.next();
        sequence
    }

    pub(crate) fn is_idle(&self) -> bool {
        self.pending.is_empty() && self.running == 0
    }

    /// 終了した entry の slot を解放
    pub(crate) fn record_settled(&mut self, settlement: Settlement) {
        self.running = self.running.saturating_sub(1);
        match settlement {
            Settlement::Fulfilled => self.succeeded += 1,
            Settlement::Rejected => self.failed += 1,
        }
    }

    pub(crate) fn record_cancelled(&mut self, count: usize) {
        self.cancelled += count as u64;
    }

    pub(crate) fn snapshot(&self) -> QueueStatus {
        QueueStatus {
            pending: self.pending.len(),
            running: self.running,
            concurrency: self.concurrency,
            paused: self.paused,
            next_priority: self.pending.peek_priority(),
            succeeded: self.succeeded,
            failed: self.failed,
            cancelled: self.cancelled,
            last_idle_at: self.last_idle_at,
        }
    }
}
