//! AsyncQueue - 同時実行数の上限付き priority タスクキュー
//!
//! # 学習ポイント
//! - 状態はすべて 1 つの `Mutex` で守る。ユーザーコードはロック外で動く
//! - Admission は再帰呼び出しではなく反復ループ
//! - task ごとに oneshot channel を持つので、handle は必ず 1 回だけ確定する
//!
//! # ロックの扱い
//! どの操作も同じ形: ロックを取る → 状態を更新し、やること（spawn する
//! entry、呼ぶ callback）を集める → ロックを離す → それを実行する。
//! ロック保持中に `.await` することはない。

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use chrono::Utc;
use tokio::runtime::Handle;
use tokio::sync::{Notify, oneshot};
use tracing::{debug, info};

use super::admission;
use super::builder::QueueBuilder;
use super::idle::{self, IdleCallback};
use super::state::QueueState;
use super::status::QueueStatus;
use super::supervisor::{self, Packaged};
use crate::domain::{Priority, TaskId};
use crate::error::BoxError;
use crate::handle::TaskHandle;
use crate::queue::{Completion, TaskEntry};
use crate::typed::{Blocking, Task};

/// [`AsyncQueue`] の全 clone と実行中 task が共有する状態
pub(crate) struct Shared {
    state: Mutex<QueueState>,
    runtime: Handle,
    idle: Notify,
}

impl Shared {
    fn new(state: QueueState, runtime: Handle) -> Self {
        Self {
            state: Mutex::new(state),
            runtime,
            idle: Notify::new(),
        }
    }

    /// 状態をロックする。
    ///
    /// ロック中にユーザーコードは動かないので、poison されても中身は整合している。
    fn lock(&self) -> MutexGuard<'_, QueueState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn runtime(&self) -> &Handle {
        &self.runtime
    }

    /// admit 済み entry を supervisor に渡す
    fn launch(self: &Arc<Self>, admitted: Vec<TaskEntry>) {
        for entry in admitted {
            supervisor::execute(Arc::clone(self), entry);
        }
    }

    /// entry の実行終了時に supervisor から呼ばれる。
    ///
    /// # フロー
    /// 1. slot を解放し、次の entry を admit（ロック内）
    /// 2. admit した entry を起動、idle なら callback と `wait_idle` を起こす
    /// 3. 最後に result handle を確定する
    ///
    /// そのため handle を await した呼び出し側は常に更新後のカウントを見る。
    pub(crate) fn settle(self: &Arc<Self>, completion: Completion) {
        let (admitted, callbacks) = {
            let mut state = self.lock();
            state.record_settled(completion.settlement);
            let admitted = admission::admit_ready(&mut state);
            let callbacks = state.idle.check(state.pending.len(), state.running);
            if callbacks.is_some() {
                state.last_idle_at = Some(Utc::now());
            }
            (admitted, callbacks)
        };

        self.launch(admitted);

        if let Some(callbacks) = callbacks {
            debug!(callbacks = callbacks.len(), "queue is idle");
            idle::dispatch(&callbacks);
            self.idle.notify_waiters();
        }

        completion.deliver();
    }
}

/// プロセス内の非同期タスクキュー
///
/// - 同時に実行されるのは最大 `concurrency` 個
/// - pending は priority の高い順に開始（同じ priority なら FIFO）
/// - submit は必ず 1 回だけ確定する [`TaskHandle`] を返す
///
/// clone は安価で、clone 同士は同じキューを共有する。
///
/// # 使用例
/// ```ignore
/// let queue = AsyncQueue::builder().concurrency(2).build()?;
///
/// let handle = queue.submit(|| async { Ok::<_, std::io::Error>("done") });
/// assert_eq!(handle.await?, "done");
/// ```
///
/// # 制約
/// - aging はない。高 priority が流れ続けると低 priority は飢餓状態になり得る
/// - backpressure もない。深さが問題なら submit 前に
///   [`pending_count`](Self::pending_count) を確認する
#[derive(Clone)]
pub struct AsyncQueue {
    shared: Arc<Shared>,
}

impl AsyncQueue {
    pub fn builder() -> QueueBuilder {
        QueueBuilder::new()
    }

    pub(crate) fn from_parts(concurrency: usize, paused: bool, runtime: Handle) -> Self {
        let state = QueueState::new(concurrency, paused);
        Self {
            shared: Arc::new(Shared::new(state, runtime)),
        }
    }

    /// デフォルト priority で task を投入
    pub fn submit<T: Task>(&self, task: T) -> TaskHandle<T::Output> {
        self.submit_with_priority(task, Priority::NORMAL)
    }

    /// priority を指定して task を投入（大きいほど先に admit される）
    ///
    /// 実行中かつ空き slot があれば即座に開始し、なければ pending で待つ。
    pub fn submit_with_priority<T: Task>(
        &self,
        task: T,
        priority: impl Into<Priority>,
    ) -> TaskHandle<T::Output> {
        let priority = priority.into();
        let id = TaskId::generate();
        let (tx, rx) = oneshot::channel();
        let packaged = Box::new(Packaged::new(id, task, tx));

        let admitted = {
            let mut state = self.shared.lock();
            let sequence = state.next_sequence();
            state
                .pending
                .push(TaskEntry::new(id, priority, sequence, packaged));
            debug!(
                task_id = %id,
                %priority,
                %sequence,
                pending = state.pending.len(),
                running = state.running,
                "task submitted"
            );
            admission::admit_ready(&mut state)
        };

        self.shared.launch(admitted);
        TaskHandle::new(id, priority, rx)
    }

    /// 同期クロージャを tokio の blocking pool で実行する task として投入
    pub fn submit_blocking<F, R, E>(&self, func: F, priority: impl Into<Priority>) -> TaskHandle<R>
    where
        F: FnOnce() -> Result<R, E> + Send + 'static,
        R: Send + 'static,
        E: Into<BoxError> + Send + 'static,
    {
        self.submit_with_priority(Blocking::new(func), priority)
    }

    /// paused を解除し、入るだけ admit する
    pub fn start(&self) {
        let admitted = {
            let mut state = self.shared.lock();
            if state.paused {
                info!(pending = state.pending.len(), "queue started");
            }
            state.paused = false;
            admission::admit_ready(&mut state)
        };
        self.shared.launch(admitted);
    }

    /// 新規 admit を止める。実行中の task は中断しない
    pub fn pause(&self) {
        let mut state = self.shared.lock();
        if !state.paused {
            info!(
                pending = state.pending.len(),
                running = state.running,
                "queue paused"
            );
        }
        state.paused = true;
    }

    /// pending の task をすべて破棄し、破棄した数を返す
    ///
    /// - 破棄した handle は `TaskError::Cancelled` で確定する
    /// - 実行中の task には影響しない
    /// - 実行中が 0 なら [`wait_idle`](Self::wait_idle) の待機者を起こす
    /// - idle callback は呼ばない（実行を終えた task がないため）
    pub fn clear(&self) -> usize {
        let (discarded, now_idle) = {
            let mut state = self.shared.lock();
            let discarded = state.pending.drain();
            state.record_cancelled(discarded.len());
            (discarded, state.is_idle())
        };

        let count = discarded.len();
        for entry in discarded {
            entry.cancel();
        }
        info!(count, "pending tasks cleared");

        if now_idle && count > 0 {
            self.shared.idle.notify_waiters();
        }
        count
    }

    /// idle callback を登録する
    ///
    /// task の確定後にキューが idle（pending も running も 0）になるたびに呼ばれる。
    /// 登録の解除はできない。
    pub fn on_idle<F>(&self, callback: F)
    where
        F: Fn() + Send + Sync + 'static,
    {
        let callback: IdleCallback = Arc::new(callback);
        let mut state = self.shared.lock();
        state.idle.register(callback);
        debug!(callbacks = state.idle.len(), "idle callback registered");
    }

    /// キューが idle になるまで待つ
    ///
    /// - すでに idle なら即座に返る
    /// - それ以外は次の idle 遷移か、実行中 0 のキューを [`clear`](Self::clear)
    ///   が空にした時点で返る
    /// - pending を抱えた paused キューは自然には idle にならない
    pub async fn wait_idle(&self) {
        let notified = self.shared.idle.notified();
        tokio::pin!(notified);
        notified.as_mut().enable();

        if self.is_idle() {
            return;
        }
        notified.await;
    }

    /// admit 待ちの task 数
    pub fn pending_count(&self) -> usize {
        self.shared.lock().pending.len()
    }

    /// 実行中の task 数
    pub fn running_count(&self) -> usize {
        self.shared.lock().running
    }

    pub fn is_paused(&self) -> bool {
        self.shared.lock().paused
    }

    pub fn is_idle(&self) -> bool {
        self.shared.lock().is_idle()
    }

    pub fn concurrency(&self) -> usize {
        self.shared.lock().concurrency
    }

    pub fn status(&self) -> QueueStatus {
        self.shared.lock().snapshot()
    }
}

impl fmt::Debug for AsyncQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncQueue")
            .field("status", &self.status())
            .finish()
    }
}
