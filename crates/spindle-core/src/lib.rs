//! spindle-core
//!
//! In-process asynchronous task queue.
//!
//! 同時実行数の上限、priority 順（同一 priority は FIFO）、pause/start、
//! idle 通知を備えたプロセス内タスクキュー。
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（TaskId, Sequence, Priority, Settlement）
//! - **queue**: 待機中タスクの格納（TaskEntry, PendingStore）
//! - **app**: キュー本体（AsyncQueue, QueueBuilder, QueueStatus）
//! - **typed**: `Task` trait と `Blocking` アダプタ
//! - **handle**: `TaskHandle`（submit 1 回につき 1 回だけ確定する結果）
//! - **retry**: `RetryPolicy`（task factory をリトライ付き task に包む）
//! - **config**: `QueueConfig`（serde + 環境変数）
//! - **error**: エラー型（TaskError, ConfigError）

pub mod app;
pub mod config;
pub mod domain;
pub mod error;
pub mod handle;
pub mod retry;
pub mod typed;

mod queue;

pub use app::{AsyncQueue, BuildError, QueueBuilder, QueueStatus};
pub use config::QueueConfig;
pub use domain::{Priority, Sequence, Settlement, TaskId};
pub use error::{BoxError, ConfigError, TaskError};
pub use handle::TaskHandle;
pub use retry::{Backoff, RetryPolicy, Retrying};
pub use typed::{Blocking, Task};
