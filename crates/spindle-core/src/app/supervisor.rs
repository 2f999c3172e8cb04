//! Supervisor - admit された entry を実行し、result handle を確定する
//!
//! # フロー
//! 1. `execute()` がキューの runtime に entry を spawn（ロックは解放済み）
//! 2. `Packaged::run()` が task を実行し、エラーと panic を捕捉
//! 3. `Shared::settle()` が slot を解放、次を admit、idle を判定
//! 4. 最後に handle を値かエラーで確定

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use futures::future::BoxFuture;
use tokio::sync::oneshot;
use tracing::{debug, warn};

use super::queue::Shared;
use crate::domain::{Settlement, TaskId};
use crate::error::TaskError;
use crate::queue::{Completion, ErasedTask, TaskEntry};
use crate::typed::Task;

/// 型付き task と result handle の送信側をまとめたもの
pub(crate) struct Packaged<T: Task> {
    id: TaskId,
    task: T,
    tx: oneshot::Sender<Result<T::Output, TaskError>>,
}

impl<T: Task> Packaged<T> {
    pub(crate) fn new(
        id: TaskId,
        task: T,
        tx: oneshot::Sender<Result<T::Output, TaskError>>,
    ) -> Self {
        Self { id, task, tx }
    }
}

impl<T: Task> ErasedTask for Packaged<T> {
    fn run(self: Box<Self>) -> BoxFuture<'static, Completion> {
        let Packaged { id, task, tx } = *self;
        async move {
            let result = match AssertUnwindSafe(async move { task.run().await })
                .catch_unwind()
                .await
            {
                Ok(Ok(value)) => Ok(value),
                Ok(Err(error)) => {
                    warn!(task_id = %id, error = %error, "task failed");
                    Err(TaskError::Failed(error))
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(task_id = %id, panic = %message, "task panicked");
                    Err(TaskError::Panicked(message))
                }
            };
            Completion::new(Settlement::of(&result), move || {
                // handle が drop 済みでも結果はカウント済み
                let _ = tx.send(result);
            })
        }
        .boxed()
    }

    fn cancel(self: Box<Self>) {
        let _ = self.tx.send(Err(TaskError::Cancelled));
    }
}

/// admit 済み entry を spawn する。キューのロックを持ったまま呼ばないこと
pub(crate) fn execute(shared: Arc<Shared>, entry: TaskEntry) {
    let TaskEntry {
        id, priority, task, ..
    } = entry;
    let runtime = shared.runtime().clone();
    runtime.spawn(async move {
        debug!(task_id = %id, %priority, "task started");
        let completion = task.run().await;
        debug!(task_id = %id, settlement = ?completion.settlement, "task settled");
        shared.settle(completion);
    });
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("upstream timed out")]
    struct UpstreamTimeout;

    type Receiver<T> = oneshot::Receiver<Result<<T as Task>::Output, TaskError>>;

    fn package<T: Task>(task: T) -> (Box<dyn ErasedTask>, Receiver<T>) {
        let (tx, rx) = oneshot::channel();
        (Box::new(Packaged::new(TaskId::generate(), task, tx)), rx)
    }

    #[tokio::test]
    async fn success_fulfills_handle() {
        let (erased, rx) = package(|| async { Ok::<_, UpstreamTimeout>("done") });
        let completion = erased.run().await;
        assert_eq!(completion.settlement, Settlement::Fulfilled);
        completion.deliver();
        assert_eq!(rx.await.unwrap().unwrap(), "done");
    }

    #[tokio::test]
    async fn error_rejects_handle_with_original_error() {
        let (erased, rx) = package(|| async { Err::<(), _>(UpstreamTimeout) });
        let completion = erased.run().await;
        assert_eq!(completion.settlement, Settlement::Rejected);
        completion.deliver();

        let err = rx.await.unwrap().unwrap_err();
        assert!(err.downcast_ref::<UpstreamTimeout>().is_some());
    }

    #[tokio::test]
    async fn panic_rejects_handle() {
        let (erased, rx) = package(|| async {
            if true {
                panic!("worker exploded");
            }
            Ok::<u8, UpstreamTimeout>(0)
        });
        let completion = erased.run().await;
        assert_eq!(completion.settlement, Settlement::Rejected);
        completion.deliver();

        match rx.await.unwrap() {
            Err(TaskError::Panicked(message)) => assert_eq!(message, "worker exploded"),
            other => panic!("expected panic, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn cancel_settles_without_running() {
        let (erased, rx) = package(|| async {
            if true {
                panic!("must not run");
            }
            Ok::<(), UpstreamTimeout>(())
        });
        erased.cancel();
        assert!(matches!(rx.await.unwrap(), Err(TaskError::Cancelled)));
    }

    #[tokio::test]
    async fn dropped_handle_still_settles() {
        let (erased, rx) = package(|| async { Ok::<_, UpstreamTimeout>(7) });
        drop(rx);
        let completion = erased.run().await;
        assert_eq!(completion.settlement, Settlement::Fulfilled);
        completion.deliver();
    }

    #[tokio::test]
    async fn handle_stays_pending_until_delivered() {
        let (erased, mut rx) = package(|| async { Ok::<_, UpstreamTimeout>(1) });
        let completion = erased.run().await;
        assert!(rx.try_recv().is_err());

        completion.deliver();
        assert_eq!(rx.await.unwrap().unwrap(), 1);
    }
}
