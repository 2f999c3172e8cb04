//! Idle - 空かつ実行中 0 になった瞬間の callback

use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Arc;

use tracing::warn;

/// キューが空になるたびに呼ばれる observer
pub type IdleCallback = Arc<dyn Fn() + Send + Sync + 'static>;

/// 登録順に並んだ idle callback
///
/// 削除はできない。キューが生きている間ずっと登録されたまま。
#[derive(Default)]
pub(crate) struct IdleNotifier {
    callbacks: Vec<IdleCallback>,
}

impl IdleNotifier {
    pub(crate) fn register(&mut self, callback: IdleCallback) {
        self.callbacks.push(callback);
    }

    pub(crate) fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// idle になったなら呼ぶべき callback のスナップショットを返す
    ///
    /// pending か running が残っていれば `None`。呼び出しはロックを離してから。
    pub(crate) fn check(&self, pending: usize, running: usize) -> Option<Vec<IdleCallback>> {
        (pending == 0 && running == 0).then(|| self.callbacks.clone())
    }
}

/// 登録順に callback を呼ぶ。panic した callback はログに残して次へ進む
pub(crate) fn dispatch(callbacks: &[IdleCallback]) {
    for (index, callback) in callbacks.iter().enumerate() {
        if catch_unwind(AssertUnwindSafe(|| callback())).is_err() {
            warn!(callback = index, "idle callback panicked");
        }
    }
}
