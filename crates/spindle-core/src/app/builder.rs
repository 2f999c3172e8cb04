//! QueueBuilder - キューの構築とワイヤリング
//!
//! # 学習ポイント
//! - Builder パターン（`self` を消費する）
//! - 起動時検証（Fail-fast 設計）: 不正な設定は `build()` で失敗させ、後回しにしない

use tokio::runtime::{Handle, TryCurrentError};

use super::queue::AsyncQueue;
use crate::config::QueueConfig;
use crate::error::ConfigError;

/// BuildError はキュー構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("concurrency must be at least 1")]
    ZeroConcurrency,

    #[error("no tokio runtime to run tasks on; call build() inside a runtime or pass one with .runtime()")]
    NoRuntime(#[source] TryCurrentError),
}

/// QueueBuilder は [`AsyncQueue`] を構築
///
/// # 使用例
/// ```ignore
/// let queue = QueueBuilder::new()
///     .concurrency(4)
///     .auto_start(false)
///     .build()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct QueueBuilder {
    config: QueueConfig,
    runtime: Option<Handle>,
}

impl QueueBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// 既存の設定から開始
    pub fn from_config(config: QueueConfig) -> Self {
        Self {
            config,
            runtime: None,
        }
    }

    /// `SPINDLE_*` 環境変数から開始
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(Self::from_config(QueueConfig::from_env()?))
    }

    /// 同時実行数の上限（デフォルト 1）
    pub fn concurrency(mut self, concurrency: usize) -> Self {
        self.config.concurrency = concurrency;
        self
    }

    /// false なら paused 状態で構築（デフォルト true）
    pub fn auto_start(mut self, auto_start: bool) -> Self {
        self.config.auto_start = auto_start;
        self
    }

    /// task を spawn する runtime。省略時は `build()` を呼んだ runtime
    pub fn runtime(mut self, runtime: Handle) -> Self {
        self.runtime = Some(runtime);
        self
    }

    pub fn config(&self) -> &QueueConfig {
        &self.config
    }

    /// 設定を検証してキューを作成
    ///
    /// # Fail-fast 設計
    /// - `concurrency == 0` なら `BuildError::ZeroConcurrency`
    /// - runtime が見つからなければ `BuildError::NoRuntime`
    pub fn build(self) -> Result<AsyncQueue, BuildError> {
        if self.config.concurrency == 0 {
            return Err(BuildError::ZeroConcurrency);
        }
        let runtime = match self.runtime {
            Some(runtime) => runtime,
            None => Handle::try_current().map_err(BuildError::NoRuntime)?,
        };
        Ok(AsyncQueue::from_parts(
            self.config.concurrency,
            !self.config.auto_start,
            runtime,
        ))
    }
}
