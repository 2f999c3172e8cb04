//! Task trait - キューが実行できるものの定義
//!
//! # 学習ポイント
//! - Associated Types (`type Output`)
//! - `FnOnce() -> impl Future` への blanket impl
//! - 値で受け取る receiver と `async_trait`

use std::future::Future;

use async_trait::async_trait;

use crate::error::BoxError;

/// 引数なしの非同期処理の単位
///
/// # 使用例
/// ```ignore
/// struct FetchReport { url: String }
///
/// #[async_trait]
/// impl Task for FetchReport {
///     type Output = Vec<u8>;
///
///     async fn run(self) -> Result<Vec<u8>, BoxError> {
///         download(&self.url).await.map_err(Into::into)
///     }
/// }
/// ```
///
/// # Trait Bounds
/// - `Send`: multi-thread runtime で spawn するため
/// - `'static`: 呼び出し元より長く生きる task に格納するため
///
/// 多くの場合この trait 名を書く必要はない。
/// `FnOnce() -> impl Future<Output = Result<T, E>>` はすべて `Task` になる。
#[async_trait]
pub trait Task: Send + 'static {
    type Output: Send + 'static;

    /// task を最後まで実行する。呼ばれるのは高々 1 回
    async fn run(self) -> Result<Self::Output, BoxError>;
}

#[async_trait]
impl<F, Fut, T, E> Task for F
where
    F: FnOnce() -> Fut + Send + 'static,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
    T: Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    type Output = T;

    async fn run(self) -> Result<T, BoxError> {
        let func = self;
        func().await.map_err(Into::into)
    }
}

/// 同期クロージャを tokio の blocking pool で動かすアダプタ
///
/// クロージャ内の panic は task 側で再送出されるので、
/// キューはそれを `TaskError::Panicked` として報告する。
pub struct Blocking<F> {
    func: F,
}

impl<F> Blocking<F> {
    pub fn new(func: F) -> Self {
        Self { func }
    }
}

#[async_trait]
impl<F, R, E> Task for Blocking<F>
where
    F: FnOnce() -> Result<R, E> + Send + 'static,
    R: Send + 'static,
    E: Into<BoxError> + Send + 'static,
{
    type Output = R;

    async fn run(self) -> Result<R, BoxError> {
        match tokio::task::spawn_blocking(self.func).await {
            Ok(result) => result.map_err(Into::into),
            Err(join_error) if join_error.is_panic() => {
                std::panic::resume_unwind(join_error.into_panic())
            }
            Err(join_error) => Err(join_error.into()),
        }
    }
}
