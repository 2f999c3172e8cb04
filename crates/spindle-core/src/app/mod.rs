//! App - キューのアプリケーション層
//!
//! # 主要コンポーネント
//! - **AsyncQueue**: 公開 API。共有状態を所有する
//! - **QueueBuilder**: 構築と起動時検証（Fail-fast）
//! - **admission**: どの pending entry を開始できるか判定
//! - **supervisor**: admit された entry を実行し、handle を確定
//! - **idle**: idle callback の管理と呼び出し
//! - **status**: シリアライズ可能なスナップショット

pub mod builder;
pub mod queue;
pub mod status;

mod admission;
mod idle;
mod state;
mod supervisor;

pub use self::builder::{BuildError, QueueBuilder};
pub use self::queue::AsyncQueue;
pub use self::status::QueueStatus;
