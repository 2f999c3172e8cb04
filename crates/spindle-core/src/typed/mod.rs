//! Typed - キューが実行する仕事の単位
//!
//! # 二層構造
//! - **表層（Typed）**: `Task` trait。future を返すクロージャは blanket impl で
//!   自動的に実装され、struct は直接実装できる
//! - **内部（Dyn）**: `queue::entry::ErasedTask` - object-safe, type erasure。
//!   出力型の違う task が 1 つの pending store に並べる

pub mod task;

pub use self::task::{Blocking, Task};
