//! App - アプリケーション層
//!
//! ports を組み合わせて dispatch cycle を実装する。
//!
//! # 主要コンポーネント
//! - **DispatcherBuilder**: 構築とワイヤリング（fail-fast 検証）
//! - **Dispatcher**: receive → 全メッセージ処理 → サマリ
//! - **MessagePipeline**: 1 メッセージの invoke → evaluate → delete

pub mod builder;
pub mod dispatcher;
pub mod pipeline;

#[cfg(test)]
pub(crate) mod fakes;

pub use self::builder::{BuildError, DispatcherBuilder};
pub use self::dispatcher::Dispatcher;
pub use self::pipeline::MessagePipeline;
