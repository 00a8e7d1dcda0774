//! Ports - 抽象化レイヤー
//!
//! このモジュールは Hexagonal Architecture の「ポート」を定義します。
//! dispatcher はキューサービス・関数サービス・ログ出力にこの trait 経由でしか
//! 触れません。実装は `impls` にあります。

pub mod clock;
pub mod event_sink;
pub mod id_generator;
pub mod invoker;
pub mod queue;

// 主要な trait を再エクスポート
pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::event_sink::{EventSink, MulticastEventSink};
pub use self::id_generator::{IdGenerator, UlidGenerator};
pub use self::invoker::{FunctionInvoker, InvocationMode, InvokeRequest};
pub use self::queue::MessageQueue;
