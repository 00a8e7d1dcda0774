//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **InMemoryQueue**: SQS 風の lease を持つ開発用キュー
//! - **LocalInvoker**: プロセス内の関数レジストリ
//! - **HttpInvoker**: Lambda 互換 invoke API の HTTP クライアント
//! - **TracingEventSink** / **MemoryEventSink**: ログ出力

pub mod http_invoker;
pub mod local_invoker;
pub mod memory_queue;
pub mod memory_sink;
pub mod tracing_sink;

// 主要な型を再エクスポート
pub use self::http_invoker::{HttpInvoker, HttpInvokerConfig};
pub use self::local_invoker::{JsonEcho, LocalFunction, LocalInvoker, RegistryError};
pub use self::memory_queue::{InMemoryQueue, MemoryQueueConfig, QueueDepth};
pub use self::memory_sink::MemoryEventSink;
pub use self::tracing_sink::TracingEventSink;
