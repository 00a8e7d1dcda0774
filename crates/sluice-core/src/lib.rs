//! sluice-core
//!
//! Drains a message queue into a function: receive a batch, invoke the
//! function synchronously once per message, and delete only the messages
//! whose invocation succeeded.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（ids, target, message, outcome, errors, events）
//! - **ports**: 抽象化レイヤー（MessageQueue, FunctionInvoker, EventSink, Clock, IdGenerator）
//! - **app**: アプリケーションロジック（builder, dispatcher, pipeline）
//! - **impls**: 実装（InMemoryQueue, LocalInvoker, HttpInvoker, event sinks）
//! - **config**: DispatchConfig

pub mod app;
pub mod config;
pub mod domain;
pub mod impls;
pub mod ports;

pub use app::{BuildError, Dispatcher, DispatcherBuilder};
pub use config::{ConfigError, DispatchConfig};
pub use domain::{DispatchError, DispatchTarget};
