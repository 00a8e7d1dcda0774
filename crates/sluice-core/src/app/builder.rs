//! DispatcherBuilder - Dispatcher の構築とワイヤリング
//!
//! # Fail-fast 設計
//! - queue / invoker が未設定なら build() で BuildError
//! - DispatchConfig は build() 時に validate()
//! - event_sink は省略可能（TracingEventSink にフォールバック）

use std::sync::Arc;

use crate::config::{ConfigError, DispatchConfig};
use crate::impls::TracingEventSink;
use crate::ports::{EventSink, FunctionInvoker, MessageQueue};

use super::dispatcher::Dispatcher;

/// DispatcherBuilder は Dispatcher を構築
///
/// # 使用例
/// ```ignore
/// let dispatcher = Dispatcher::builder()
///     .queue(Arc::new(InMemoryQueue::default()))
///     .invoker(Arc::new(LocalInvoker::new()))
///     .build()?;
/// ```
#[derive(Default)]
pub struct DispatcherBuilder {
    queue: Option<Arc<dyn MessageQueue>>,
    invoker: Option<Arc<dyn FunctionInvoker>>,
    event_sink: Option<Arc<dyn EventSink>>,
    config: DispatchConfig,
}

/// BuildError は Dispatcher 構築時のエラー
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("no message queue configured")]
    MissingQueue,

    #[error("no function invoker configured")]
    MissingInvoker,

    #[error(transparent)]
    InvalidConfig(#[from] ConfigError),
}

impl DispatcherBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn queue(mut self, queue: Arc<dyn MessageQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn invoker(mut self, invoker: Arc<dyn FunctionInvoker>) -> Self {
        self.invoker = Some(invoker);
        self
    }

    pub fn event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.event_sink = Some(sink);
        self
    }

    pub fn config(mut self, config: DispatchConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<Dispatcher, BuildError> {
        let queue = self.queue.ok_or(BuildError::MissingQueue)?;
        let invoker = self.invoker.ok_or(BuildError::MissingInvoker)?;
        self.config.validate()?;

        let events = self
            .event_sink
            .unwrap_or_else(|| Arc::new(TracingEventSink::new()));
        Ok(Dispatcher::new(queue, invoker, events, self.config))
    }
}
