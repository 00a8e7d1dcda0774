//! EventSink port - ログ出力の抽象化
//!
//! # 実装
//! - TracingEventSink: tracing に流す（デフォルト）
//! - MemoryEventSink: テストと CLI のサマリ用に保持する

use std::sync::Arc;

use crate::domain::DispatchEvent;

/// EventSink は dispatcher の構造化レコードを受け取る
///
/// 失敗を返さない。ログ出力が制御フローに影響してはいけないため。
pub trait EventSink: Send + Sync {
    fn emit(&self, event: &DispatchEvent);
}

impl<S: EventSink + ?Sized> EventSink for Arc<S> {
    fn emit(&self, event: &DispatchEvent) {
        (**self).emit(event)
    }
}

/// Fan-out to several sinks (e.g. tracing + an in-memory recorder).
pub struct MulticastEventSink {
    sinks: Vec<Arc<dyn EventSink>>,
}

impl MulticastEventSink {
    pub fn new(sinks: Vec<Arc<dyn EventSink>>) -> Self {
        Self { sinks }
    }
}

impl EventSink for MulticastEventSink {
    fn emit(&self, event: &DispatchEvent) {
        for sink in &self.sinks {
            sink.emit(event);
        }
    }
}
