//! MemoryEventSink - emit されたレコードを保持する（テスト・CLI サマリ用）

use std::sync::Mutex;

use crate::domain::{DispatchEvent, Severity};
use crate::ports::EventSink;

#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<DispatchEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything emitted so far, in emission order.
    pub fn events(&self) -> Vec<DispatchEvent> {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn with_severity(&self, severity: Severity) -> Vec<DispatchEvent> {
        self.events()
            .into_iter()
            .filter(|e| e.severity() == severity)
            .collect()
    }

    pub fn clear(&self) {
        self.events.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: &DispatchEvent) {
        self.events
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(event.clone());
    }
}
