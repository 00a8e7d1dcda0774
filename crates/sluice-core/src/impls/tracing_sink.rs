//! TracingEventSink - dispatcher のレコードを tracing に流す（デフォルト）
//!
//! tracing には error より上のレベルがないので、Critical は
//! `severity = "critical"` フィールド付きの error として出す。

use tracing::{error, info};

use crate::domain::{DispatchEvent, Severity};
use crate::ports::EventSink;

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl TracingEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for TracingEventSink {
    fn emit(&self, event: &DispatchEvent) {
        let summary = event.summary();
        match event {
            DispatchEvent::MessageProcessed {
                queue,
                function,
                message_id,
                payload,
            } => {
                info!(
                    queue = %queue,
                    function = %function,
                    message_id = %message_id,
                    payload = %payload,
                    "{summary}"
                );
            }
            DispatchEvent::MessageFailed {
                queue,
                function,
                message_id,
                payload,
                stage,
                error,
            } => {
                error!(
                    queue = %queue,
                    function = %function,
                    message_id = %message_id,
                    payload = %payload,
                    stage = ?stage,
                    error = %error,
                    "{summary}"
                );
            }
            DispatchEvent::PipelineAborted {
                queue,
                function,
                error,
            } => {
                error!(queue = %queue, function = %function, error = %error, "{summary}");
            }
            DispatchEvent::CycleCompleted {
                queue,
                function,
                received,
                succeeded,
                failed,
            } => {
                info!(
                    queue = %queue,
                    function = %function,
                    received,
                    succeeded,
                    failed,
                    "{summary}"
                );
            }
            DispatchEvent::CycleAborted {
                queue,
                function,
                error,
            } => {
                debug_assert_eq!(event.severity(), Severity::Critical);
                error!(
                    severity = "critical",
                    queue = queue.as_ref().map(|q| q.as_str()),
                    function = function.as_ref().map(|f| f.as_str()),
                    error = %error,
                    "{summary}"
                );
            }
        }
    }
}
