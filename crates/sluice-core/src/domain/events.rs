//! Events - dispatcher が EventSink に流す構造化レコード
//!
//! 制御フローには影響しない。cycle の成否以外（どのメッセージが失敗したか）は
//! ここでしか観測できない。

use serde::Serialize;

use super::ids::{FunctionId, MessageId, QueueId};
use super::outcome::FailureStage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Error,
    Critical,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum DispatchEvent {
    MessageProcessed {
        queue: QueueId,
        function: FunctionId,
        message_id: MessageId,
        payload: String,
    },
    MessageFailed {
        queue: QueueId,
        function: FunctionId,
        message_id: MessageId,
        payload: String,
        stage: FailureStage,
        error: String,
    },
    /// A pipeline task ended without producing an outcome (it panicked).
    PipelineAborted {
        queue: QueueId,
        function: FunctionId,
        error: String,
    },
    CycleCompleted {
        queue: QueueId,
        function: FunctionId,
        received: usize,
        succeeded: usize,
        failed: usize,
    },
    CycleAborted {
        queue: Option<QueueId>,
        function: Option<FunctionId>,
        error: String,
    },
}

impl DispatchEvent {
    pub fn severity(&self) -> Severity {
        match self {
            Self::MessageProcessed { .. } | Self::CycleCompleted { .. } => Severity::Info,
            Self::MessageFailed { .. } | Self::PipelineAborted { .. } => Severity::Error,
            Self::CycleAborted { .. } => Severity::Critical,
        }
    }

    /// Short human-readable line; the structured fields carry the rest.
    pub fn summary(&self) -> String {
        match self {
            Self::MessageProcessed { message_id, .. } => format!("{message_id} processed."),
            Self::MessageFailed {
                message_id, error, ..
            } => format!("{message_id} couldn't be processed. {error}"),
            Self::PipelineAborted { error, .. } => format!("message pipeline aborted: {error}"),
            Self::CycleCompleted { received, .. } => format!("Processed {received} messages"),
            Self::CycleAborted { queue, error, .. } => match queue {
                Some(queue) => format!("dispatch cycle failed for queue {queue}: {error}"),
                None => format!("dispatch cycle failed: {error}"),
            },
        }
    }
}
