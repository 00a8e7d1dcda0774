//! Errors - エラー型と分類
//!
//! - **Fatal**: cycle 全体が失敗する（receive の失敗）。呼び出し元に返す。
//! - **Recoverable**: メッセージ単位の失敗。pipeline 内でログに出して吸収する。

use thiserror::Error;

use super::ids::{FunctionId, QueueId};
use super::outcome::FailureStage;

/// ErrorKind は実行エラーの運用分類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Fatal,
    Recoverable,
}

/// Failure reported by a queue service.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum QueueError {
    #[error("queue not found: {0}")]
    QueueNotFound(QueueId),

    /// The receipt was never issued, belongs to an expired lease, or the
    /// message is already gone.
    #[error("receipt is not valid for any in-flight message on queue {queue}")]
    InvalidReceipt { queue: QueueId },

    #[error("queue service unavailable: {0}")]
    Unavailable(String),

    #[error("queue misconfigured: {0}")]
    Misconfigured(String),
}

/// The invoke call could not be completed.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum InvokeError {
    #[error("function not found: {0}")]
    FunctionNotFound(FunctionId),

    #[error("invocation timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("transport failure: {0}")]
    Transport(String),

    #[error("invoker misconfigured: {0}")]
    Configuration(String),
}

/// Message-level failure. Always absorbed inside the pipeline.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ProcessingError {
    #[error("invocation failed: {0}")]
    Transport(#[source] InvokeError),

    #[error("function returned status {status_code}")]
    Status { status_code: u16 },

    #[error("function reported an error: {error}")]
    Function { error: String },

    #[error("delete failed after successful invocation: {0}")]
    Delete(#[source] QueueError),
}

impl ProcessingError {
    pub fn stage(&self) -> FailureStage {
        match self {
            Self::Transport(_) => FailureStage::Invoke,
            Self::Status { .. } | Self::Function { .. } => FailureStage::Evaluate,
            Self::Delete(_) => FailureStage::Delete,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Recoverable
    }
}

/// Cycle-level failure. The only error that leaves `Dispatcher::run_cycle`.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("receive failed for queue {queue} (function {function})")]
    Receive {
        queue: QueueId,
        function: FunctionId,
        #[source]
        source: QueueError,
    },

    #[error("poll event could not be decoded: {0}")]
    InvalidEvent(#[source] serde_json::Error),
}

impl DispatchError {
    pub fn kind(&self) -> ErrorKind {
        ErrorKind::Fatal
    }
}
