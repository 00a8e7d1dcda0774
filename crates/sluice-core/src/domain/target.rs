//! DispatchTarget - one queue-to-function binding.

use serde::{Deserialize, Serialize};

use super::ids::{FunctionId, QueueId};

/// Which queue to drain and which function receives the payloads.
///
/// Supplied once per cycle and never mutated. The serde aliases accept the
/// scheduled-event shape (`{"QueueUrl": ..., "FunctionName": ...}`) as well
/// as the snake_case field names used in config files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawTarget")]
pub struct DispatchTarget {
    queue: QueueId,
    function: FunctionId,
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TargetError {
    #[error("queue identifier must not be empty")]
    EmptyQueue,

    #[error("function identifier must not be empty")]
    EmptyFunction,
}

impl DispatchTarget {
    pub fn new(
        queue: impl Into<QueueId>,
        function: impl Into<FunctionId>,
    ) -> Result<Self, TargetError> {
        let queue = queue.into();
        let function = function.into();
        if queue.is_empty() {
            return Err(TargetError::EmptyQueue);
        }
        if function.is_empty() {
            return Err(TargetError::EmptyFunction);
        }
        Ok(Self { queue, function })
    }

    pub fn queue(&self) -> &QueueId {
        &self.queue
    }

    pub fn function(&self) -> &FunctionId {
        &self.function
    }
}

#[derive(Deserialize)]
struct RawTarget {
    #[serde(alias = "queue_url", alias = "QueueUrl")]
    queue: QueueId,
    #[serde(alias = "function_name", alias = "FunctionName")]
    function: FunctionId,
}

impl TryFrom<RawTarget> for DispatchTarget {
    type Error = TargetError;

    fn try_from(raw: RawTarget) -> Result<Self, Self::Error> {
        Self::new(raw.queue, raw.function)
    }
}
