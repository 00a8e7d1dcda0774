//! Outcome model: what one invocation returned and what the pipeline did
//! with the message.
//!
//! The pipeline never unwinds. Every message ends as a `MessageOutcome`
//! value, and the cycle only counts them.

use serde::{Deserialize, Serialize};

use super::errors::{InvokeError, ProcessingError};
use super::ids::MessageId;

/// HTTP-style status the function service uses for a completed synchronous call.
pub const STATUS_OK: u16 = 200;

/// Raw response of the invocable-function service.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeResponse {
    pub status_code: u16,
    pub function_error: Option<String>,
    pub payload: Vec<u8>,
}

impl InvokeResponse {
    pub fn ok(payload: impl Into<Vec<u8>>) -> Self {
        Self {
            status_code: STATUS_OK,
            function_error: None,
            payload: payload.into(),
        }
    }

    pub fn with_status(status_code: u16) -> Self {
        Self {
            status_code,
            function_error: None,
            payload: Vec::new(),
        }
    }

    pub fn function_error(error: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            status_code: STATUS_OK,
            function_error: Some(error.into()),
            payload: payload.into(),
        }
    }
}

/// Result of one downstream call, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvocationOutcome {
    /// The call could not be completed (network or service fault).
    TransportFailed(InvokeError),
    /// The call completed; the function may still have signalled failure.
    Completed(InvokeResponse),
}

impl From<Result<InvokeResponse, InvokeError>> for InvocationOutcome {
    fn from(result: Result<InvokeResponse, InvokeError>) -> Self {
        match result {
            Ok(response) => Self::Completed(response),
            Err(err) => Self::TransportFailed(err),
        }
    }
}

impl InvocationOutcome {
    pub fn transport_succeeded(&self) -> bool {
        matches!(self, Self::Completed(_))
    }

    /// Application-level failure of a completed call, if any.
    ///
    /// A non-OK status and a non-empty function error both count.
    pub fn application_error(&self) -> Option<String> {
        match self.classify() {
            Err(ProcessingError::Status { status_code }) => Some(format!("status {status_code}")),
            Err(ProcessingError::Function { error }) => Some(error),
            _ => None,
        }
    }

    /// Success iff transport succeeded and there is no application error.
    pub fn classify(&self) -> Result<(), ProcessingError> {
        match self {
            Self::TransportFailed(err) => Err(ProcessingError::Transport(err.clone())),
            Self::Completed(response) if response.status_code != STATUS_OK => {
                Err(ProcessingError::Status {
                    status_code: response.status_code,
                })
            }
            Self::Completed(response) => match response.function_error.as_deref() {
                Some(error) if !error.is_empty() => Err(ProcessingError::Function {
                    error: error.to_string(),
                }),
                _ => Ok(()),
            },
        }
    }
}

/// Pipeline step a message failed in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum FailureStage {
    Invoke,
    Evaluate,
    Delete,
}

/// Terminal result of one message pipeline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageOutcome {
    /// Invoked successfully and deleted from the queue.
    Processed { message_id: MessageId },
    /// Left on the queue (or, for `Delete`, left in flight) for redelivery.
    Failed {
        message_id: MessageId,
        error: ProcessingError,
    },
}

impl MessageOutcome {
    pub fn message_id(&self) -> &MessageId {
        match self {
            Self::Processed { message_id } | Self::Failed { message_id, .. } => message_id,
        }
    }

    pub fn is_processed(&self) -> bool {
        matches!(self, Self::Processed { .. })
    }

    pub fn stage(&self) -> Option<FailureStage> {
        match self {
            Self::Processed { .. } => None,
            Self::Failed { error, .. } => Some(error.stage()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[test]
    fn ok_response_is_success() {
        let outcome = InvocationOutcome::Completed(InvokeResponse::ok(b"{}".to_vec()));
        assert!(outcome.transport_succeeded());
        assert_eq!(outcome.application_error(), None);
        assert_eq!(outcome.classify(), Ok(()));
    }

    #[test]
    fn empty_function_error_counts_as_none() {
        let outcome = InvocationOutcome::Completed(InvokeResponse::function_error("", Vec::<u8>::new()));
        assert_eq!(outcome.classify(), Ok(()));
    }

    #[rstest]
    #[case::server_error(500)]
    #[case::accepted(202)]
    #[case::throttled(429)]
    fn non_ok_status_is_application_failure(#[case] status: u16) {
        let outcome = InvocationOutcome::Completed(InvokeResponse::with_status(status));
        assert!(outcome.transport_succeeded());
        assert_eq!(outcome.application_error(), Some(format!("status {status}")));
        assert_eq!(
            outcome.classify(),
            Err(ProcessingError::Status { status_code: status })
        );
    }

    #[test]
    fn function_error_is_application_failure() {
        let outcome = InvocationOutcome::Completed(InvokeResponse::function_error(
            "Unhandled",
            br#"{"errorMessage":"boom"}"#.to_vec(),
        ));
        assert_eq!(outcome.application_error().as_deref(), Some("Unhandled"));
        assert_eq!(outcome.classify().unwrap_err().stage(), FailureStage::Evaluate);
    }

    #[test]
    fn transport_failure_has_no_application_error() {
        let outcome: InvocationOutcome = Err(InvokeError::Transport("reset".into())).into();
        assert!(!outcome.transport_succeeded());
        assert_eq!(outcome.application_error(), None);
        assert_eq!(outcome.classify().unwrap_err().stage(), FailureStage::Invoke);
    }

    #[test]
    fn failure_stage_serializes_as_screaming_snake_case() {
        let s = serde_json::to_string(&FailureStage::Evaluate).unwrap();
        assert_eq!(s, "\"EVALUATE\"");
    }
}
