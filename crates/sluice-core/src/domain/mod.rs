//! Domain model (IDs, targets, messages, outcomes, errors, events).

pub mod errors;
pub mod events;
pub mod ids;
pub mod message;
pub mod outcome;
pub mod target;

pub use self::errors::{DispatchError, ErrorKind, InvokeError, ProcessingError, QueueError};
pub use self::events::{DispatchEvent, Severity};
pub use self::ids::{FunctionId, Id, IdMarker, MessageId, QueueId, ReceiptToken};
pub use self::message::Message;
pub use self::outcome::{
    FailureStage, InvocationOutcome, InvokeResponse, MessageOutcome, STATUS_OK,
};
pub use self::target::{DispatchTarget, TargetError};
