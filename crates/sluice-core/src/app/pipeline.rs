//! MessagePipeline - 1 メッセージを invoke → evaluate → delete まで処理する
//!
//! # フロー
//! 1. FunctionInvoker::invoke() に body をそのまま渡す（RequestResponse）
//! 2. InvocationOutcome を分類（transport / status / function error）
//! 3. 成功したときだけ MessageQueue::delete() で ack
//! 4. どのステップの失敗も MessageOutcome::Failed に変換してログに出す
//!
//! pipeline の外にはエラーを返さない。1 件の失敗で batch 全体が止まらないように。

use std::sync::Arc;

use tracing::{Instrument, info_span};

use crate::domain::{
    DispatchEvent, DispatchTarget, InvocationOutcome, Message, MessageOutcome, ProcessingError,
};
use crate::ports::{EventSink, FunctionInvoker, InvokeRequest, MessageQueue};

/// Cheap to clone: every field is shared, so one clone moves into each task.
#[derive(Clone)]
pub struct MessagePipeline {
    target: Arc<DispatchTarget>,
    queue: Arc<dyn MessageQueue>,
    invoker: Arc<dyn FunctionInvoker>,
    events: Arc<dyn EventSink>,
}

impl MessagePipeline {
    pub fn new(
        target: Arc<DispatchTarget>,
        queue: Arc<dyn MessageQueue>,
        invoker: Arc<dyn FunctionInvoker>,
        events: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            target,
            queue,
            invoker,
            events,
        }
    }

    /// Process one message to its terminal state.
    pub async fn process(&self, message: Message) -> MessageOutcome {
        let span = info_span!("message_pipeline", message_id = %message.id);

        async move {
            let outcome = match self.invoke_and_ack(&message).await {
                Ok(()) => MessageOutcome::Processed {
                    message_id: message.id.clone(),
                },
                Err(error) => MessageOutcome::Failed {
                    message_id: message.id.clone(),
                    error,
                },
            };
            self.report(&message, &outcome);
            outcome
        }
        .instrument(span)
        .await
    }

    async fn invoke_and_ack(&self, message: &Message) -> Result<(), ProcessingError> {
        let request =
            InvokeRequest::request_response(self.target.function().clone(), message.body.clone());
        let outcome = InvocationOutcome::from(self.invoker.invoke(request).await);
        outcome.classify()?;

        // the only place a message is ever deleted
        self.queue
            .delete(self.target.queue(), &message.receipt)
            .await
            .map_err(ProcessingError::Delete)
    }

    fn report(&self, message: &Message, outcome: &MessageOutcome) {
        let queue = self.target.queue().clone();
        let function = self.target.function().clone();
        let message_id = outcome.message_id().clone();
        let payload = message.body_lossy().into_owned();

        let event = match outcome {
            MessageOutcome::Processed { .. } => DispatchEvent::MessageProcessed {
                queue,
                function,
                message_id,
                payload,
            },
            MessageOutcome::Failed { error, .. } => DispatchEvent::MessageFailed {
                queue,
                function,
                message_id,
                payload,
                stage: error.stage(),
                error: error.to_string(),
            },
        };
        self.events.emit(&event);
    }
}
