//! Scripted collaborators that record every call.

use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

use async_trait::async_trait;

use crate::domain::{
    InvokeError, InvokeResponse, Message, MessageId, QueueError, QueueId, ReceiptToken,
};
use crate::ports::{FunctionInvoker, InvokeRequest, MessageQueue};

pub fn message(id: &str, body: &str, receipt: &str) -> Message {
    Message::new(MessageId::new(id), body.as_bytes().to_vec(), ReceiptToken::new(receipt))
}

#[derive(Default)]
pub struct ScriptedQueue {
    batch: Mutex<Option<Result<Vec<Message>, QueueError>>>,
    failing_receipts: HashSet<String>,
    receive_calls: Mutex<Vec<QueueId>>,
    delete_calls: Mutex<Vec<(QueueId, ReceiptToken)>>,
}

impl ScriptedQueue {
    pub fn with_batch(messages: Vec<Message>) -> Self {
        Self {
            batch: Mutex::new(Some(Ok(messages))),
            ..Default::default()
        }
    }

    pub fn failing(error: QueueError) -> Self {
        Self {
            batch: Mutex::new(Some(Err(error))),
            ..Default::default()
        }
    }

    pub fn fail_delete_for(mut self, receipt: &str) -> Self {
        self.failing_receipts.insert(receipt.to_string());
        self
    }

    pub fn receive_calls(&self) -> Vec<QueueId> {
        self.receive_calls.lock().unwrap().clone()
    }

    pub fn delete_calls(&self) -> Vec<(QueueId, ReceiptToken)> {
        self.delete_calls.lock().unwrap().clone()
    }

    pub fn deleted_receipts(&self) -> Vec<String> {
        let mut receipts: Vec<String> = self
            .delete_calls()
            .into_iter()
            .map(|(_, r)| r.as_str().to_string())
            .collect();
        receipts.sort();
        receipts
    }
}

#[async_trait]
impl MessageQueue for ScriptedQueue {
    async fn receive(&self, queue: &QueueId) -> Result<Vec<Message>, QueueError> {
        self.receive_calls.lock().unwrap().push(queue.clone());
        // the first call gets the script, later calls see an empty queue
        self.batch.lock().unwrap().take().unwrap_or(Ok(Vec::new()))
    }

    async fn delete(&self, queue: &QueueId, receipt: &ReceiptToken) -> Result<(), QueueError> {
        self.delete_calls
            .lock()
            .unwrap()
            .push((queue.clone(), receipt.clone()));
        if self.failing_receipts.contains(receipt.as_str()) {
            return Err(QueueError::Unavailable("delete rejected".into()));
        }
        Ok(())
    }
}

/// Responds per payload; unscripted payloads get `200` with no error.
#[derive(Default)]
pub struct ScriptedInvoker {
    responses: HashMap<Vec<u8>, Result<InvokeResponse, InvokeError>>,
    panics_on: HashSet<Vec<u8>>,
    requests: Mutex<Vec<InvokeRequest>>,
}

impl ScriptedInvoker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(mut self, payload: &str, response: Result<InvokeResponse, InvokeError>) -> Self {
        self.responses.insert(payload.as_bytes().to_vec(), response);
        self
    }

    pub fn panic_on(mut self, payload: &str) -> Self {
        self.panics_on.insert(payload.as_bytes().to_vec());
        self
    }

    pub fn requests(&self) -> Vec<InvokeRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl FunctionInvoker for ScriptedInvoker {
    async fn invoke(&self, request: InvokeRequest) -> Result<InvokeResponse, InvokeError> {
        self.requests.lock().unwrap().push(request.clone());
        if self.panics_on.contains(&request.payload) {
            panic!("scripted panic");
        }
        self.responses
            .get(&request.payload)
            .cloned()
            .unwrap_or_else(|| Ok(InvokeResponse::ok(b"ok".to_vec())))
    }
}
