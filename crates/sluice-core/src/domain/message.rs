//! Message - one leased queue message.

use std::borrow::Cow;

use super::ids::{MessageId, ReceiptToken};

/// A message returned by one receive call.
///
/// The receipt belongs to the lease created by that receive call, so a
/// `Message` is handed to exactly one pipeline by value and never shared.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub id: MessageId,
    pub body: Vec<u8>,
    pub receipt: ReceiptToken,
}

impl Message {
    pub fn new(id: MessageId, body: impl Into<Vec<u8>>, receipt: ReceiptToken) -> Self {
        Self {
            id,
            body: body.into(),
            receipt,
        }
    }

    /// Body as text for log records. Invalid UTF-8 is replaced, not rejected.
    pub fn body_lossy(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.body)
    }
}
