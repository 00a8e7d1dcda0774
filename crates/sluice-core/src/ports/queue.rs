//! MessageQueue port - キューサービス（SQS など）の抽象化
//!
//! dispatcher が依存するのは receive と delete の 2 つだけ。
//! キューの作成やメッセージの投入はこの port の責務ではない。

use async_trait::async_trait;

use crate::domain::{Message, QueueError, QueueId, ReceiptToken};

/// MessageQueue はメッセージを lease し、処理済みのものを削除する
///
/// # 設計原則
/// - receive で返したメッセージは visibility timeout の間 in-flight になる
/// - delete には同じ receive で発行された receipt が必要
/// - 複数タスクから同時に呼ばれても安全であること（`Send + Sync`）
#[async_trait]
pub trait MessageQueue: Send + Sync {
    /// Lease up to the implementation's batch size of visible messages.
    ///
    /// An empty vec is a normal result, not an error.
    async fn receive(&self, queue: &QueueId) -> Result<Vec<Message>, QueueError>;

    /// Delete the message leased under `receipt`.
    async fn delete(&self, queue: &QueueId, receipt: &ReceiptToken) -> Result<(), QueueError>;
}
