//! InMemoryQueue - 開発用のキュー（SQS 風の lease セマンティクス）
//!
//! # 学習ポイント
//! - receive で visibility timeout 付きの lease を発行する
//! - receipt は lease ごとに作り直す（古い receipt では削除できない）
//! - 削除されなかったメッセージは timeout 後に再配送される（at-least-once）

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::config::ConfigError;
use crate::domain::{Message, MessageId, QueueError, QueueId, ReceiptToken};
use crate::ports::{Clock, IdGenerator, MessageQueue, SystemClock, UlidGenerator};

/// Upper bound on messages returned by one receive call.
pub const MAX_BATCH_SIZE: usize = 10;

/// Longest lease a receive may take out (12 hours, the SQS maximum).
pub const MAX_VISIBILITY_TIMEOUT_SECS: u64 = 43_200;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryQueueConfig {
    /// Messages returned per receive call (1..=10).
    pub batch_size: usize,
    /// How long a received message stays hidden from other receivers
    /// (1..=43200). The receipt is only valid for this long.
    pub visibility_timeout_secs: u64,
}

impl Default for MemoryQueueConfig {
    fn default() -> Self {
        Self {
            batch_size: MAX_BATCH_SIZE,
            visibility_timeout_secs: 30,
        }
    }
}

impl MemoryQueueConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=MAX_BATCH_SIZE).contains(&self.batch_size) {
            return Err(ConfigError::invalid(
                "queue.batch_size",
                format!("must be between 1 and {MAX_BATCH_SIZE}, got {}", self.batch_size),
            ));
        }
        // 0 would expire the receipt at the moment it is issued
        if !(1..=MAX_VISIBILITY_TIMEOUT_SECS).contains(&self.visibility_timeout_secs) {
            return Err(ConfigError::invalid(
                "queue.visibility_timeout_secs",
                format!(
                    "must be between 1 and {MAX_VISIBILITY_TIMEOUT_SECS}, got {}",
                    self.visibility_timeout_secs
                ),
            ));
        }
        Ok(())
    }

    fn lease_until(&self, now: DateTime<Utc>) -> Result<DateTime<Utc>, QueueError> {
        i64::try_from(self.visibility_timeout_secs)
            .ok()
            .and_then(chrono::Duration::try_seconds)
            .and_then(|timeout| now.checked_add_signed(timeout))
            .ok_or_else(|| {
                QueueError::Misconfigured(format!(
                    "visibility timeout of {}s is out of range",
                    self.visibility_timeout_secs
                ))
            })
    }
}

/// Number of messages in each state, for status output.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueueDepth {
    pub visible: usize,
    pub in_flight: usize,
}

#[derive(Debug, Clone)]
struct Lease {
    receipt: ReceiptToken,
    visible_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
struct StoredMessage {
    id: MessageId,
    body: Vec<u8>,
    receive_count: u32,
    lease: Option<Lease>,
}

impl StoredMessage {
    fn is_visible(&self, now: DateTime<Utc>) -> bool {
        self.lease.as_ref().is_none_or(|lease| lease.visible_at <= now)
    }

    fn is_leased_by(&self, receipt: &ReceiptToken, now: DateTime<Utc>) -> bool {
        self.lease
            .as_ref()
            .is_some_and(|lease| &lease.receipt == receipt && lease.visible_at > now)
    }
}

/// InMemoryQueue は開発用のキュー
///
/// # 実装詳細
/// - HashMap<QueueId, VecDeque<StoredMessage>> でキューごとに管理
/// - tokio の Mutex で排他制御（ロック中に await しない）
/// - 時刻は Clock port から取る（テストでは FixedClock）
///
/// # 使用例
/// ```ignore
/// let queue = InMemoryQueue::new(MemoryQueueConfig::default());
/// queue.create_queue(QueueId::new("orders")).await;
/// queue.send(&QueueId::new("orders"), b"{}".to_vec()).await?;
/// let batch = queue.receive(&QueueId::new("orders")).await?;
/// ```
pub struct InMemoryQueue {
    queues: Mutex<HashMap<QueueId, VecDeque<StoredMessage>>>,
    config: MemoryQueueConfig,
    clock: Arc<dyn Clock>,
    ids: Box<dyn IdGenerator>,
}

impl InMemoryQueue {
    pub fn new(config: MemoryQueueConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: MemoryQueueConfig, clock: Arc<dyn Clock>) -> Self {
        let ids = Box::new(UlidGenerator::new(clock.clone()));
        Self {
            queues: Mutex::new(HashMap::new()),
            config,
            clock,
            ids,
        }
    }

    pub fn config(&self) -> &MemoryQueueConfig {
        &self.config
    }

    /// Create an empty queue. Creating an existing queue is a no-op.
    pub async fn create_queue(&self, queue: QueueId) {
        self.queues.lock().await.entry(queue).or_default();
    }

    /// Append a message and return the id the queue assigned to it.
    pub async fn send(
        &self,
        queue: &QueueId,
        body: impl Into<Vec<u8>>,
    ) -> Result<MessageId, QueueError> {
        let mut queues = self.queues.lock().await;
        let messages = queues
            .get_mut(queue)
            .ok_or_else(|| QueueError::QueueNotFound(queue.clone()))?;

        let id = self.ids.generate_message_id();
        messages.push_back(StoredMessage {
            id: id.clone(),
            body: body.into(),
            receive_count: 0,
            lease: None,
        });
        Ok(id)
    }

    pub async fn depth(&self, queue: &QueueId) -> Result<QueueDepth, QueueError> {
        let now = self.clock.now();
        let queues = self.queues.lock().await;
        let messages = queues
            .get(queue)
            .ok_or_else(|| QueueError::QueueNotFound(queue.clone()))?;

        let visible = messages.iter().filter(|m| m.is_visible(now)).count();
        Ok(QueueDepth {
            visible,
            in_flight: messages.len() - visible,
        })
    }

    /// How many times a message has been handed out. `None` once deleted.
    pub async fn receive_count(&self, queue: &QueueId, id: &MessageId) -> Option<u32> {
        let queues = self.queues.lock().await;
        queues
            .get(queue)?
            .iter()
            .find(|m| &m.id == id)
            .map(|m| m.receive_count)
    }
}

impl Default for InMemoryQueue {
    fn default() -> Self {
        Self::new(MemoryQueueConfig::default())
    }
}

#[async_trait]
impl MessageQueue for InMemoryQueue {
    async fn receive(&self, queue: &QueueId) -> Result<Vec<Message>, QueueError> {
        let now = self.clock.now();
        let visible_at = self.config.lease_until(now)?;

        let mut queues = self.queues.lock().await;
        let messages = queues
            .get_mut(queue)
            .ok_or_else(|| QueueError::QueueNotFound(queue.clone()))?;

        let mut batch = Vec::new();
        for stored in messages.iter_mut() {
            if batch.len() >= self.config.batch_size {
                break;
            }
            if !stored.is_visible(now) {
                continue;
            }
            let receipt = self.ids.generate_receipt();
            stored.receive_count += 1;
            stored.lease = Some(Lease {
                receipt: receipt.clone(),
                visible_at,
            });
            batch.push(Message::new(stored.id.clone(), stored.body.clone(), receipt));
        }
        Ok(batch)
    }

    async fn delete(&self, queue: &QueueId, receipt: &ReceiptToken) -> Result<(), QueueError> {
        let now = self.clock.now();
        let mut queues = self.queues.lock().await;
        let messages = queues
            .get_mut(queue)
            .ok_or_else(|| QueueError::QueueNotFound(queue.clone()))?;

        let position = messages
            .iter()
            .position(|m| m.is_leased_by(receipt, now))
            .ok_or_else(|| QueueError::InvalidReceipt {
                queue: queue.clone(),
            })?;
        messages.remove(position);
        Ok(())
    }
}
