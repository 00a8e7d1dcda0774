//! IdGenerator port - ID 生成の抽象化
//!
//! InMemoryQueue が message id と receipt を採番するために使います。
//! テスト容易性のために、trait として抽象化しています。
//!
//! # 実装
//! - **UlidGenerator**: ULID ベース（本番用）

use ulid::Ulid;

use crate::domain::{MessageId, ReceiptToken};
use crate::ports::Clock;

/// IdGenerator は衝突しない ID を生成
///
/// # Thread Safety
/// - `Send + Sync` を要求（複数スレッドから使える）
pub trait IdGenerator: Send + Sync {
    /// Message ID を生成
    fn generate_message_id(&self) -> MessageId;

    /// lease ごとの receipt を生成
    fn generate_receipt(&self) -> ReceiptToken;
}

/// UlidGenerator は ULID ベースの ID 生成器
///
/// Clock を使って現在時刻ベースの ULID を生成します。
/// これにより、テスト時に FixedClock を使って timestamp 部分を固定できます。
pub struct UlidGenerator<C> {
    clock: C,
}

impl<C: Clock> UlidGenerator<C> {
    pub fn new(clock: C) -> Self {
        Self { clock }
    }

    fn next_ulid(&self) -> Ulid {
        let timestamp_ms = self.clock.now().timestamp_millis().max(0) as u64;
        Ulid::from_parts(timestamp_ms, rand::random())
    }
}

impl<C: Clock> IdGenerator for UlidGenerator<C> {
    fn generate_message_id(&self) -> MessageId {
        MessageId::from_ulid(self.next_ulid())
    }

    fn generate_receipt(&self) -> ReceiptToken {
        // receipt は message id と見分けがつくように prefix を付ける
        ReceiptToken::new(format!("rcpt-{}", self.next_ulid()))
    }
}
