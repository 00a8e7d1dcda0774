//! Domain identifiers (strongly-typed IDs).
//!
//! キュー・関数・メッセージの識別子はどれも外部サービスが発行する文字列ですが、
//! 取り違えるとメッセージを別のキューに ack してしまうので型で区別します。
//!
//! ## Phantom Type パターン
//! `Id<T>` で共通実装を提供し、`T` はマーカー型（PhantomData）として
//! コンパイル時の型安全性だけを提供します。
//!
//! ```ignore
//! let queue = QueueId::new("orders");
//! let function = FunctionId::new("process-order");
//! // let _: QueueId = function; // <- does not compile
//! ```

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;
use ulid::Ulid;

/// IdMarker は各 ID 型のマーカー trait
///
/// エラーメッセージやログで使うラベル（"queue", "function", "message"）を提供します。
pub trait IdMarker: Send + Sync + 'static {
    fn label() -> &'static str;
}

/// ジェネリック ID 型（中身は外部サービスの文字列そのまま）
#[repr(transparent)]
pub struct Id<T: IdMarker> {
    value: String,
    _marker: PhantomData<T>,
}

impl<T: IdMarker> Id<T> {
    pub fn new(value: impl Into<String>) -> Self {
        Self {
            value: value.into(),
            _marker: PhantomData,
        }
    }

    /// ULID から Id を作成（InMemoryQueue が message id を採番するときに使う）
    pub fn from_ulid(ulid: Ulid) -> Self {
        Self::new(ulid.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.value
    }

    pub fn is_empty(&self) -> bool {
        self.value.trim().is_empty()
    }

    pub fn label() -> &'static str {
        T::label()
    }
}

// derive だと `T: Clone` などの余計な境界が付くので手で実装する

impl<T: IdMarker> Clone for Id<T> {
    fn clone(&self) -> Self {
        Self::new(self.value.clone())
    }
}

impl<T: IdMarker> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.value == other.value
    }
}

impl<T: IdMarker> Eq for Id<T> {}

impl<T: IdMarker> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.value.hash(state);
    }
}

impl<T: IdMarker> fmt::Debug for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({:?})", T::label(), self.value)
    }
}

impl<T: IdMarker> fmt::Display for Id<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.value)
    }
}

impl<T: IdMarker> From<&str> for Id<T> {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> From<String> for Id<T> {
    fn from(value: String) -> Self {
        Self::new(value)
    }
}

impl<T: IdMarker> Serialize for Id<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.value)
    }
}

impl<'de, T: IdMarker> Deserialize<'de> for Id<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        String::deserialize(deserializer).map(Self::new)
    }
}

// ========================================
// マーカー型の定義
// ========================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum QueueKind {}

impl IdMarker for QueueKind {
    fn label() -> &'static str {
        "queue"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FunctionKind {}

impl IdMarker for FunctionKind {
    fn label() -> &'static str {
        "function"
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MessageKind {}

impl IdMarker for MessageKind {
    fn label() -> &'static str {
        "message"
    }
}

/// Identifier (name or URL) of a queue.
pub type QueueId = Id<QueueKind>;

/// Identifier (name or ARN) of an invocable function.
pub type FunctionId = Id<FunctionKind>;

/// Identifier the queue assigned to a message.
pub type MessageId = Id<MessageKind>;

/// ReceiptToken は 1 回の lease に紐づく削除用の資格情報
///
/// - receive のたびに新しいものが発行される
/// - 削除済み / lease 期限切れで無効になる
/// - 識別子ではないので `Id<T>` にはしない
#[derive(Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReceiptToken(String);

impl ReceiptToken {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for ReceiptToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ReceiptToken({:?})", self.0)
    }
}

impl fmt::Display for ReceiptToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
