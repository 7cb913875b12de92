//! Message types exchanged between the delivery pipeline and the store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{ChatId, MessageId, UserId};

/// A message accepted by the delivery pipeline.
///
/// Immutable once the store confirms persistence. The `sequence` value is a
/// chat-scoped monotonically increasing integer assigned at persistence time
/// and establishes total order within the chat; `created_at` is the display
/// timestamp and carries no ordering guarantee.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MessageEvent {
    /// Durable message identifier assigned by the store.
    pub id: MessageId,
    /// Chat this message belongs to.
    pub chat_id: ChatId,
    /// User who sent the message.
    pub sender_id: UserId,
    /// Message body.
    pub content: String,
    /// Chat-scoped sequence value.
    pub sequence: i64,
    /// When the message was accepted.
    pub created_at: DateTime<Utc>,
}

/// Payload handed to the store for persistence, before an identifier and
/// sequence value exist.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewMessage {
    /// Chat this message belongs to.
    pub chat_id: ChatId,
    /// User who sent the message.
    pub sender_id: UserId,
    /// Message body, already validated and trimmed.
    pub content: String,
    /// When the message was accepted.
    pub created_at: DateTime<Utc>,
}

/// What the store returns from a successful persist: the durable identifier
/// and the chat-scoped sequence value.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct StoredMessage {
    /// Durable message identifier.
    pub id: MessageId,
    /// Chat-scoped sequence value.
    pub sequence: i64,
}
