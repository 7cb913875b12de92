//! Storage collaborator interface.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::result::SyncResult;
use crate::types::id::{ChatId, MessageId, UserId};
use crate::types::message::{NewMessage, StoredMessage};

/// Persistence collaborator for chats, messages, read markers, and presence.
///
/// The engine owns no durable state; everything that must survive the
/// process goes through this trait. Persistence calls are the only points
/// where a request-processing path waits on an external system.
#[async_trait]
pub trait ChatStore: Send + Sync {
    /// Returns the participant user identities of a chat. An empty result
    /// means the chat does not exist or has no members; either way no one is
    /// authorized to act on it.
    async fn find_chat_members(&self, chat_id: ChatId) -> SyncResult<Vec<UserId>>;

    /// Returns the chats a user participates in (reverse membership lookup).
    async fn find_user_chats(&self, user_id: UserId) -> SyncResult<Vec<ChatId>>;

    /// Resolves the chat a message belongs to, if the message is known.
    async fn find_message_chat(&self, message_id: MessageId) -> SyncResult<Option<ChatId>>;

    /// Durably records a message, assigning its identifier and the
    /// chat-scoped sequence value. Sequence assignment must be atomic per
    /// chat: two concurrent persists to the same chat never observe the same
    /// value.
    async fn persist_message(&self, message: &NewMessage) -> SyncResult<StoredMessage>;

    /// Durably records that `reader_id` has read `message_id`. Recording the
    /// same pair twice must be a no-op, not an error.
    async fn persist_read_marker(
        &self,
        message_id: MessageId,
        reader_id: UserId,
        read_at: DateTime<Utc>,
    ) -> SyncResult<()>;

    /// Updates the chat's last-message pointer used by chat-list queries.
    async fn update_last_message(&self, chat_id: ChatId, message_id: MessageId) -> SyncResult<()>;

    /// Updates the user's persisted presence row. `last_seen` is `None`
    /// while the user is online.
    async fn update_user_presence(
        &self,
        user_id: UserId,
        online: bool,
        last_seen: Option<DateTime<Utc>>,
    ) -> SyncResult<()>;
}
