//! In-memory chat store backed by dashmap.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::debug;

use chatsync_core::error::SyncError;
use chatsync_core::result::SyncResult;
use chatsync_core::traits::storage::ChatStore;
use chatsync_core::types::id::{ChatId, MessageId, UserId};
use chatsync_core::types::message::{NewMessage, StoredMessage};

/// One chat's row: membership, sequence counter, last-message pointer.
#[derive(Debug)]
struct ChatRow {
    /// Participant user identities.
    members: Vec<UserId>,
    /// Next sequence value to assign. Guarded by the dashmap shard lock, so
    /// assignment is atomic per chat.
    next_sequence: i64,
    /// Pointer to the most recent message, for chat-list queries.
    last_message: Option<MessageId>,
}

/// One persisted message.
#[derive(Debug, Clone)]
struct MessageRow {
    chat_id: ChatId,
    sequence: i64,
    created_at: DateTime<Utc>,
}

/// One user's persisted presence row.
#[derive(Debug, Clone, Copy)]
struct PresenceRow {
    online: bool,
    last_seen: Option<DateTime<Utc>>,
}

/// In-memory `ChatStore` implementation.
///
/// All tables are sharded concurrent maps; operations on different chats and
/// users proceed independently.
#[derive(Debug, Default)]
pub struct MemoryChatStore {
    /// Chat ID → chat row.
    chats: DashMap<ChatId, ChatRow>,
    /// Message ID → message row.
    messages: DashMap<MessageId, MessageRow>,
    /// (message, reader) → read timestamp. Insert-once set semantics.
    read_markers: DashMap<(MessageId, UserId), DateTime<Utc>>,
    /// User ID → presence row.
    presence: DashMap<UserId, PresenceRow>,
}

impl MemoryChatStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a chat with the given participants and returns its ID.
    ///
    /// Membership mutation belongs to chat-creation logic outside the
    /// synchronization core; this is the seeding entry point for hosts and
    /// tests.
    pub fn create_chat(&self, members: &[UserId]) -> ChatId {
        let chat_id = ChatId::new();
        self.chats.insert(
            chat_id,
            ChatRow {
                members: members.to_vec(),
                next_sequence: 1,
                last_message: None,
            },
        );
        chat_id
    }

    /// Adds a participant to an existing chat.
    ///
    /// Like [`create_chat`](Self::create_chat) this belongs to the external
    /// chat-management surface; the engine observes the change through a
    /// membership cache invalidation. Returns whether the chat exists.
    pub fn add_member(&self, chat_id: ChatId, user_id: UserId) -> bool {
        match self.chats.get_mut(&chat_id) {
            Some(mut row) => {
                if !row.members.contains(&user_id) {
                    row.members.push(user_id);
                }
                true
            }
            None => false,
        }
    }

    /// Returns the persisted last-message pointer for a chat.
    pub fn last_message(&self, chat_id: ChatId) -> Option<MessageId> {
        self.chats.get(&chat_id).and_then(|row| row.last_message)
    }

    /// Returns the persisted presence row for a user, if any.
    pub fn presence_of(&self, user_id: UserId) -> Option<(bool, Option<DateTime<Utc>>)> {
        self.presence
            .get(&user_id)
            .map(|row| (row.online, row.last_seen))
    }

    /// Returns the number of persisted messages across all chats.
    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    /// Returns the number of persisted read markers for a message.
    pub fn marker_count(&self, message_id: MessageId) -> usize {
        self.read_markers
            .iter()
            .filter(|entry| entry.key().0 == message_id)
            .count()
    }
}

#[async_trait]
impl ChatStore for MemoryChatStore {
    async fn find_chat_members(&self, chat_id: ChatId) -> SyncResult<Vec<UserId>> {
        Ok(self
            .chats
            .get(&chat_id)
            .map(|row| row.members.clone())
            .unwrap_or_default())
    }

    async fn find_user_chats(&self, user_id: UserId) -> SyncResult<Vec<ChatId>> {
        Ok(self
            .chats
            .iter()
            .filter(|entry| entry.value().members.contains(&user_id))
            .map(|entry| *entry.key())
            .collect())
    }

    async fn find_message_chat(&self, message_id: MessageId) -> SyncResult<Option<ChatId>> {
        Ok(self.messages.get(&message_id).map(|row| row.chat_id))
    }

    async fn persist_message(&self, message: &NewMessage) -> SyncResult<StoredMessage> {
        let mut chat = self
            .chats
            .get_mut(&message.chat_id)
            .ok_or_else(|| SyncError::storage(format!("Unknown chat: {}", message.chat_id)))?;

        let sequence = chat.next_sequence;
        chat.next_sequence += 1;

        let id = MessageId::new();
        self.messages.insert(
            id,
            MessageRow {
                chat_id: message.chat_id,
                sequence,
                created_at: message.created_at,
            },
        );
        chat.last_message = Some(id);

        debug!(message_id = %id, chat_id = %message.chat_id, sequence, "Message persisted");
        Ok(StoredMessage { id, sequence })
    }

    async fn persist_read_marker(
        &self,
        message_id: MessageId,
        reader_id: UserId,
        read_at: DateTime<Utc>,
    ) -> SyncResult<()> {
        self.read_markers
            .entry((message_id, reader_id))
            .or_insert(read_at);
        Ok(())
    }

    async fn update_last_message(&self, chat_id: ChatId, message_id: MessageId) -> SyncResult<()> {
        let mut chat = self
            .chats
            .get_mut(&chat_id)
            .ok_or_else(|| SyncError::storage(format!("Unknown chat: {chat_id}")))?;
        chat.last_message = Some(message_id);
        Ok(())
    }

    async fn update_user_presence(
        &self,
        user_id: UserId,
        online: bool,
        last_seen: Option<DateTime<Utc>>,
    ) -> SyncResult<()> {
        self.presence
            .insert(user_id, PresenceRow { online, last_seen });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn new_message(chat_id: ChatId, sender_id: UserId) -> NewMessage {
        NewMessage {
            chat_id,
            sender_id,
            content: "hello".to_string(),
            created_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_sequence_is_per_chat_and_monotonic() {
        let store = MemoryChatStore::new();
        let alice = UserId::new();
        let chat_a = store.create_chat(&[alice]);
        let chat_b = store.create_chat(&[alice]);

        let m1 = store.persist_message(&new_message(chat_a, alice)).await.unwrap();
        let m2 = store.persist_message(&new_message(chat_a, alice)).await.unwrap();
        let m3 = store.persist_message(&new_message(chat_b, alice)).await.unwrap();

        assert_eq!(m1.sequence, 1);
        assert_eq!(m2.sequence, 2);
        assert_eq!(m3.sequence, 1);
    }

    #[tokio::test]
    async fn test_persist_to_unknown_chat_fails() {
        let store = MemoryChatStore::new();
        let err = store
            .persist_message(&new_message(ChatId::new(), UserId::new()))
            .await
            .unwrap_err();
        assert_eq!(err.kind, chatsync_core::error::ErrorKind::Storage);
    }

    #[tokio::test]
    async fn test_read_marker_is_insert_once() {
        let store = MemoryChatStore::new();
        let message_id = MessageId::new();
        let reader = UserId::new();
        let first = Utc::now();

        store
            .persist_read_marker(message_id, reader, first)
            .await
            .unwrap();
        store
            .persist_read_marker(message_id, reader, first + chrono::Duration::seconds(5))
            .await
            .unwrap();

        assert_eq!(store.marker_count(message_id), 1);
        assert_eq!(store.read_markers.get(&(message_id, reader)).map(|v| *v), Some(first));
    }

    #[tokio::test]
    async fn test_add_member_is_idempotent() {
        let store = MemoryChatStore::new();
        let alice = UserId::new();
        let bob = UserId::new();
        let chat = store.create_chat(&[alice]);

        assert!(store.add_member(chat, bob));
        assert!(store.add_member(chat, bob));
        assert_eq!(store.find_chat_members(chat).await.unwrap(), vec![alice, bob]);
        assert!(!store.add_member(ChatId::new(), bob));
    }

    #[tokio::test]
    async fn test_reverse_membership_lookup() {
        let store = MemoryChatStore::new();
        let alice = UserId::new();
        let bob = UserId::new();
        let shared = store.create_chat(&[alice, bob]);
        let solo = store.create_chat(&[bob]);

        let chats = store.find_user_chats(bob).await.unwrap();
        assert_eq!(chats.len(), 2);
        assert!(chats.contains(&shared) && chats.contains(&solo));
        assert_eq!(store.find_user_chats(alice).await.unwrap(), vec![shared]);
    }

    #[tokio::test]
    async fn test_message_chat_resolution() {
        let store = MemoryChatStore::new();
        let alice = UserId::new();
        let chat = store.create_chat(&[alice]);
        let stored = store.persist_message(&new_message(chat, alice)).await.unwrap();

        assert_eq!(store.find_message_chat(stored.id).await.unwrap(), Some(chat));
        assert_eq!(store.find_message_chat(MessageId::new()).await.unwrap(), None);
        assert_eq!(store.last_message(chat), Some(stored.id));
    }

    #[tokio::test]
    async fn test_presence_row_roundtrip() {
        let store = MemoryChatStore::new();
        let user = UserId::new();
        store.update_user_presence(user, true, None).await.unwrap();
        assert_eq!(store.presence_of(user), Some((true, None)));

        let seen = Utc::now();
        store
            .update_user_presence(user, false, Some(seen))
            .await
            .unwrap();
        assert_eq!(store.presence_of(user), Some((false, Some(seen))));
    }
}
