//! Inbound event dispatch.
//!
//! One explicit table keyed by event kind, so every inbound action is a
//! function of (current state, event) and can be unit-tested without a live
//! transport.

use std::collections::HashMap;

use tracing::debug;

use chatsync_core::error::SyncError;
use chatsync_core::result::SyncResult;
use chatsync_core::types::id::{ChatId, MessageId, SessionId, UserId};

use crate::engine::SyncEngine;
use crate::events::{ClientEvent, ServerEvent};

impl SyncEngine {
    /// Dispatches one inbound client event.
    ///
    /// The acting user is resolved from the originating session. Failures
    /// are returned to the caller and additionally pushed to the originating
    /// session as an `error` event; no failure escapes the scope of the
    /// single requesting action.
    pub async fn handle_event(&self, session_id: SessionId, event: ClientEvent) -> SyncResult<()> {
        let handle = self.registry.get(session_id).ok_or_else(|| {
            SyncError::unknown_session(format!("Event from unregistered session {session_id}"))
        })?;
        let user_id = handle.user_id;

        let result = match event {
            ClientEvent::SendMessage { chat_id, content } => self
                .delivery
                .submit(chat_id, user_id, &content)
                .await
                .map(|_| ()),
            ClientEvent::Typing { chat_id } => self.typing.signal_typing(chat_id, user_id).await,
            ClientEvent::StopTyping { chat_id } => {
                self.typing.signal_stop_typing(chat_id, user_id).await
            }
            ClientEvent::MarkAsRead { message_ids } => {
                self.mark_read(user_id, &message_ids).await
            }
        };

        if let Err(err) = &result {
            handle.send(ServerEvent::Error {
                code: err.kind.to_string(),
                message: err.message.clone(),
            });
        }
        result
    }

    /// Groups bare message ids by owning chat and marks each group read.
    ///
    /// The wire event carries only message ids; ids the store no longer
    /// knows are skipped so a stale client cannot fail the whole batch.
    async fn mark_read(&self, reader_id: UserId, message_ids: &[MessageId]) -> SyncResult<()> {
        let mut by_chat: HashMap<ChatId, Vec<MessageId>> = HashMap::new();
        for &message_id in message_ids {
            match self.store.find_message_chat(message_id).await? {
                Some(chat_id) => by_chat.entry(chat_id).or_default().push(message_id),
                None => {
                    debug!(message_id = %message_id, "Skipping mark-read for unknown message");
                }
            }
        }

        for (chat_id, ids) in by_chat {
            self.receipts.mark_read(chat_id, reader_id, &ids).await?;
        }
        Ok(())
    }
}
