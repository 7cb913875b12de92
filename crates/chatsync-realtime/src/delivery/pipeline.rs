//! Message delivery pipeline: validate, persist, fan out.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tokio::sync::Mutex;
use tracing::{debug, error, warn};

use chatsync_core::error::SyncError;
use chatsync_core::result::SyncResult;
use chatsync_core::traits::storage::ChatStore;
use chatsync_core::types::id::{ChatId, UserId};
use chatsync_core::types::message::{MessageEvent, NewMessage};

use crate::events::ServerEvent;
use crate::membership::router::MembershipRouter;
use crate::metrics::EngineMetrics;
use crate::typing::coordinator::TypingCoordinator;

/// Accepts outbound messages, persists them, and fans them out.
///
/// Submissions to the same chat serialize on a per-chat lock held across
/// persistence and fan-out, so the chat-scoped sequence values assigned by
/// the store and the order every session observes always agree. Submissions
/// to different chats proceed independently.
pub struct MessageDeliveryPipeline {
    /// Storage collaborator.
    store: Arc<dyn ChatStore>,
    /// Router for authorization and fan-out targets.
    router: Arc<MembershipRouter>,
    /// Typing coordinator, cleared on send.
    typing: Arc<TypingCoordinator>,
    /// Metrics collector.
    metrics: Arc<EngineMetrics>,
    /// Chat ID → submission lock.
    chat_locks: DashMap<ChatId, Arc<Mutex<()>>>,
}

impl std::fmt::Debug for MessageDeliveryPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MessageDeliveryPipeline").finish()
    }
}

impl MessageDeliveryPipeline {
    /// Creates a new pipeline.
    pub fn new(
        store: Arc<dyn ChatStore>,
        router: Arc<MembershipRouter>,
        typing: Arc<TypingCoordinator>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            store,
            router,
            typing,
            metrics,
            chat_locks: DashMap::new(),
        }
    }

    /// Accepts a message for delivery.
    ///
    /// Fails with `NotAMember` for non-participants, `InvalidContent` for
    /// empty or whitespace-only content, and `DeliveryFailed` when the store
    /// rejects persistence; nothing is broadcast unless durably recorded.
    /// On success the message has been persisted and enqueued to every
    /// connected member session, and sending cleared any typing state the
    /// sender held in the chat.
    pub async fn submit(
        &self,
        chat_id: ChatId,
        sender_id: UserId,
        content: &str,
    ) -> SyncResult<MessageEvent> {
        self.router.authorize(chat_id, sender_id).await?;

        let content = content.trim();
        if content.is_empty() {
            return Err(SyncError::invalid_content("Message content is empty"));
        }

        let lock = {
            let entry = self.chat_locks.entry(chat_id).or_default();
            Arc::clone(entry.value())
        };
        let _guard = lock.lock().await;

        let new_message = NewMessage {
            chat_id,
            sender_id,
            content: content.to_string(),
            created_at: Utc::now(),
        };
        let stored = self
            .store
            .persist_message(&new_message)
            .await
            .map_err(|e| {
                SyncError::delivery_failed(
                    format!("Failed to persist message for chat {chat_id}"),
                    e,
                )
            })?;

        // The message is durable; the chat-list pointer is best-effort.
        if let Err(e) = self.store.update_last_message(chat_id, stored.id).await {
            warn!(chat_id = %chat_id, error = %e, "Failed to update last-message pointer");
        }

        self.typing.clear(chat_id, sender_id).await;

        let event = MessageEvent {
            id: stored.id,
            chat_id,
            sender_id,
            content: new_message.content,
            sequence: stored.sequence,
            created_at: new_message.created_at,
        };

        match self.router.resolve_sessions(chat_id).await {
            Ok(handles) => {
                let mut sent = 0u64;
                for handle in &handles {
                    if handle.send(ServerEvent::NewMessage {
                        message: event.clone(),
                    }) {
                        sent += 1;
                    }
                }
                self.metrics.message_delivered(sent);
                debug!(
                    message_id = %event.id,
                    chat_id = %chat_id,
                    sequence = event.sequence,
                    fanout = sent,
                    "Message delivered"
                );
            }
            Err(e) => {
                // Already persisted; the skipped fan-out is reconciled by
                // the history query path on the next client sync.
                error!(chat_id = %chat_id, error = %e, "Fan-out resolution failed");
                self.metrics.message_delivered(0);
            }
        }

        Ok(event)
    }
}
