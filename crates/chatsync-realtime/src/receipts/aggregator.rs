//! Read receipt aggregator: idempotent marking and aggregated broadcast.

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use tracing::{debug, warn};

use chatsync_core::result::SyncResult;
use chatsync_core::traits::storage::ChatStore;
use chatsync_core::types::id::{ChatId, MessageId, UserId};
use chatsync_core::types::receipt::ReadMarker;

use crate::events::ServerEvent;
use crate::membership::router::MembershipRouter;
use crate::metrics::EngineMetrics;

/// Records per-message read markers and broadcasts aggregated receipt state.
///
/// Marking is idempotent: repeated calls with overlapping message ids never
/// error and never double-count, and only calls that record something new
/// produce a broadcast.
pub struct ReadReceiptAggregator {
    /// Storage collaborator for durable markers.
    store: Arc<dyn ChatStore>,
    /// Router for authorization and fan-out targets.
    router: Arc<MembershipRouter>,
    /// Metrics collector.
    metrics: Arc<EngineMetrics>,
    /// Message ID → markers in recording order.
    readers: DashMap<MessageId, Vec<ReadMarker>>,
}

impl std::fmt::Debug for ReadReceiptAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ReadReceiptAggregator")
            .field("tracked_messages", &self.readers.len())
            .finish()
    }
}

impl ReadReceiptAggregator {
    /// Creates a new aggregator.
    pub fn new(
        store: Arc<dyn ChatStore>,
        router: Arc<MembershipRouter>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            store,
            router,
            metrics,
            readers: DashMap::new(),
        }
    }

    /// Records that `reader_id` has read the given messages of one chat.
    ///
    /// Returns the ids newly recorded by this call; ids the reader already
    /// marked are silently skipped. One aggregated `messages-read` event is
    /// broadcast per call with a non-empty result, to all sessions of all
    /// other chat members. Fails with `NotAMember` for non-participants; a
    /// storage failure mid-call surfaces to the caller and suppresses the
    /// broadcast (a retry skips the ids that were already recorded).
    pub async fn mark_read(
        &self,
        chat_id: ChatId,
        reader_id: UserId,
        message_ids: &[MessageId],
    ) -> SyncResult<Vec<MessageId>> {
        self.router.authorize(chat_id, reader_id).await?;

        let read_at = Utc::now();
        let mut newly = Vec::new();

        for &message_id in message_ids {
            if newly.contains(&message_id) {
                continue;
            }
            if self.has_marker(message_id, reader_id) {
                continue;
            }

            self.store
                .persist_read_marker(message_id, reader_id, read_at)
                .await?;

            // Re-check under the entry lock: a concurrent call from another
            // of the reader's devices may have recorded the pair first.
            let mut entry = self.readers.entry(message_id).or_default();
            if entry.iter().any(|marker| marker.reader_id == reader_id) {
                continue;
            }
            entry.push(ReadMarker {
                message_id,
                reader_id,
                read_at,
            });
            drop(entry);
            newly.push(message_id);
        }

        if newly.is_empty() {
            debug!(chat_id = %chat_id, reader_id = %reader_id, "Mark-read recorded nothing new");
            return Ok(newly);
        }

        self.metrics.read_markers(newly.len() as u64);

        match self
            .router
            .resolve_sessions_excluding(chat_id, reader_id)
            .await
        {
            Ok(handles) => {
                let event = ServerEvent::MessagesRead {
                    message_ids: newly.clone(),
                    reader_id,
                };
                let mut sent = 0u64;
                for handle in handles {
                    if handle.send(event.clone()) {
                        sent += 1;
                    }
                }
                self.metrics.events_emitted(sent);
                debug!(
                    chat_id = %chat_id,
                    reader_id = %reader_id,
                    count = newly.len(),
                    "Read receipts broadcast"
                );
            }
            Err(e) => {
                warn!(chat_id = %chat_id, error = %e, "Receipt fan-out skipped");
            }
        }

        Ok(newly)
    }

    /// Returns who has read a message, ordered by read time.
    pub fn readers_of(&self, message_id: MessageId) -> Vec<ReadMarker> {
        let mut markers = self
            .readers
            .get(&message_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default();
        markers.sort_by_key(|marker| marker.read_at);
        markers
    }

    /// Returns how many distinct readers have marked a message.
    pub fn reader_count(&self, message_id: MessageId) -> usize {
        self.readers
            .get(&message_id)
            .map(|entry| entry.value().len())
            .unwrap_or(0)
    }

    fn has_marker(&self, message_id: MessageId, reader_id: UserId) -> bool {
        self.readers
            .get(&message_id)
            .map(|entry| entry.iter().any(|marker| marker.reader_id == reader_id))
            .unwrap_or(false)
    }
}
