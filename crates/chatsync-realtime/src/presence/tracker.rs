//! Presence tracker deriving online/offline state from registry transitions.

use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tracing::{debug, error, info, warn};

use chatsync_core::traits::storage::ChatStore;
use chatsync_core::types::id::{SessionId, UserId};
use chatsync_core::types::presence::PresenceSnapshot;

use crate::events::ServerEvent;
use crate::membership::router::MembershipRouter;
use crate::metrics::EngineMetrics;
use crate::session::registry::ConnectionRegistry;

/// Tracks per-user presence, debounced at the zero-session boundary.
///
/// Multi-device flapping produces no events: only the 0→1 and 1→0 session
/// transitions flip presence, persist the change, and broadcast
/// `presence-changed` to every chat the user participates in.
pub struct PresenceTracker {
    /// Registry holding the authoritative active-session sets.
    registry: Arc<ConnectionRegistry>,
    /// Router for reverse membership lookup and session resolution.
    router: Arc<MembershipRouter>,
    /// Storage collaborator for the persisted presence row.
    store: Arc<dyn ChatStore>,
    /// Metrics collector.
    metrics: Arc<EngineMetrics>,
    /// User ID → last-seen timestamp. Populated only while offline; the
    /// entry is removed the moment a session comes up.
    last_seen: DashMap<UserId, DateTime<Utc>>,
}

impl std::fmt::Debug for PresenceTracker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PresenceTracker")
            .field("offline_tracked", &self.last_seen.len())
            .finish()
    }
}

impl PresenceTracker {
    /// Creates a new presence tracker.
    pub fn new(
        registry: Arc<ConnectionRegistry>,
        router: Arc<MembershipRouter>,
        store: Arc<dyn ChatStore>,
        metrics: Arc<EngineMetrics>,
    ) -> Self {
        Self {
            registry,
            router,
            store,
            metrics,
            last_seen: DashMap::new(),
        }
    }

    /// Recomputes presence after a session was registered.
    ///
    /// `active_sessions` is the user's session count as observed by the
    /// registry mutation itself. Only the user's first active session flips
    /// presence to online; further sessions change nothing and emit nothing.
    pub async fn on_session_added(&self, user_id: UserId, active_sessions: usize) {
        if active_sessions != 1 {
            debug!(user_id = %user_id, "Additional session, presence unchanged");
            return;
        }

        self.last_seen.remove(&user_id);
        self.metrics.presence_transition();

        if let Err(e) = self.store.update_user_presence(user_id, true, None).await {
            error!(user_id = %user_id, error = %e, "Failed to persist online presence");
        }

        info!(user_id = %user_id, "User online");
        self.broadcast(user_id, true, None).await;
    }

    /// Recomputes presence after a session was unregistered.
    ///
    /// Only the removal of the user's last active session flips presence to
    /// offline; the last-seen timestamp is stamped exactly once, here.
    pub async fn on_session_removed(&self, user_id: UserId, active_sessions: usize) {
        if active_sessions != 0 {
            debug!(user_id = %user_id, "Sessions remain, presence unchanged");
            return;
        }

        let seen = Utc::now();
        self.last_seen.insert(user_id, seen);
        self.metrics.presence_transition();

        if let Err(e) = self
            .store
            .update_user_presence(user_id, false, Some(seen))
            .await
        {
            error!(user_id = %user_id, error = %e, "Failed to persist offline presence");
        }

        info!(user_id = %user_id, "User offline");
        self.broadcast(user_id, false, Some(seen)).await;
    }

    /// Checks whether a user has at least one active session.
    pub fn is_online(&self, user_id: UserId) -> bool {
        self.registry.is_user_connected(user_id)
    }

    /// Returns the user's last-seen timestamp, if offline.
    pub fn last_seen(&self, user_id: UserId) -> Option<DateTime<Utc>> {
        self.last_seen.get(&user_id).map(|entry| *entry.value())
    }

    /// Returns a point-in-time view of one user's presence.
    pub fn snapshot(&self, user_id: UserId) -> PresenceSnapshot {
        let online = self.is_online(user_id);
        PresenceSnapshot {
            user_id,
            online,
            last_seen: if online { None } else { self.last_seen(user_id) },
        }
    }

    /// Fans a presence-changed event out to the member sessions of every
    /// chat the user participates in, excluding the user's own sessions and
    /// deduplicated per session.
    async fn broadcast(&self, user_id: UserId, online: bool, last_seen: Option<DateTime<Utc>>) {
        let chats = match self.router.chats_for(user_id).await {
            Ok(chats) => chats,
            Err(e) => {
                warn!(user_id = %user_id, error = %e, "Presence fan-out skipped, reverse lookup failed");
                return;
            }
        };

        let event = ServerEvent::PresenceChanged {
            user_id,
            online,
            last_seen,
        };

        let mut notified: HashSet<SessionId> = HashSet::new();
        let mut sent = 0u64;
        for chat_id in chats {
            let handles = match self.router.resolve_sessions_excluding(chat_id, user_id).await {
                Ok(handles) => handles,
                Err(e) => {
                    warn!(chat_id = %chat_id, error = %e, "Presence fan-out skipped for chat");
                    continue;
                }
            };
            for handle in handles {
                if notified.insert(handle.session_id) && handle.send(event.clone()) {
                    sent += 1;
                }
            }
        }
        self.metrics.events_emitted(sent);
    }
}
