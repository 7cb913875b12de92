//! Typing coordinator with debounced emission and auto-expiring state.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use chatsync_core::config::realtime::RealtimeConfig;
use chatsync_core::result::SyncResult;
use chatsync_core::types::id::{ChatId, UserId};

use crate::events::ServerEvent;
use crate::membership::router::MembershipRouter;

/// Ephemeral typing state for one (chat, user) pair.
#[derive(Debug)]
struct TypingEntry {
    /// Generation of the signal that created this entry. A stale expiry task
    /// whose generation no longer matches must not clear the state.
    generation: u64,
    /// Scheduled expiry task; aborted on refresh, explicit stop, or send.
    expiry: JoinHandle<()>,
}

/// Shared typing state table, cloned into expiry tasks.
type StateTable = Arc<DashMap<(ChatId, UserId), TypingEntry>>;

/// Coordinates typing indicators across chats.
///
/// `typing` is emitted only on the not-typing → typing transition; refreshes
/// reschedule the expiry silently, so continuous input does not storm the
/// chat. Expiry, explicit stop, and message send each clear the state and
/// emit `stop-typing` exactly once.
pub struct TypingCoordinator {
    /// Router for authorization and fan-out targets.
    router: Arc<MembershipRouter>,
    /// Inactivity window after which typing auto-expires.
    window: Duration,
    /// (chat, user) → live typing state.
    states: StateTable,
    /// Monotonic generation source for expiry-task validity checks.
    generations: AtomicU64,
}

impl std::fmt::Debug for TypingCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypingCoordinator")
            .field("window", &self.window)
            .field("active", &self.states.len())
            .finish()
    }
}

impl TypingCoordinator {
    /// Creates a new coordinator.
    pub fn new(config: &RealtimeConfig, router: Arc<MembershipRouter>) -> Self {
        Self {
            router,
            window: Duration::from_millis(config.typing_window_ms),
            states: Arc::new(DashMap::new()),
            generations: AtomicU64::new(0),
        }
    }

    /// Records a typing signal, refreshing the inactivity window.
    ///
    /// Emits `typing` to other members' sessions only when the pair
    /// transitions from not-typing to typing.
    pub async fn signal_typing(&self, chat_id: ChatId, user_id: UserId) -> SyncResult<()> {
        self.router.authorize(chat_id, user_id).await?;

        let generation = self.generations.fetch_add(1, Ordering::Relaxed) + 1;
        let entry = TypingEntry {
            generation,
            expiry: self.spawn_expiry(chat_id, user_id, generation),
        };

        let started = match self.states.entry((chat_id, user_id)) {
            dashmap::mapref::entry::Entry::Occupied(mut occupied) => {
                occupied.get().expiry.abort();
                occupied.insert(entry);
                false
            }
            dashmap::mapref::entry::Entry::Vacant(vacant) => {
                vacant.insert(entry);
                true
            }
        };

        if started {
            debug!(chat_id = %chat_id, user_id = %user_id, "Typing started");
            emit(&self.router, chat_id, user_id, true).await;
        }
        Ok(())
    }

    /// Clears typing state on an explicit stop signal.
    ///
    /// Emits `stop-typing` immediately if the user was typing; a stop with no
    /// live state is a no-op.
    pub async fn signal_stop_typing(&self, chat_id: ChatId, user_id: UserId) -> SyncResult<()> {
        self.router.authorize(chat_id, user_id).await?;
        self.clear(chat_id, user_id).await;
        Ok(())
    }

    /// Clears typing state without an authorization check, used by the
    /// delivery pipeline when a message send implies the user stopped typing.
    pub async fn clear(&self, chat_id: ChatId, user_id: UserId) {
        if let Some((_, entry)) = self.states.remove(&(chat_id, user_id)) {
            entry.expiry.abort();
            debug!(chat_id = %chat_id, user_id = %user_id, "Typing cleared");
            emit(&self.router, chat_id, user_id, false).await;
        }
    }

    /// Checks whether a user currently counts as typing in a chat.
    pub fn is_typing(&self, chat_id: ChatId, user_id: UserId) -> bool {
        self.states.contains_key(&(chat_id, user_id))
    }

    /// Aborts every scheduled expiry without emitting; used at shutdown.
    pub fn abort_all(&self) {
        self.states.retain(|_, entry| {
            entry.expiry.abort();
            false
        });
    }

    /// Schedules the autonomous expiry for one signal generation. A refresh
    /// replaces the entry with a newer generation, so a stale task finds no
    /// match and emits nothing.
    fn spawn_expiry(&self, chat_id: ChatId, user_id: UserId, generation: u64) -> JoinHandle<()> {
        let states = Arc::clone(&self.states);
        let router = Arc::clone(&self.router);
        let window = self.window;
        tokio::spawn(async move {
            tokio::time::sleep(window).await;
            let removed = states.remove_if(&(chat_id, user_id), |_, entry| {
                entry.generation == generation
            });
            if removed.is_some() {
                debug!(chat_id = %chat_id, user_id = %user_id, "Typing expired");
                emit(&router, chat_id, user_id, false).await;
            }
        })
    }
}

/// Emits `typing` or `stop-typing` to other members' sessions.
async fn emit(router: &MembershipRouter, chat_id: ChatId, user_id: UserId, typing: bool) {
    let handles = match router.resolve_sessions_excluding(chat_id, user_id).await {
        Ok(handles) => handles,
        Err(e) => {
            warn!(chat_id = %chat_id, error = %e, "Typing fan-out skipped");
            return;
        }
    };

    let event = if typing {
        ServerEvent::Typing { chat_id, user_id }
    } else {
        ServerEvent::StopTyping { chat_id, user_id }
    };
    for handle in handles {
        handle.send(event.clone());
    }
}
