//! Membership router resolving chats to participants and live sessions.

use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache;
use tracing::debug;

use chatsync_core::config::realtime::RealtimeConfig;
use chatsync_core::error::SyncError;
use chatsync_core::result::SyncResult;
use chatsync_core::traits::storage::ChatStore;
use chatsync_core::types::id::{ChatId, SessionId, UserId};

use crate::session::handle::SessionHandle;
use crate::session::registry::ConnectionRegistry;

/// Resolves chat identifiers to participant sets and live sessions.
///
/// The single authorization chokepoint for the real-time path: every
/// chat-scoped action (message send, read-mark, typing) calls
/// [`authorize`](Self::authorize) before touching any state.
///
/// Membership is read-mostly and cached per chat; membership mutation
/// happens outside this core and is signalled via
/// [`invalidate`](Self::invalidate).
pub struct MembershipRouter {
    /// Storage collaborator for membership lookups.
    store: Arc<dyn ChatStore>,
    /// Registry used to resolve users to live sessions.
    registry: Arc<ConnectionRegistry>,
    /// Chat ID → cached participant set.
    members: Cache<ChatId, Arc<Vec<UserId>>>,
}

impl std::fmt::Debug for MembershipRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MembershipRouter")
            .field("cached_chats", &self.members.entry_count())
            .finish()
    }
}

impl MembershipRouter {
    /// Creates a new router.
    pub fn new(
        config: &RealtimeConfig,
        store: Arc<dyn ChatStore>,
        registry: Arc<ConnectionRegistry>,
    ) -> Self {
        let members = Cache::builder()
            .max_capacity(config.membership_cache_capacity)
            .time_to_live(Duration::from_secs(config.membership_cache_ttl_seconds))
            .build();

        Self {
            store,
            registry,
            members,
        }
    }

    /// Returns the participant user identities of a chat, from cache or the
    /// store.
    pub async fn resolve_targets(&self, chat_id: ChatId) -> SyncResult<Arc<Vec<UserId>>> {
        self.members
            .try_get_with(chat_id, async {
                self.store.find_chat_members(chat_id).await.map(Arc::new)
            })
            .await
            .map_err(|e: Arc<SyncError>| (*e).clone())
    }

    /// Checks whether a user participates in a chat.
    pub async fn is_member(&self, chat_id: ChatId, user_id: UserId) -> SyncResult<bool> {
        Ok(self.resolve_targets(chat_id).await?.contains(&user_id))
    }

    /// Guards a chat-scoped action: fails with `NotAMember` unless the user
    /// participates in the chat.
    pub async fn authorize(&self, chat_id: ChatId, user_id: UserId) -> SyncResult<()> {
        if self.is_member(chat_id, user_id).await? {
            Ok(())
        } else {
            Err(SyncError::not_a_member(format!(
                "User {user_id} is not a member of chat {chat_id}"
            )))
        }
    }

    /// Resolves all currently connected sessions of all chat participants.
    pub async fn resolve_sessions(&self, chat_id: ChatId) -> SyncResult<Vec<Arc<SessionHandle>>> {
        let members = self.resolve_targets(chat_id).await?;
        Ok(members
            .iter()
            .flat_map(|user_id| self.registry.sessions_for(*user_id))
            .collect())
    }

    /// Resolves connected sessions of all participants except one user.
    pub async fn resolve_sessions_excluding(
        &self,
        chat_id: ChatId,
        excluded: UserId,
    ) -> SyncResult<Vec<Arc<SessionHandle>>> {
        let members = self.resolve_targets(chat_id).await?;
        Ok(members
            .iter()
            .filter(|user_id| **user_id != excluded)
            .flat_map(|user_id| self.registry.sessions_for(*user_id))
            .collect())
    }

    /// Resolves session IDs only, for callers that need targets without
    /// handles.
    pub async fn resolve_session_ids(&self, chat_id: ChatId) -> SyncResult<Vec<SessionId>> {
        Ok(self
            .resolve_sessions(chat_id)
            .await?
            .iter()
            .map(|handle| handle.session_id)
            .collect())
    }

    /// Reverse lookup: the chats a user participates in. Uncached; presence
    /// flips are rare compared to membership reads.
    pub async fn chats_for(&self, user_id: UserId) -> SyncResult<Vec<ChatId>> {
        self.store.find_user_chats(user_id).await
    }

    /// Drops the cached membership of a chat after an external membership
    /// change.
    pub async fn invalidate(&self, chat_id: ChatId) {
        self.members.invalidate(&chat_id).await;
        debug!(chat_id = %chat_id, "Membership cache invalidated");
    }
}
