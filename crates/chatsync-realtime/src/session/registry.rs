//! Connection registry tracking all live sessions indexed by user.

use std::sync::Arc;

use dashmap::DashMap;

use chatsync_core::error::SyncError;
use chatsync_core::result::SyncResult;
use chatsync_core::types::id::{SessionId, UserId};

use super::handle::SessionHandle;

/// Thread-safe registry of all live sessions.
///
/// A multimap, not a 1:1 mapping: one user can hold several concurrent
/// sessions (multi-device). The registry owns only connection state;
/// presence recomputation is triggered by the engine immediately after
/// register/unregister.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    /// User ID → list of session handles.
    by_user: DashMap<UserId, Vec<Arc<SessionHandle>>>,
    /// Session ID → session handle for direct lookup.
    by_id: DashMap<SessionId, Arc<SessionHandle>>,
}

impl ConnectionRegistry {
    /// Creates a new empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a session to the registry.
    ///
    /// Idempotent per session ID: registering an already-known session is a
    /// no-op returning `None`. Otherwise returns the user's session count
    /// after the add, computed under the user's entry lock so boundary
    /// transitions are observed exactly once even under concurrent
    /// registration.
    pub fn register(&self, handle: Arc<SessionHandle>) -> Option<usize> {
        match self.by_id.entry(handle.session_id) {
            dashmap::mapref::entry::Entry::Occupied(_) => None,
            dashmap::mapref::entry::Entry::Vacant(entry) => {
                entry.insert(handle.clone());
                let mut sessions = self.by_user.entry(handle.user_id).or_default();
                sessions.push(handle);
                Some(sessions.len())
            }
        }
    }

    /// Removes a session, returning its handle and the owner's remaining
    /// session count.
    ///
    /// Fails with `UnknownSession` if the session is not registered; callers
    /// treat that as already-cleaned-up, not fatal.
    pub fn unregister(&self, session_id: SessionId) -> SyncResult<(Arc<SessionHandle>, usize)> {
        let (_, handle) = self.by_id.remove(&session_id).ok_or_else(|| {
            SyncError::unknown_session(format!("Session not registered: {session_id}"))
        })?;

        let mut remaining = 0;
        if let Some(mut sessions) = self.by_user.get_mut(&handle.user_id) {
            sessions.retain(|s| s.session_id != session_id);
            remaining = sessions.len();
        }
        if remaining == 0 {
            // Re-checked under the entry lock: a concurrent register may
            // have repopulated the user's entry since the guard dropped.
            self.by_user
                .remove_if(&handle.user_id, |_, sessions| sessions.is_empty());
        }
        Ok((handle, remaining))
    }

    /// Gets a specific session by ID.
    pub fn get(&self, session_id: SessionId) -> Option<Arc<SessionHandle>> {
        self.by_id.get(&session_id).map(|entry| entry.value().clone())
    }

    /// Gets all current sessions for a user, possibly empty.
    pub fn sessions_for(&self, user_id: UserId) -> Vec<Arc<SessionHandle>> {
        self.by_user
            .get(&user_id)
            .map(|entry| entry.value().clone())
            .unwrap_or_default()
    }

    /// Returns the number of active sessions for a user.
    pub fn session_count(&self, user_id: UserId) -> usize {
        self.by_user
            .get(&user_id)
            .map(|entry| entry.value().len())
            .unwrap_or(0)
    }

    /// Checks if a user has at least one active session.
    pub fn is_user_connected(&self, user_id: UserId) -> bool {
        self.session_count(user_id) > 0
    }

    /// Returns total number of registered sessions.
    pub fn connection_count(&self) -> usize {
        self.by_id.len()
    }

    /// Returns number of distinct connected users.
    pub fn user_count(&self) -> usize {
        self.by_user.len()
    }

    /// Removes every session, returning the drained handles.
    pub fn drain(&self) -> Vec<Arc<SessionHandle>> {
        let all: Vec<Arc<SessionHandle>> = self
            .by_id
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        self.by_id.clear();
        self.by_user.clear();
        all
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::sync::mpsc;

    fn make_handle(user_id: UserId) -> Arc<SessionHandle> {
        let (tx, _rx) = mpsc::channel(8);
        Arc::new(SessionHandle::new(user_id, tx))
    }

    #[test]
    fn test_register_is_idempotent_per_session() {
        let registry = ConnectionRegistry::new();
        let handle = make_handle(UserId::new());

        assert_eq!(registry.register(handle.clone()), Some(1));
        assert_eq!(registry.register(handle.clone()), None);
        assert_eq!(registry.session_count(handle.user_id), 1);
    }

    #[test]
    fn test_multimap_supports_multi_device() {
        let registry = ConnectionRegistry::new();
        let user = UserId::new();
        let phone = make_handle(user);
        let laptop = make_handle(user);

        assert_eq!(registry.register(phone.clone()), Some(1));
        assert_eq!(registry.register(laptop.clone()), Some(2));

        assert_eq!(registry.session_count(user), 2);
        assert_eq!(registry.user_count(), 1);

        let (_, remaining) = registry.unregister(phone.session_id).expect("unregister");
        assert_eq!(remaining, 1);
        assert!(registry.is_user_connected(user));

        let (_, remaining) = registry.unregister(laptop.session_id).expect("unregister");
        assert_eq!(remaining, 0);
        assert!(!registry.is_user_connected(user));
        assert_eq!(registry.user_count(), 0);
    }

    #[test]
    fn test_unregister_unknown_session() {
        let registry = ConnectionRegistry::new();
        let err = registry.unregister(SessionId::new()).unwrap_err();
        assert_eq!(err.kind, chatsync_core::error::ErrorKind::UnknownSession);
    }
}
