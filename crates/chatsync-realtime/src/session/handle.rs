//! Individual session handle.

use std::sync::atomic::{AtomicBool, Ordering};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use chatsync_core::types::id::{SessionId, UserId};

use crate::events::ServerEvent;

/// A handle to a single live connection.
///
/// Holds the sender half of the session's outbound event queue plus metadata
/// about the owning user. Exclusively owned by the
/// [`ConnectionRegistry`](super::registry::ConnectionRegistry) for its
/// lifetime; destroyed on disconnect.
#[derive(Debug)]
pub struct SessionHandle {
    /// Unique session ID.
    pub session_id: SessionId,
    /// User who owns this session.
    pub user_id: UserId,
    /// When the connection was established.
    pub connected_at: DateTime<Utc>,
    /// Sender for outbound events.
    sender: mpsc::Sender<ServerEvent>,
    /// Whether the session is still live.
    alive: AtomicBool,
}

impl SessionHandle {
    /// Create a new session handle with a fresh session ID.
    pub fn new(user_id: UserId, sender: mpsc::Sender<ServerEvent>) -> Self {
        Self {
            session_id: SessionId::new(),
            user_id,
            connected_at: Utc::now(),
            sender,
            alive: AtomicBool::new(true),
        }
    }

    /// Enqueue an outbound event for this session.
    ///
    /// Non-blocking: a full buffer drops the event for this session with a
    /// warning, and a closed receiver marks the session dead. Returns whether
    /// the event was enqueued.
    pub fn send(&self, event: ServerEvent) -> bool {
        if !self.is_alive() {
            return false;
        }
        match self.sender.try_send(event) {
            Ok(_) => true,
            Err(mpsc::error::TrySendError::Full(_)) => {
                tracing::warn!(
                    session_id = %self.session_id,
                    "Session send buffer full, dropping event"
                );
                false
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                self.mark_closed();
                false
            }
        }
    }

    /// Check whether the session is live.
    pub fn is_alive(&self) -> bool {
        self.alive.load(Ordering::SeqCst)
    }

    /// Mark the session as closed; further sends are refused.
    pub fn mark_closed(&self) {
        self.alive.store(false, Ordering::SeqCst);
    }

    /// Get a snapshot of session info.
    pub fn info(&self) -> SessionInfo {
        SessionInfo {
            session_id: self.session_id,
            user_id: self.user_id,
            connected_at: self.connected_at,
            alive: self.is_alive(),
        }
    }
}

/// Snapshot of session info (serializable).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionInfo {
    /// Session ID.
    pub session_id: SessionId,
    /// User ID.
    pub user_id: UserId,
    /// Connected at.
    pub connected_at: DateTime<Utc>,
    /// Is alive.
    pub alive: bool,
}
