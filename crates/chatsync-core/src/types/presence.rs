//! Presence types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::UserId;

/// A point-in-time view of one user's presence.
///
/// `last_seen` is meaningful only while the user is offline; it is `None`
/// whenever at least one session is active.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PresenceSnapshot {
    /// The user this snapshot describes.
    pub user_id: UserId,
    /// Whether the user has at least one active session.
    pub online: bool,
    /// When the user's last session ended, if offline.
    pub last_seen: Option<DateTime<Utc>>,
}
