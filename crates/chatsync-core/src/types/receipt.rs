//! Read receipt types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::id::{MessageId, UserId};

/// A durable record that a specific user has observed a specific message.
///
/// At most one marker exists per (message, reader) pair; repeated marks are
/// no-ops.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ReadMarker {
    /// The message that was read.
    pub message_id: MessageId,
    /// The user who read it.
    pub reader_id: UserId,
    /// When it was read.
    pub read_at: DateTime<Utc>,
}
