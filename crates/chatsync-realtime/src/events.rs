//! Inbound and outbound event type definitions.
//!
//! Tag and field names follow the wire protocol spoken by chat clients;
//! transport framing is the host's concern.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chatsync_core::types::id::{ChatId, MessageId, UserId};
use chatsync_core::types::message::MessageEvent;

/// Events sent by a client to the engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ClientEvent {
    /// Submit a new message to a chat.
    SendMessage {
        /// Target chat.
        chat_id: ChatId,
        /// Message body.
        content: String,
    },
    /// The user started (or continues) typing in a chat.
    Typing {
        /// Target chat.
        chat_id: ChatId,
    },
    /// The user explicitly stopped typing in a chat.
    StopTyping {
        /// Target chat.
        chat_id: ChatId,
    },
    /// The user has observed the given messages.
    MarkAsRead {
        /// Messages to mark; may span chats and repeat ids.
        message_ids: Vec<MessageId>,
    },
}

/// Events emitted by the engine to client sessions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum ServerEvent {
    /// A message was accepted and persisted.
    NewMessage {
        /// The accepted message.
        message: MessageEvent,
    },
    /// Another participant read one or more messages.
    MessagesRead {
        /// Newly recorded message ids.
        message_ids: Vec<MessageId>,
        /// Who read them.
        reader_id: UserId,
    },
    /// Another participant started typing.
    Typing {
        /// Chat where typing is happening.
        chat_id: ChatId,
        /// Who is typing.
        user_id: UserId,
    },
    /// Another participant stopped typing.
    StopTyping {
        /// Chat where typing stopped.
        chat_id: ChatId,
        /// Who stopped.
        user_id: UserId,
    },
    /// A user's presence flipped at the zero-session boundary.
    PresenceChanged {
        /// The user whose presence changed.
        user_id: UserId,
        /// Whether the user is now online.
        online: bool,
        /// When the user was last seen; `None` while online.
        last_seen: Option<DateTime<Utc>>,
    },
    /// An inbound action failed; sent to the originating session only.
    Error {
        /// Machine-readable error code.
        code: String,
        /// Error description.
        message: String,
    },
}
