//! Shared domain types.

pub mod id;
pub mod message;
pub mod presence;
pub mod receipt;

pub use id::{ChatId, MessageId, SessionId, UserId};
pub use message::{MessageEvent, NewMessage, StoredMessage};
pub use presence::PresenceSnapshot;
pub use receipt::ReadMarker;
