//! Real-time engine configuration.

use serde::{Deserialize, Serialize};

/// Real-time synchronization engine configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RealtimeConfig {
    /// Outbound event buffer size per session.
    #[serde(default = "default_session_buffer")]
    pub session_buffer_size: usize,
    /// Typing inactivity window in milliseconds. A typing signal with no
    /// refresh inside this window auto-expires to stop-typing.
    #[serde(default = "default_typing_window")]
    pub typing_window_ms: u64,
    /// Maximum number of chats held in the membership cache.
    #[serde(default = "default_membership_capacity")]
    pub membership_cache_capacity: u64,
    /// Time-to-live for cached chat memberships, in seconds.
    #[serde(default = "default_membership_ttl")]
    pub membership_cache_ttl_seconds: u64,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            session_buffer_size: default_session_buffer(),
            typing_window_ms: default_typing_window(),
            membership_cache_capacity: default_membership_capacity(),
            membership_cache_ttl_seconds: default_membership_ttl(),
        }
    }
}

fn default_session_buffer() -> usize {
    256
}

fn default_typing_window() -> u64 {
    2000
}

fn default_membership_capacity() -> u64 {
    10_000
}

fn default_membership_ttl() -> u64 {
    300
}
