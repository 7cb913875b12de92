//! In-process counters for engine activity.

use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};

use serde::{Deserialize, Serialize};

/// Counters for all engine subsystems.
///
/// Plain atomics; scraping and export belong to the host.
#[derive(Debug, Default)]
pub struct EngineMetrics {
    /// Total sessions ever registered.
    pub sessions_total: AtomicU64,
    /// Currently registered sessions.
    pub sessions_active: AtomicI64,
    /// Messages accepted and persisted.
    pub messages_delivered: AtomicU64,
    /// Outbound events enqueued across all sessions.
    pub events_fanned_out: AtomicU64,
    /// Read markers newly recorded.
    pub read_markers_recorded: AtomicU64,
    /// Presence flips across the zero-session boundary.
    pub presence_transitions: AtomicU64,
}

impl EngineMetrics {
    /// Creates a zeroed metrics collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a session registration.
    pub fn session_opened(&self) {
        self.sessions_total.fetch_add(1, Ordering::Relaxed);
        self.sessions_active.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a session removal.
    pub fn session_closed(&self) {
        self.sessions_active.fetch_sub(1, Ordering::Relaxed);
    }

    /// Record an accepted message and the size of its fan-out.
    pub fn message_delivered(&self, fanout: u64) {
        self.messages_delivered.fetch_add(1, Ordering::Relaxed);
        self.events_fanned_out.fetch_add(fanout, Ordering::Relaxed);
    }

    /// Record outbound events enqueued outside message delivery.
    pub fn events_emitted(&self, count: u64) {
        self.events_fanned_out.fetch_add(count, Ordering::Relaxed);
    }

    /// Record newly recorded read markers.
    pub fn read_markers(&self, count: u64) {
        self.read_markers_recorded.fetch_add(count, Ordering::Relaxed);
    }

    /// Record a presence boundary transition.
    pub fn presence_transition(&self) {
        self.presence_transitions.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns a point-in-time copy of all counters.
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_total: self.sessions_total.load(Ordering::Relaxed),
            sessions_active: self.sessions_active.load(Ordering::Relaxed),
            messages_delivered: self.messages_delivered.load(Ordering::Relaxed),
            events_fanned_out: self.events_fanned_out.load(Ordering::Relaxed),
            read_markers_recorded: self.read_markers_recorded.load(Ordering::Relaxed),
            presence_transitions: self.presence_transitions.load(Ordering::Relaxed),
        }
    }
}

/// Serializable snapshot of [`EngineMetrics`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct MetricsSnapshot {
    /// Total sessions ever registered.
    pub sessions_total: u64,
    /// Currently registered sessions.
    pub sessions_active: i64,
    /// Messages accepted and persisted.
    pub messages_delivered: u64,
    /// Outbound events enqueued across all sessions.
    pub events_fanned_out: u64,
    /// Read markers newly recorded.
    pub read_markers_recorded: u64,
    /// Presence flips across the zero-session boundary.
    pub presence_transitions: u64,
}
