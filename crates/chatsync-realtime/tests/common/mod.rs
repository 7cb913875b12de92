//! Shared test helpers for engine integration tests.

use std::sync::Arc;
use std::sync::Once;
use std::time::Duration;

use tokio::sync::mpsc;

use chatsync_core::config::realtime::RealtimeConfig;
use chatsync_core::types::id::{ChatId, UserId};
use chatsync_realtime::engine::SyncEngine;
use chatsync_realtime::events::ServerEvent;
use chatsync_realtime::session::handle::SessionHandle;
use chatsync_storage::MemoryChatStore;

/// Engine wired to an in-memory store.
pub struct TestEngine {
    /// The engine under test.
    pub engine: SyncEngine,
    /// Direct store access for seeding and assertions.
    pub store: Arc<MemoryChatStore>,
}

impl TestEngine {
    /// Creates an engine with default configuration.
    pub fn new() -> Self {
        Self::with_config(RealtimeConfig::default())
    }

    /// Creates an engine with the given configuration.
    pub fn with_config(config: RealtimeConfig) -> Self {
        init_tracing();
        let store = Arc::new(MemoryChatStore::new());
        let engine = SyncEngine::new(config, store.clone());
        Self { engine, store }
    }

    /// Seeds a chat with the given participants.
    pub fn create_chat(&self, members: &[UserId]) -> ChatId {
        self.store.create_chat(members)
    }

    /// Opens a session for a user.
    pub async fn connect(&self, user_id: UserId) -> Client {
        let (handle, rx) = self.engine.connect(user_id).await;
        Client { handle, rx }
    }
}

/// One connected client device: session handle plus its event receiver.
pub struct Client {
    /// The session handle.
    pub handle: Arc<SessionHandle>,
    /// Receiver the host would drain into its transport.
    pub rx: mpsc::Receiver<ServerEvent>,
}

impl Client {
    /// Waits for the next event, failing the test after a timeout.
    pub async fn recv(&mut self) -> ServerEvent {
        tokio::time::timeout(Duration::from_secs(5), self.rx.recv())
            .await
            .expect("timed out waiting for event")
            .expect("event channel closed")
    }

    /// Drains every event already enqueued.
    pub fn drain(&mut self) -> Vec<ServerEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.rx.try_recv() {
            events.push(event);
        }
        events
    }

    /// Asserts no event is currently enqueued.
    pub fn assert_silent(&mut self) {
        if let Ok(event) = self.rx.try_recv() {
            panic!("expected no event, got {event:?}");
        }
    }
}

fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
            )
            .with_test_writer()
            .try_init();
    });
}
