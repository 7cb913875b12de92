//! Top-level synchronization engine that ties together all subsystems.

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tracing::info;

use chatsync_core::config::realtime::RealtimeConfig;
use chatsync_core::result::SyncResult;
use chatsync_core::traits::auth::TokenVerifier;
use chatsync_core::traits::storage::ChatStore;
use chatsync_core::types::id::{SessionId, UserId};

use crate::delivery::pipeline::MessageDeliveryPipeline;
use crate::events::ServerEvent;
use crate::membership::router::MembershipRouter;
use crate::metrics::EngineMetrics;
use crate::presence::tracker::PresenceTracker;
use crate::receipts::aggregator::ReadReceiptAggregator;
use crate::session::handle::SessionHandle;
use crate::session::registry::ConnectionRegistry;
use crate::typing::coordinator::TypingCoordinator;

/// Central engine coordinating all synchronization subsystems.
///
/// Created at service start and torn down at shutdown; there is no ambient
/// global state. The host feeds inbound events through
/// [`handle_event`](Self::handle_event) and drains each session's receiver.
#[derive(Clone)]
pub struct SyncEngine {
    /// Connection registry.
    pub registry: Arc<ConnectionRegistry>,
    /// Membership router.
    pub router: Arc<MembershipRouter>,
    /// Presence tracker.
    pub presence: Arc<PresenceTracker>,
    /// Message delivery pipeline.
    pub delivery: Arc<MessageDeliveryPipeline>,
    /// Read receipt aggregator.
    pub receipts: Arc<ReadReceiptAggregator>,
    /// Typing coordinator.
    pub typing: Arc<TypingCoordinator>,
    /// Metrics collector.
    pub metrics: Arc<EngineMetrics>,
    /// Storage collaborator, shared with the subsystems.
    pub store: Arc<dyn ChatStore>,
    /// Optional connection-time token verifier.
    verifier: Option<Arc<dyn TokenVerifier>>,
    /// Outbound event buffer size per session.
    session_buffer_size: usize,
    /// Shutdown signal sender.
    shutdown_tx: broadcast::Sender<()>,
}

impl std::fmt::Debug for SyncEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncEngine").finish()
    }
}

impl SyncEngine {
    /// Creates a new engine with all subsystems.
    ///
    /// Connections must be opened with [`connect`](Self::connect) by a host
    /// that resolved the user identity itself; see
    /// [`with_verifier`](Self::with_verifier) for token-gated connects.
    pub fn new(config: RealtimeConfig, store: Arc<dyn ChatStore>) -> Self {
        Self::build(config, store, None)
    }

    /// Creates a new engine that can also resolve connection tokens through
    /// the given verifier.
    pub fn with_verifier(
        config: RealtimeConfig,
        store: Arc<dyn ChatStore>,
        verifier: Arc<dyn TokenVerifier>,
    ) -> Self {
        Self::build(config, store, Some(verifier))
    }

    fn build(
        config: RealtimeConfig,
        store: Arc<dyn ChatStore>,
        verifier: Option<Arc<dyn TokenVerifier>>,
    ) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);

        let metrics = Arc::new(EngineMetrics::new());
        let registry = Arc::new(ConnectionRegistry::new());
        let router = Arc::new(MembershipRouter::new(
            &config,
            store.clone(),
            registry.clone(),
        ));
        let presence = Arc::new(PresenceTracker::new(
            registry.clone(),
            router.clone(),
            store.clone(),
            metrics.clone(),
        ));
        let typing = Arc::new(TypingCoordinator::new(&config, router.clone()));
        let delivery = Arc::new(MessageDeliveryPipeline::new(
            store.clone(),
            router.clone(),
            typing.clone(),
            metrics.clone(),
        ));
        let receipts = Arc::new(ReadReceiptAggregator::new(
            store.clone(),
            router.clone(),
            metrics.clone(),
        ));

        info!("Synchronization engine initialized");

        Self {
            registry,
            router,
            presence,
            delivery,
            receipts,
            typing,
            metrics,
            store,
            verifier,
            session_buffer_size: config.session_buffer_size,
            shutdown_tx,
        }
    }

    /// Opens a session for an already-authenticated user.
    ///
    /// Returns the session handle and the receiver the host drains to push
    /// events over its transport. Registration of a user's first session
    /// flips presence to online.
    pub async fn connect(
        &self,
        user_id: UserId,
    ) -> (Arc<SessionHandle>, mpsc::Receiver<ServerEvent>) {
        let (tx, rx) = mpsc::channel(self.session_buffer_size);
        let handle = Arc::new(SessionHandle::new(user_id, tx));

        if let Some(active_sessions) = self.registry.register(handle.clone()) {
            self.presence.on_session_added(user_id, active_sessions).await;
            self.metrics.session_opened();
        }

        info!(
            session_id = %handle.session_id,
            user_id = %user_id,
            "Session registered"
        );
        (handle, rx)
    }

    /// Verifies a connection token and opens a session for its user.
    ///
    /// Fails with `Unauthorized` before any engine state is created when the
    /// token is invalid or no verifier is configured.
    pub async fn connect_with_token(
        &self,
        token: &str,
    ) -> SyncResult<(Arc<SessionHandle>, mpsc::Receiver<ServerEvent>)> {
        let verifier = self.verifier.as_ref().ok_or_else(|| {
            chatsync_core::SyncError::unauthorized("No token verifier configured")
        })?;
        let user_id = verifier.verify(token).await?;
        Ok(self.connect(user_id).await)
    }

    /// Closes a session.
    ///
    /// Fails with `UnknownSession` if the session is not registered (treated
    /// by callers as already cleaned up). Removal of a user's last session
    /// flips presence to offline and stamps last-seen. An in-flight submit
    /// from the session still completes; the session itself stops receiving
    /// further fan-out.
    pub async fn disconnect(&self, session_id: SessionId) -> SyncResult<()> {
        let (handle, remaining) = self.registry.unregister(session_id)?;
        handle.mark_closed();
        self.presence.on_session_removed(handle.user_id, remaining).await;
        self.metrics.session_closed();

        info!(
            session_id = %session_id,
            user_id = %handle.user_id,
            "Session unregistered"
        );
        Ok(())
    }

    /// Returns a shutdown receiver for graceful shutdown coordination.
    pub fn shutdown_receiver(&self) -> broadcast::Receiver<()> {
        self.shutdown_tx.subscribe()
    }

    /// Shuts the engine down: signals subscribers, cancels typing timers,
    /// and closes every session.
    pub async fn shutdown(&self) {
        info!("Shutting down synchronization engine");

        let _ = self.shutdown_tx.send(());
        self.typing.abort_all();

        let drained = self.registry.drain();
        for handle in &drained {
            handle.mark_closed();
        }

        info!(count = drained.len(), "Synchronization engine shut down");
    }
}
