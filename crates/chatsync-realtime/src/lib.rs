//! # chatsync-realtime
//!
//! Real-time chat synchronization engine for Chatsync. Provides:
//!
//! - Session registry with multi-device support per user
//! - Presence tracking debounced at the zero-session boundary
//! - Chat membership routing with a single authorization chokepoint
//! - Message delivery fan-out with per-chat ordering guarantees
//! - Read-receipt aggregation with idempotent marking
//! - Typing indicators with debounced, auto-expiring state
//!
//! The engine is a library layer: a host process feeds it inbound events
//! from its transport and drains per-session outbound event receivers.

pub mod delivery;
pub mod dispatch;
pub mod engine;
pub mod events;
pub mod membership;
pub mod metrics;
pub mod presence;
pub mod receipts;
pub mod session;
pub mod typing;

pub use delivery::pipeline::MessageDeliveryPipeline;
pub use engine::SyncEngine;
pub use events::{ClientEvent, ServerEvent};
pub use membership::router::MembershipRouter;
pub use metrics::EngineMetrics;
pub use presence::tracker::PresenceTracker;
pub use receipts::aggregator::ReadReceiptAggregator;
pub use session::handle::SessionHandle;
pub use session::registry::ConnectionRegistry;
pub use typing::coordinator::TypingCoordinator;
