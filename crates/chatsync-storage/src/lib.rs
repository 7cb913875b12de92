//! # chatsync-storage
//!
//! In-memory reference implementation of the
//! [`ChatStore`](chatsync_core::traits::ChatStore) collaborator. Lets the
//! engine run without external infrastructure; also the store used by the
//! test suite. Deployments with durable requirements supply their own
//! `ChatStore` backed by a database.

pub mod memory;

pub use memory::MemoryChatStore;
