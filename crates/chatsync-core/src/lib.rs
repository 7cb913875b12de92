//! # chatsync-core
//!
//! Core crate for Chatsync. Contains collaborator traits, configuration
//! schemas, typed identifiers, domain types, and the unified error system.
//!
//! This crate has **no** internal dependencies on other Chatsync crates.

pub mod config;
pub mod error;
pub mod result;
pub mod traits;
pub mod types;

pub use error::SyncError;
pub use result::SyncResult;
