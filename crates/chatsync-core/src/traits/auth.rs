//! Authentication collaborator interface.

use async_trait::async_trait;

use crate::result::SyncResult;
use crate::types::id::UserId;

/// Resolves a connection-time credential to a user identity.
///
/// Verification failure terminates the connection attempt before any engine
/// state is created.
#[async_trait]
pub trait TokenVerifier: Send + Sync {
    /// Verifies a token and returns the owning user identity, or an
    /// `Unauthorized` error.
    async fn verify(&self, token: &str) -> SyncResult<UserId>;
}
