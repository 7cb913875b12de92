//! # chatsync-auth
//!
//! Connection-time authentication for Chatsync. Implements the engine's
//! [`TokenVerifier`](chatsync_core::traits::TokenVerifier) collaborator with
//! signed JWTs, plus the issuer half for hosts that mint their own tokens.

pub mod jwt;

pub use jwt::issuer::JwtIssuer;
pub use jwt::verifier::JwtVerifier;
