//! JWT claims, issuing, and verification.

pub mod claims;
pub mod issuer;
pub mod verifier;
