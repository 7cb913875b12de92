//! Unified error types for Chatsync.
//!
//! All crates map their internal errors into [`SyncError`] for consistent
//! propagation through the ? operator.

use std::fmt;
use thiserror::Error;

/// Top-level error kind categorization used across the entire engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Credential verification failed at connection time.
    Unauthorized,
    /// A chat-scoped action was attempted by a non-participant.
    NotAMember,
    /// Message content failed validation (empty or whitespace-only).
    InvalidContent,
    /// The storage collaborator failed while recording a message; nothing
    /// was broadcast.
    DeliveryFailed,
    /// An operation referenced a session that is no longer registered.
    UnknownSession,
    /// A storage collaborator error outside the message submit path.
    Storage,
    /// A configuration error occurred.
    Configuration,
    /// A serialization/deserialization error occurred.
    Serialization,
    /// An internal engine error occurred.
    Internal,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unauthorized => write!(f, "UNAUTHORIZED"),
            Self::NotAMember => write!(f, "NOT_A_MEMBER"),
            Self::InvalidContent => write!(f, "INVALID_CONTENT"),
            Self::DeliveryFailed => write!(f, "DELIVERY_FAILED"),
            Self::UnknownSession => write!(f, "UNKNOWN_SESSION"),
            Self::Storage => write!(f, "STORAGE"),
            Self::Configuration => write!(f, "CONFIGURATION"),
            Self::Serialization => write!(f, "SERIALIZATION"),
            Self::Internal => write!(f, "INTERNAL"),
        }
    }
}

/// The unified error used throughout Chatsync.
///
/// Crate-specific errors are mapped into `SyncError` using `From` impls or
/// explicit `.map_err()` calls. This provides a single error type for the
/// entire engine boundary, and the `kind` code doubles as the wire-level
/// error code sent back to the originating session.
#[derive(Debug, Error)]
#[error("{kind}: {message}")]
pub struct SyncError {
    /// The category of error.
    pub kind: ErrorKind,
    /// A human-readable error message.
    pub message: String,
    /// Optional underlying cause.
    #[source]
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

impl SyncError {
    /// Create a new error.
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            source: None,
        }
    }

    /// Create a new error with an underlying cause.
    pub fn with_source(
        kind: ErrorKind,
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self {
            kind,
            message: message.into(),
            source: Some(Box::new(source)),
        }
    }

    /// Create an unauthorized error.
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unauthorized, message)
    }

    /// Create a not-a-member error.
    pub fn not_a_member(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::NotAMember, message)
    }

    /// Create an invalid-content error.
    pub fn invalid_content(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidContent, message)
    }

    /// Create a delivery-failed error wrapping the persistence failure.
    pub fn delivery_failed(
        message: impl Into<String>,
        source: impl std::error::Error + Send + Sync + 'static,
    ) -> Self {
        Self::with_source(ErrorKind::DeliveryFailed, message, source)
    }

    /// Create an unknown-session error.
    pub fn unknown_session(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::UnknownSession, message)
    }

    /// Create a storage error.
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Storage, message)
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Configuration, message)
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Internal, message)
    }
}

impl Clone for SyncError {
    fn clone(&self) -> Self {
        Self {
            kind: self.kind,
            message: self.message.clone(),
            source: None,
        }
    }
}

impl From<serde_json::Error> for SyncError {
    fn from(err: serde_json::Error) -> Self {
        Self::with_source(
            ErrorKind::Serialization,
            format!("JSON serialization error: {err}"),
            err,
        )
    }
}

impl From<std::io::Error> for SyncError {
    fn from(err: std::io::Error) -> Self {
        Self::with_source(ErrorKind::Internal, format!("I/O error: {err}"), err)
    }
}

impl From<config::ConfigError> for SyncError {
    fn from(err: config::ConfigError) -> Self {
        Self::with_source(
            ErrorKind::Configuration,
            format!("Configuration error: {err}"),
            err,
        )
    }
}
