//! Error types used throughout the application

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for Outpost
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "message")]
pub enum OutpostError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Network error: {0}")]
    Network(String),

    #[error("Authentication error: {0}")]
    Auth(String),

    #[error("Encoding error: {0}")]
    Encoding(String),

    #[error("Permission error: {0}")]
    Permission(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Outpost operations
pub type Result<T> = std::result::Result<T, OutpostError>;

/// Classified failure raised while collecting or delivering a stream's
/// records.
///
/// Every variant names the stream it happened on so reporters can attribute
/// it without extra context.
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum CollectionError {
    /// Record could not be serialized.
    #[error("[{stream}] encoding failed: {reason}")]
    Encoding { stream: String, reason: String },

    /// Queue append failed on every attempt.
    #[error("[{stream}] storage failed after {attempts} attempt(s): {reason}")]
    Storage { stream: String, reason: String, attempts: u32 },

    /// Upload failed for a reason expected to clear on its own.
    #[error("[{stream}] transient network failure (status {status:?}): {reason}")]
    TransientNetwork { stream: String, status: Option<u16>, reason: String },

    /// Upload was rejected with 401.
    #[error("[{stream}] authorization rejected: {reason}")]
    Auth { stream: String, reason: String },

    /// Capture source refused access.
    #[error("[{stream}] permission denied: {capability}")]
    Permission { stream: String, capability: String },
}

impl CollectionError {
    /// Stream the failure belongs to.
    pub fn stream(&self) -> &str {
        match self {
            Self::Encoding { stream, .. }
            | Self::Storage { stream, .. }
            | Self::TransientNetwork { stream, .. }
            | Self::Auth { stream, .. }
            | Self::Permission { stream, .. } => stream,
        }
    }

    /// Whether retrying the same operation later may succeed.
    ///
    /// Encoding and permission failures need an outside change (code or user
    /// consent), so they are terminal for the sample that hit them.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::TransientNetwork { .. } | Self::Auth { .. })
    }

    /// Short stable label used in structured logs.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Encoding { .. } => "encoding",
            Self::Storage { .. } => "storage",
            Self::TransientNetwork { .. } => "transient_network",
            Self::Auth { .. } => "auth",
            Self::Permission { .. } => "permission",
        }
    }
}

impl From<CollectionError> for OutpostError {
    fn from(err: CollectionError) -> Self {
        let message = err.to_string();
        match err {
            CollectionError::Encoding { .. } => Self::Encoding(message),
            CollectionError::Storage { .. } => Self::Database(message),
            CollectionError::TransientNetwork { .. } => Self::Network(message),
            CollectionError::Auth { .. } => Self::Auth(message),
            CollectionError::Permission { .. } => Self::Permission(message),
        }
    }
}
