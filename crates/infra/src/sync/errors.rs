//! Ingest error types
//!
//! Classifies a failed upload request and maps it onto the two outcomes the
//! circuit breaker distinguishes: authorization failure and everything else.

use std::time::Duration;

use outpost_core::IngestOutcome;
use outpost_domain::OutpostError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SyncError {
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Client error {status}: {message}")]
    Client { status: u16, message: String },

    #[error("Network error: {0}")]
    Network(String),

    #[error("Timeout after {0:?}")]
    Timeout(Duration),

    #[error("Configuration error: {0}")]
    Config(String),
}

impl SyncError {
    /// Classify a non-2xx response.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = if body.trim().is_empty() {
            format!("HTTP {status}")
        } else {
            truncate(body.trim(), 200)
        };
        match status {
            401 => Self::Unauthorized(message),
            429 => Self::RateLimited(message),
            500..=599 => Self::Server { status, message },
            _ => Self::Client { status, message },
        }
    }

    /// HTTP status, when a response was received.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Unauthorized(_) => Some(401),
            Self::RateLimited(_) => Some(429),
            Self::Server { status, .. } | Self::Client { status, .. } => Some(*status),
            Self::Network(_) | Self::Timeout(_) | Self::Config(_) => None,
        }
    }

    pub fn into_outcome(self) -> IngestOutcome {
        match self {
            Self::Unauthorized(reason) => IngestOutcome::Unauthorized { reason },
            other => IngestOutcome::Transient { status: other.status(), reason: other.to_string() },
        }
    }
}

impl From<OutpostError> for SyncError {
    fn from(err: OutpostError) -> Self {
        match err {
            OutpostError::Network(message) => Self::Network(message),
            OutpostError::Auth(message) => Self::Unauthorized(message),
            OutpostError::Config(message) | OutpostError::Internal(message) => Self::Config(message),
            other => Self::Network(other.to_string()),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_401_is_an_authorization_failure() {
        assert!(matches!(SyncError::from_status(401, ""), SyncError::Unauthorized(_)));
        assert!(matches!(SyncError::from_status(403, ""), SyncError::Client { status: 403, .. }));
        assert!(matches!(SyncError::from_status(429, ""), SyncError::RateLimited(_)));
        assert!(matches!(SyncError::from_status(502, ""), SyncError::Server { status: 502, .. }));
        assert!(matches!(
            SyncError::from_status(403, "forbidden").into_outcome(),
            IngestOutcome::Transient { status: Some(403), .. }
        ));
    }

    #[test]
    fn outcomes_carry_status() {
        assert_eq!(
            SyncError::from_status(401, "bad token").into_outcome(),
            IngestOutcome::Unauthorized { reason: "bad token".into() }
        );
        match SyncError::from_status(503, "").into_outcome() {
            IngestOutcome::Transient { status, reason } => {
                assert_eq!(status, Some(503));
                assert!(reason.contains("503"));
            }
            other => panic!("expected transient outcome, got {other:?}"),
        }
        assert!(matches!(
            SyncError::Timeout(Duration::from_secs(30)).into_outcome(),
            IngestOutcome::Transient { status: None, .. }
        ));
    }

    #[test]
    fn long_bodies_are_truncated() {
        let body = "x".repeat(500);
        let err = SyncError::from_status(500, &body);
        assert!(err.to_string().len() < 260);
    }
}
