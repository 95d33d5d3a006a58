//! Error classification shared by every layer.
//!
//! Layer-specific error enums (`StorageError`, `SyncError`, ...) implement
//! [`ErrorClassification`] so callers can decide whether to retry and how
//! loudly to log without matching on concrete variants.
//!
//! | Level | Use Case |
//! |-------|----------|
//! | **Info** | Expected conditions (empty result, stale sample) |
//! | **Warning** | Degraded but operational (lock contention, transient network) |
//! | **Error** | Failure requiring attention (query failure, bad config) |
//! | **Critical** | Integrity at risk (wrong encryption key, schema mismatch) |

use std::fmt;
use std::time::Duration;

/// Standard interface for classifying errors by their characteristics.
pub trait ErrorClassification {
    /// Whether the same operation may succeed if attempted again.
    fn is_retryable(&self) -> bool;

    /// Severity used for log level selection.
    fn severity(&self) -> ErrorSeverity;

    /// Whether the error indicates an integrity problem.
    fn is_critical(&self) -> bool {
        self.severity() == ErrorSeverity::Critical
    }

    /// Suggested delay before retrying, when the error carries one.
    fn retry_after(&self) -> Option<Duration> {
        None
    }
}

/// Error severity levels for monitoring and alerting
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ErrorSeverity {
    /// Informational, typically for debugging
    Info,
    /// Warning, should be monitored but not critical
    Warning,
    /// Error, requires attention and action
    Error,
    /// Critical, immediate action required
    Critical,
}

impl fmt::Display for ErrorSeverity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Info => write!(f, "INFO"),
            Self::Warning => write!(f, "WARN"),
            Self::Error => write!(f, "ERROR"),
            Self::Critical => write!(f, "CRITICAL"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Flaky;

    impl ErrorClassification for Flaky {
        fn is_retryable(&self) -> bool {
            true
        }

        fn severity(&self) -> ErrorSeverity {
            ErrorSeverity::Warning
        }
    }

    #[test]
    fn default_methods_follow_severity() {
        assert!(!Flaky.is_critical());
        assert_eq!(Flaky.retry_after(), None);
    }

    #[test]
    fn severity_orders_by_impact() {
        assert!(ErrorSeverity::Critical > ErrorSeverity::Error);
        assert!(ErrorSeverity::Warning > ErrorSeverity::Info);
        assert_eq!(ErrorSeverity::Warning.to_string(), "WARN");
    }
}
