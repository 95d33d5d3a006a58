//! Worker lifecycle error types

use outpost_domain::OutpostError;
use thiserror::Error;

use crate::errors::InfraError;

/// Lifecycle errors raised by the scheduled workers
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Worker is already running
    #[error("Scheduler already running")]
    AlreadyRunning,

    /// Worker is not running
    #[error("Scheduler not running")]
    NotRunning,

    /// Worker is switched off by configuration
    #[error("Scheduler disabled: {0}")]
    Disabled(String),

    /// Operation timed out
    #[error("Operation timed out after {seconds}s")]
    Timeout { seconds: u64 },

    /// Task join failed
    #[error("Task join failed: {0}")]
    TaskJoinFailed(String),
}

impl From<SchedulerError> for InfraError {
    fn from(err: SchedulerError) -> Self {
        let outpost_err = match err {
            SchedulerError::AlreadyRunning
            | SchedulerError::NotRunning
            | SchedulerError::Disabled(_) => OutpostError::InvalidInput(err.to_string()),
            SchedulerError::Timeout { .. } | SchedulerError::TaskJoinFailed(_) => {
                OutpostError::Internal(err.to_string())
            }
        };
        InfraError(outpost_err)
    }
}

impl From<SchedulerError> for OutpostError {
    fn from(err: SchedulerError) -> Self {
        InfraError::from(err).into()
    }
}

/// Convenience type alias for scheduler operations
pub type SchedulerResult<T> = Result<T, SchedulerError>;
