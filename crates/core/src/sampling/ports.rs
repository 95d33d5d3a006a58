//! Port interfaces for capture sources

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;

/// A record together with the time the source produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct Captured<R> {
    pub record: R,
    pub captured_at: DateTime<Utc>,
}

impl<R> Captured<R> {
    pub fn new(record: R, captured_at: DateTime<Utc>) -> Self {
        Self { record, captured_at }
    }
}

/// Failure reported by a capture source
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// The user or OS refused access to `0` (the capability name).
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// Sensor is temporarily not producing data.
    #[error("source unavailable: {0}")]
    Unavailable(String),

    #[error("capture failed: {0}")]
    Failed(String),
}

/// External producer of one stream's records (sensor, OS counter, ...).
///
/// Used as a trait object per stream: `Arc<dyn CaptureSource<Record = R>>`.
#[async_trait]
pub trait CaptureSource: Send + Sync {
    type Record: Serialize + Send + Sync;

    /// Most recent value, or `None` when the source has nothing yet.
    async fn latest(&self) -> Result<Option<Captured<Self::Record>>, CaptureError>;

    /// Partially accumulated unit (for example an in-progress aggregation
    /// window), handed over when sampling stops.
    async fn take_partial(&self) -> Result<Option<Captured<Self::Record>>, CaptureError> {
        Ok(None)
    }

    /// Whether the underlying capture is running.
    fn is_capturing(&self) -> bool;

    /// Ask the source to restart capture after it stopped on its own.
    async fn resume(&self) -> Result<(), CaptureError>;
}
