//! Bounded-retry enqueue
//!
//! Wraps [`DurableQueue::append`] in a capped retry loop. The delay before
//! attempt `n + 1` is `n * retry_step` and is awaited with
//! `tokio::time::sleep`, so the calling task yields instead of blocking a
//! worker thread.

use std::sync::Arc;
use std::time::Duration;

use outpost_domain::config::EnqueueConfig;
use outpost_domain::{CollectionError, EntryId};
use tracing::{debug, warn};

use super::ports::DurableQueue;
use crate::error_reporting_ports::ErrorReporter;

/// Retry limits for queue appends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnqueuePolicy {
    pub max_attempts: u32,
    pub retry_step: Duration,
}

impl Default for EnqueuePolicy {
    fn default() -> Self {
        Self::from(&EnqueueConfig::default())
    }
}

impl From<&EnqueueConfig> for EnqueuePolicy {
    fn from(config: &EnqueueConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            retry_step: Duration::from_millis(config.retry_step_ms),
        }
    }
}

/// Appends records to the durable queue, retrying transient storage
/// failures.
pub struct RetryingEnqueuer {
    queue: Arc<dyn DurableQueue>,
    reporter: Arc<dyn ErrorReporter>,
    policy: EnqueuePolicy,
}

impl RetryingEnqueuer {
    pub fn new(
        queue: Arc<dyn DurableQueue>,
        reporter: Arc<dyn ErrorReporter>,
        policy: EnqueuePolicy,
    ) -> Self {
        Self { queue, reporter, policy }
    }

    pub fn policy(&self) -> EnqueuePolicy {
        self.policy
    }

    /// Append `payload` to `stream`.
    ///
    /// # Errors
    /// `CollectionError::Storage` once every attempt has failed. The caller
    /// is expected to report it and drop the sample.
    pub async fn enqueue(&self, stream: &str, payload: &[u8]) -> Result<EntryId, CollectionError> {
        let max_attempts = self.policy.max_attempts.max(1);
        let mut last_reason = String::new();

        for attempt in 1..=max_attempts {
            match self.queue.append(stream, payload).await {
                Ok(id) => {
                    if attempt > 1 {
                        self.reporter.log_recovered_on_retry(stream, attempt);
                    }
                    debug!(stream, entry_id = %id, attempt, "record enqueued");
                    return Ok(id);
                }
                Err(err) => {
                    warn!(stream, attempt, max_attempts, error = %err, "queue append failed");
                    last_reason = err.to_string();
                    if attempt < max_attempts {
                        tokio::time::sleep(self.policy.retry_step * attempt).await;
                    }
                }
            }
        }

        Err(CollectionError::Storage {
            stream: stream.to_string(),
            reason: last_reason,
            attempts: max_attempts,
        })
    }
}
