//! Error reporting port

use outpost_domain::CollectionError;

/// Sink for classified collection failures.
pub trait ErrorReporter: Send + Sync {
    /// Record a failure that caused a sample or batch to be dropped or
    /// deferred.
    fn log(&self, error: &CollectionError, device_id: &str);

    /// Record that a storage append succeeded only after `attempt` tries.
    fn log_recovered_on_retry(&self, stream: &str, attempt: u32);
}
