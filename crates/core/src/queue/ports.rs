//! Port interfaces for the durable queue

use std::time::Duration;

use async_trait::async_trait;
use outpost_domain::{EntryId, QueueEntry, Result, StreamStats};

/// Per-stream, append-only store of records awaiting delivery.
///
/// Every method is atomic with respect to concurrent callers.
#[async_trait]
pub trait DurableQueue: Send + Sync {
    /// Persist one record and return its id.
    async fn append(&self, stream: &str, payload: &[u8]) -> Result<EntryId>;

    /// Undelivered entries of `stream`, oldest first.
    async fn list_pending(&self, stream: &str, limit: usize) -> Result<Vec<QueueEntry>>;

    /// Set `delivered_at` on the given ids. Rows already delivered are left
    /// untouched. Returns the number of rows changed.
    async fn mark_delivered(&self, ids: &[EntryId]) -> Result<usize>;

    /// Increment `attempt_count` on the given undelivered ids.
    async fn record_attempt(&self, ids: &[EntryId]) -> Result<usize>;

    /// Delete delivered entries of `stream` created more than `retention`
    /// ago. Undelivered entries are never deleted.
    async fn cleanup(&self, stream: &str, retention: Duration) -> Result<usize>;

    async fn pending_count(&self, stream: &str) -> Result<u64>;

    async fn stats(&self) -> Result<Vec<StreamStats>>;
}

/// Last server-issued cursor per stream.
#[async_trait]
pub trait CheckpointStore: Send + Sync {
    async fn load_checkpoint(&self, stream: &str) -> Result<Option<String>>;

    async fn store_checkpoint(&self, stream: &str, checkpoint: &str) -> Result<()>;
}
