//! Durable queue records

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Row id of a queue entry. Monotonic in insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub i64);

impl std::fmt::Display for EntryId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A record waiting for (or past) delivery.
///
/// An entry is never deleted while `delivered_at` is `None`; `delivered_at`
/// is only set after the endpoint acknowledged a batch containing `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueEntry {
    pub id: EntryId,
    pub stream_name: String,
    /// Opaque serialized record (JSON produced by the sampler).
    pub payload: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    /// Number of failed batches this entry was part of.
    pub attempt_count: u32,
}

impl QueueEntry {
    pub fn is_delivered(&self) -> bool {
        self.delivered_at.is_some()
    }
}

/// Per-stream queue counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamStats {
    pub stream_name: String,
    pub pending: u64,
    pub delivered: u64,
    pub oldest_pending_at: Option<DateTime<Utc>>,
}
