//! Delivery counters fed by the upload coordinator
//!
//! ## Design
//! - **Atomic totals** for the lock-free hot path
//! - **Per-stream map** behind a poison-safe mutex (explicit match, no
//!   `.expect()`)

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use outpost_core::UploadStatsSink;
use outpost_domain::IngestResponse;
use tracing::debug;

/// Totals for one stream
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamDelivery {
    pub batches: u64,
    pub records: u64,
    pub server_accepted: u64,
    pub server_rejected: u64,
    pub last_checkpoint: Option<String>,
    pub last_activity_id: Option<String>,
    pub last_delivery_at: Option<DateTime<Utc>>,
}

/// Point-in-time copy of [`UploadMetrics`]
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UploadSnapshot {
    pub batches: u64,
    pub records: u64,
    pub streams: BTreeMap<String, StreamDelivery>,
}

#[derive(Debug, Default)]
pub struct UploadMetrics {
    batches: AtomicU64,
    records: AtomicU64,
    per_stream: Mutex<BTreeMap<String, StreamDelivery>>,
}

impl UploadMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_batches(&self) -> u64 {
        self.batches.load(Ordering::Acquire)
    }

    pub fn total_records(&self) -> u64 {
        self.records.load(Ordering::Acquire)
    }

    pub fn stream(&self, stream: &str) -> Option<StreamDelivery> {
        self.lock_streams().get(stream).cloned()
    }

    pub fn snapshot(&self) -> UploadSnapshot {
        UploadSnapshot {
            batches: self.total_batches(),
            records: self.total_records(),
            streams: self.lock_streams().clone(),
        }
    }

    fn lock_streams(&self) -> std::sync::MutexGuard<'_, BTreeMap<String, StreamDelivery>> {
        match self.per_stream.lock() {
            Ok(guard) => guard,
            Err(poison_err) => {
                tracing::warn!(
                    metric = "UploadMetrics::per_stream",
                    "Mutex poisoned during upload stats access, recovering data"
                );
                poison_err.into_inner()
            }
        }
    }
}

impl UploadStatsSink for UploadMetrics {
    fn record_delivery(&self, stream: &str, delivered: usize, response: &IngestResponse) {
        let delivered = delivered as u64;
        self.batches.fetch_add(1, Ordering::AcqRel);
        self.records.fetch_add(delivered, Ordering::AcqRel);

        let mut streams = self.lock_streams();
        let entry = streams.entry(stream.to_string()).or_default();
        entry.batches += 1;
        entry.records += delivered;
        entry.server_accepted += response.accepted;
        entry.server_rejected += response.rejected;
        if response.next_checkpoint.is_some() {
            entry.last_checkpoint.clone_from(&response.next_checkpoint);
        }
        if response.activity_id.is_some() {
            entry.last_activity_id.clone_from(&response.activity_id);
        }
        entry.last_delivery_at = Some(Utc::now());

        debug!(stream, delivered, total_records = entry.records, "delivery recorded");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn deliveries_accumulate_per_stream() {
        let metrics = UploadMetrics::new();
        metrics.record_delivery(
            "cpu",
            10,
            &IngestResponse { accepted: 10, next_checkpoint: Some("c1".into()), ..Default::default() },
        );
        metrics.record_delivery("cpu", 5, &IngestResponse { rejected: 1, ..Default::default() });
        metrics.record_delivery("gps", 2, &IngestResponse::default());

        assert_eq!(metrics.total_batches(), 3);
        assert_eq!(metrics.total_records(), 17);

        let cpu = metrics.stream("cpu").expect("cpu stats");
        assert_eq!(cpu.batches, 2);
        assert_eq!(cpu.server_accepted, 10);
        assert_eq!(cpu.server_rejected, 1);
        // A response without a checkpoint keeps the previous one.
        assert_eq!(cpu.last_checkpoint.as_deref(), Some("c1"));
        assert!(cpu.last_delivery_at.is_some());

        assert_eq!(metrics.snapshot().streams.len(), 2);
    }
}
