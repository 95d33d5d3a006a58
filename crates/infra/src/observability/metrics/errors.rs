//! Counters for classified collection failures

use std::sync::atomic::{AtomicU64, Ordering};

use outpost_domain::CollectionError;

/// Count of reported failures by kind, plus storage recoveries.
#[derive(Debug, Default)]
pub struct ErrorMetrics {
    encoding: AtomicU64,
    storage: AtomicU64,
    transient_network: AtomicU64,
    auth: AtomicU64,
    permission: AtomicU64,
    recovered_on_retry: AtomicU64,
}

/// Point-in-time copy of [`ErrorMetrics`]
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ErrorCounts {
    pub encoding: u64,
    pub storage: u64,
    pub transient_network: u64,
    pub auth: u64,
    pub permission: u64,
    pub recovered_on_retry: u64,
}

impl ErrorCounts {
    pub fn total_failures(&self) -> u64 {
        self.encoding + self.storage + self.transient_network + self.auth + self.permission
    }
}

impl ErrorMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&self, error: &CollectionError) {
        let counter = match error {
            CollectionError::Encoding { .. } => &self.encoding,
            CollectionError::Storage { .. } => &self.storage,
            CollectionError::TransientNetwork { .. } => &self.transient_network,
            CollectionError::Auth { .. } => &self.auth,
            CollectionError::Permission { .. } => &self.permission,
        };
        // Relaxed OK: independent counters, no derived metrics
        counter.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_recovery(&self) {
        self.recovered_on_retry.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> ErrorCounts {
        ErrorCounts {
            encoding: self.encoding.load(Ordering::Relaxed),
            storage: self.storage.load(Ordering::Relaxed),
            transient_network: self.transient_network.load(Ordering::Relaxed),
            auth: self.auth.load(Ordering::Relaxed),
            permission: self.permission.load(Ordering::Relaxed),
            recovered_on_retry: self.recovered_on_retry.load(Ordering::Relaxed),
        }
    }
}
