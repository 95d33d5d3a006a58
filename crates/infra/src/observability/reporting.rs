//! Default collaborator hooks that log through `tracing`.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use outpost_core::{AuthFailureHandler, ErrorReporter};
use outpost_domain::CollectionError;
use parking_lot::Mutex;
use tracing::{error, info, warn};

use super::metrics::ErrorMetrics;

/// Logs every classified failure as a structured event and counts it.
///
/// Retryable failures are logged at `warn`, terminal ones at `error`.
#[derive(Debug, Default)]
pub struct TracingErrorReporter {
    metrics: Arc<ErrorMetrics>,
}

impl TracingErrorReporter {
    pub fn new(metrics: Arc<ErrorMetrics>) -> Self {
        Self { metrics }
    }

    pub fn metrics(&self) -> &Arc<ErrorMetrics> {
        &self.metrics
    }
}

impl ErrorReporter for TracingErrorReporter {
    fn log(&self, err: &CollectionError, device_id: &str) {
        self.metrics.record(err);
        let stream = err.stream();
        let kind = err.kind();
        if err.is_retryable() {
            warn!(stream, kind, device_id, error = %err, "collection failure");
        } else {
            error!(stream, kind, device_id, error = %err, "collection failure");
        }
    }

    fn log_recovered_on_retry(&self, stream: &str, attempt: u32) {
        self.metrics.record_recovery();
        info!(stream, attempt, "storage append recovered on retry");
    }
}

/// Most recent breaker trip seen by [`LoggingAuthFailureHandler`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AuthTripRecord {
    pub paused_until: DateTime<Utc>,
    pub consecutive_failures: u32,
}

/// Logs breaker trips and remembers the last one.
///
/// Hosts that can prompt for re-pairing wrap or replace this handler.
#[derive(Debug, Default)]
pub struct LoggingAuthFailureHandler {
    last_trip: Mutex<Option<AuthTripRecord>>,
}

impl LoggingAuthFailureHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn last_trip(&self) -> Option<AuthTripRecord> {
        *self.last_trip.lock()
    }
}

impl AuthFailureHandler for LoggingAuthFailureHandler {
    fn on_auth_failure(&self, paused_until: DateTime<Utc>, consecutive_failures: u32) {
        error!(
            paused_until = %paused_until.to_rfc3339(),
            consecutive_failures,
            "device credential rejected repeatedly, uploads paused"
        );
        *self.last_trip.lock() = Some(AuthTripRecord { paused_until, consecutive_failures });
    }
}
