//! Upload coordinator
//!
//! One cycle walks the configured streams in order. For each enabled stream
//! with pending entries it builds an envelope from the oldest `batch_size`
//! entries, posts it, and feeds the classified outcome into the
//! [`AuthCircuitBreaker`]. A 401 or transient failure ends the cycle; the
//! remaining streams wait for the next one.
//!
//! Every cycle that is not [`CycleReport::Busy`] ends with a cleanup pass over
//! all configured streams, enabled or not, so delivered entries expire even on
//! streams that have gone quiet or while uploads are paused.
//!
//! Cycles never overlap: a cycle that starts while another is running returns
//! [`CycleReport::Busy`] without touching the queue or the network.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use outpost_common::time::Clock;
use outpost_domain::config::UploadConfig;
use outpost_domain::{BreakerState, CollectionError, EntryId, IngestEnvelope, QueueEntry};
use parking_lot::Mutex;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use super::breaker::{AuthCircuitBreaker, AuthTrip, BackoffState, BreakerPolicy, Gate};
use super::ports::{AuthFailureHandler, IngestOutcome, IngestTransport, UploadStatsSink};
use crate::configuration_ports::ConfigurationProvider;
use crate::error_reporting_ports::ErrorReporter;
use crate::queue::{CheckpointStore, DurableQueue};

/// Per-cycle limits
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UploadSettings {
    /// Maximum entries sent per stream per cycle.
    pub batch_size: usize,
    /// Age after which delivered entries are deleted.
    pub retention: Duration,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self::from(&UploadConfig::default())
    }
}

impl From<&UploadConfig> for UploadSettings {
    fn from(config: &UploadConfig) -> Self {
        Self {
            batch_size: config.batch_size.max(1),
            retention: Duration::from_secs(u64::from(config.retention_days) * 86_400),
        }
    }
}

/// Why a cycle made no network calls
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    Paused { until: DateTime<Utc> },
    BackingOff { until: DateTime<Utc> },
    MissingCredential,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleSummary {
    /// Entries newly marked delivered.
    pub delivered: usize,
    /// Streams for which a batch was posted.
    pub streams_attempted: usize,
    /// Entries whose payload could not be decoded and were left out of the
    /// envelope.
    pub encoding_skipped: usize,
    /// Failure that ended the cycle early.
    pub failure: Option<CollectionError>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleReport {
    /// Another cycle was already running.
    Busy,
    Skipped(SkipReason),
    Completed(CycleSummary),
}

/// Collaborators the coordinator talks to
pub struct UploadPorts {
    pub queue: Arc<dyn DurableQueue>,
    pub checkpoints: Arc<dyn CheckpointStore>,
    pub transport: Arc<dyn IngestTransport>,
    pub config: Arc<dyn ConfigurationProvider>,
    pub stats: Arc<dyn UploadStatsSink>,
    pub auth_handler: Arc<dyn AuthFailureHandler>,
    pub reporter: Arc<dyn ErrorReporter>,
    pub clock: Arc<dyn Clock>,
}

enum StreamOutcome {
    Idle,
    Delivered { delivered: usize, encoding_skipped: usize },
    Failed { error: CollectionError, encoding_skipped: usize },
}

pub struct UploadCoordinator {
    ports: UploadPorts,
    streams: Vec<String>,
    settings: UploadSettings,
    breaker: Mutex<AuthCircuitBreaker>,
    cycle_guard: tokio::sync::Mutex<()>,
}

impl UploadCoordinator {
    pub fn new(
        ports: UploadPorts,
        streams: Vec<String>,
        settings: UploadSettings,
        policy: BreakerPolicy,
    ) -> Self {
        Self {
            ports,
            streams,
            settings,
            breaker: Mutex::new(AuthCircuitBreaker::new(policy)),
            cycle_guard: tokio::sync::Mutex::new(()),
        }
    }

    pub fn streams(&self) -> &[String] {
        &self.streams
    }

    pub fn settings(&self) -> UploadSettings {
        self.settings
    }

    pub fn breaker_state(&self) -> BreakerState {
        self.breaker.lock().breaker_state()
    }

    pub fn backoff_state(&self) -> BackoffState {
        self.breaker.lock().state().clone()
    }

    /// Whether the breaker holds uploads at `now`. Does not lift an expired
    /// pause; that happens at the start of the next cycle.
    pub fn is_paused(&self, now: DateTime<Utc>) -> bool {
        self.breaker.lock().state().paused_until().is_some_and(|until| now < until)
    }

    /// Manually triggered cycle. Shares the guard and breaker with the
    /// scheduled cycles.
    pub async fn sync_now(&self) -> CycleReport {
        info!("manual sync requested");
        self.run_cycle().await
    }

    #[instrument(skip(self))]
    pub async fn run_cycle(&self) -> CycleReport {
        let Ok(_guard) = self.cycle_guard.try_lock() else {
            debug!("upload cycle already running, skipping");
            return CycleReport::Busy;
        };

        let report = self.upload_pending().await;
        self.cleanup_delivered().await;
        report
    }

    async fn upload_pending(&self) -> CycleReport {
        let gate = self.breaker.lock().admit(self.ports.clock.utc_now());
        match gate {
            Gate::Proceed => {}
            Gate::Paused { until } => {
                debug!(paused_until = %until, "uploads paused by auth breaker");
                return CycleReport::Skipped(SkipReason::Paused { until });
            }
            Gate::BackingOff { until } => {
                debug!(retry_not_before = %until, "upload backoff in effect");
                return CycleReport::Skipped(SkipReason::BackingOff { until });
            }
        }

        let Some(credential) = self.ports.config.credential().filter(|c| !c.is_empty()) else {
            warn!("no device credential configured, skipping upload cycle");
            return CycleReport::Skipped(SkipReason::MissingCredential);
        };

        let mut summary = CycleSummary::default();
        for stream in &self.streams {
            if !self.ports.config.is_stream_enabled(stream) {
                continue;
            }

            match self.upload_stream(stream, &credential).await {
                StreamOutcome::Idle => {}
                StreamOutcome::Delivered { delivered, encoding_skipped } => {
                    summary.streams_attempted += 1;
                    summary.delivered += delivered;
                    summary.encoding_skipped += encoding_skipped;
                }
                StreamOutcome::Failed { error, encoding_skipped } => {
                    summary.streams_attempted += 1;
                    summary.encoding_skipped += encoding_skipped;
                    summary.failure = Some(error);
                    break;
                }
            }
        }

        if summary.streams_attempted > 0 {
            info!(
                delivered = summary.delivered,
                streams = summary.streams_attempted,
                failed = summary.failure.is_some(),
                "upload cycle finished"
            );
        }
        CycleReport::Completed(summary)
    }

    async fn upload_stream(&self, stream: &str, credential: &str) -> StreamOutcome {
        let entries = match self.ports.queue.list_pending(stream, self.settings.batch_size).await {
            Ok(entries) => entries,
            Err(err) => {
                self.report(CollectionError::Storage {
                    stream: stream.to_string(),
                    reason: err.to_string(),
                    attempts: 1,
                });
                return StreamOutcome::Idle;
            }
        };
        if entries.is_empty() {
            return StreamOutcome::Idle;
        }

        let ids: Vec<EntryId> = entries.iter().map(|entry| entry.id).collect();
        let (records, encoding_skipped) = self.decode_records(stream, &entries);

        let checkpoint = match self.ports.checkpoints.load_checkpoint(stream).await {
            Ok(checkpoint) => checkpoint,
            Err(err) => {
                warn!(stream, error = %err, "failed to load checkpoint, sending without one");
                None
            }
        };

        let envelope = IngestEnvelope {
            source: self.ports.config.source(),
            stream: stream.to_string(),
            device_id: self.ports.config.device_id(),
            records,
            timestamp: self.ports.clock.utc_now(),
            checkpoint,
        };

        debug!(stream, batch = ids.len(), "posting batch");
        match self.ports.transport.post_batch(&envelope, credential).await {
            IngestOutcome::Accepted(response) => {
                let delivered = match self.ports.queue.mark_delivered(&ids).await {
                    Ok(changed) => changed,
                    Err(err) => {
                        warn!(stream, error = %err, "acknowledged batch could not be marked delivered");
                        0
                    }
                };

                if let Some(next) = response.next_checkpoint.as_deref() {
                    if let Err(err) = self.ports.checkpoints.store_checkpoint(stream, next).await {
                        warn!(stream, error = %err, "failed to store checkpoint");
                    }
                }

                self.breaker.lock().record_success();
                self.ports.stats.record_delivery(stream, delivered, &response);
                StreamOutcome::Delivered { delivered, encoding_skipped }
            }
            IngestOutcome::Unauthorized { reason } => {
                self.record_attempt(stream, &ids).await;
                let trip = self.breaker.lock().record_auth_failure(self.ports.clock.utc_now());
                if let AuthTrip::Tripped { paused_until, consecutive_failures } = trip {
                    self.ports.auth_handler.on_auth_failure(paused_until, consecutive_failures);
                }
                let error = CollectionError::Auth { stream: stream.to_string(), reason };
                self.report(error.clone());
                StreamOutcome::Failed { error, encoding_skipped }
            }
            IngestOutcome::Transient { status, reason } => {
                self.record_attempt(stream, &ids).await;
                let delay =
                    self.breaker.lock().record_transient_failure(self.ports.clock.utc_now());
                debug!(stream, retry_in_secs = delay.as_secs(), "upload deferred");
                let error =
                    CollectionError::TransientNetwork { stream: stream.to_string(), status, reason };
                self.report(error.clone());
                StreamOutcome::Failed { error, encoding_skipped }
            }
        }
    }

    /// Delete delivered entries older than the retention window on every
    /// configured stream.
    async fn cleanup_delivered(&self) {
        for stream in &self.streams {
            match self.ports.queue.cleanup(stream, self.settings.retention).await {
                Ok(0) => {}
                Ok(deleted) => debug!(stream = %stream, deleted, "cleaned up delivered entries"),
                Err(err) => warn!(stream = %stream, error = %err, "cleanup failed"),
            }
        }
    }

    /// Undecodable payloads are reported and left out of the envelope. Their
    /// ids stay in the batch so the acknowledgement retires them.
    fn decode_records(&self, stream: &str, entries: &[QueueEntry]) -> (Vec<Value>, usize) {
        let mut records = Vec::with_capacity(entries.len());
        let mut skipped = 0;
        for entry in entries {
            match serde_json::from_slice::<Value>(&entry.payload) {
                Ok(value) => records.push(value),
                Err(err) => {
                    skipped += 1;
                    self.report(CollectionError::Encoding {
                        stream: stream.to_string(),
                        reason: format!("entry {}: {err}", entry.id),
                    });
                }
            }
        }
        (records, skipped)
    }

    async fn record_attempt(&self, stream: &str, ids: &[EntryId]) {
        if let Err(err) = self.ports.queue.record_attempt(ids).await {
            warn!(stream, error = %err, "failed to record batch attempt");
        }
    }

    fn report(&self, error: CollectionError) {
        self.ports.reporter.log(&error, &self.ports.config.device_id());
    }
}
