//! Sampler: pulls one record per tick from a capture source and pushes it
//! through the bounded-retry enqueue path.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use outpost_common::time::Clock;
use outpost_domain::config::StreamConfig;
use outpost_domain::{CollectionError, EntryId};
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::ports::{CaptureError, CaptureSource, Captured};
use crate::configuration_ports::ConfigurationProvider;
use crate::error_reporting_ports::ErrorReporter;
use crate::queue::RetryingEnqueuer;

/// What a single tick (or flush) did
#[derive(Debug, Clone, PartialEq)]
pub enum SampleOutcome {
    Enqueued(EntryId),
    /// Source had no value newer than the last one seen.
    Empty,
    /// Value was older than the freshness threshold and was discarded.
    Stale { age: Duration },
    /// Sample was lost; the error has already been reported.
    Dropped(CollectionError),
    /// Source failed for a reason outside the collection taxonomy.
    SourceError(CaptureError),
}

/// Object-safe view of a sampler used by the scheduling layer.
#[async_trait]
pub trait StreamSampler: Send + Sync {
    fn stream_name(&self) -> &str;

    fn interval(&self) -> Duration;

    async fn tick(&self) -> SampleOutcome;

    /// Persist the source's partial unit, if any.
    async fn flush(&self) -> SampleOutcome;

    fn is_capturing(&self) -> bool;

    async fn resume_capture(&self) -> Result<(), CaptureError>;

    /// Last time a tick got an answer from the source.
    fn last_sample_at(&self) -> Option<DateTime<Utc>>;

    /// Capability named by the most recent permission refusal, cleared by the
    /// next successful read.
    fn last_permission_error(&self) -> Option<String>;
}

#[derive(Debug, Default)]
struct SamplerState {
    last_captured_at: Option<DateTime<Utc>>,
    last_sample_at: Option<DateTime<Utc>>,
    last_permission_error: Option<String>,
}

/// Drives one stream.
pub struct Sampler<S: CaptureSource + ?Sized> {
    stream: StreamConfig,
    source: Arc<S>,
    enqueuer: Arc<RetryingEnqueuer>,
    reporter: Arc<dyn ErrorReporter>,
    config: Arc<dyn ConfigurationProvider>,
    clock: Arc<dyn Clock>,
    state: Mutex<SamplerState>,
}

impl<S: CaptureSource + ?Sized> Sampler<S> {
    pub fn new(
        stream: StreamConfig,
        source: Arc<S>,
        enqueuer: Arc<RetryingEnqueuer>,
        reporter: Arc<dyn ErrorReporter>,
        config: Arc<dyn ConfigurationProvider>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            stream,
            source,
            enqueuer,
            reporter,
            config,
            clock,
            state: Mutex::new(SamplerState::default()),
        }
    }

    fn report(&self, error: CollectionError) -> SampleOutcome {
        self.reporter.log(&error, &self.config.device_id());
        SampleOutcome::Dropped(error)
    }

    fn on_capture_error(&self, err: CaptureError) -> SampleOutcome {
        match err {
            CaptureError::PermissionDenied(capability) => {
                self.state.lock().last_permission_error = Some(capability.clone());
                self.report(CollectionError::Permission {
                    stream: self.stream.name.clone(),
                    capability,
                })
            }
            other => {
                warn!(stream = %self.stream.name, error = %other, "capture source error");
                SampleOutcome::SourceError(other)
            }
        }
    }

    async fn persist(&self, captured: &Captured<S::Record>) -> SampleOutcome {
        let payload = match serde_json::to_vec(&captured.record) {
            Ok(bytes) => bytes,
            Err(err) => {
                return self.report(CollectionError::Encoding {
                    stream: self.stream.name.clone(),
                    reason: err.to_string(),
                });
            }
        };

        match self.enqueuer.enqueue(&self.stream.name, &payload).await {
            Ok(id) => SampleOutcome::Enqueued(id),
            Err(err) => self.report(err),
        }
    }
}

#[async_trait]
impl<S: CaptureSource + ?Sized> StreamSampler for Sampler<S> {
    fn stream_name(&self) -> &str {
        &self.stream.name
    }

    fn interval(&self) -> Duration {
        self.stream.interval()
    }

    async fn tick(&self) -> SampleOutcome {
        let captured = match self.source.latest().await {
            Ok(captured) => captured,
            Err(err) => return self.on_capture_error(err),
        };

        let now = self.clock.utc_now();
        let captured = {
            let mut state = self.state.lock();
            state.last_permission_error = None;
            state.last_sample_at = Some(now);

            let Some(captured) = captured else {
                return SampleOutcome::Empty;
            };
            if state.last_captured_at.is_some_and(|seen| captured.captured_at <= seen) {
                return SampleOutcome::Empty;
            }
            state.last_captured_at = Some(captured.captured_at);
            captured
        };

        let age = (now - captured.captured_at).to_std().unwrap_or(Duration::ZERO);
        if age > self.stream.freshness() {
            debug!(stream = %self.stream.name, age_secs = age.as_secs(), "discarding stale sample");
            return SampleOutcome::Stale { age };
        }

        self.persist(&captured).await
    }

    async fn flush(&self) -> SampleOutcome {
        match self.source.take_partial().await {
            Ok(Some(partial)) => {
                debug!(stream = %self.stream.name, "flushing partial unit");
                self.persist(&partial).await
            }
            Ok(None) => SampleOutcome::Empty,
            Err(err) => self.on_capture_error(err),
        }
    }

    fn is_capturing(&self) -> bool {
        self.source.is_capturing()
    }

    async fn resume_capture(&self) -> Result<(), CaptureError> {
        self.source.resume().await
    }

    fn last_sample_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().last_sample_at
    }

    fn last_permission_error(&self) -> Option<String> {
        self.state.lock().last_permission_error.clone()
    }
}
