//! Scheduled driver for one stream's sampler.
//!
//! The worker owns the stream's schedule handle and repairs itself from its
//! health check: a dead schedule or a silent stream is restarted, a source
//! that stopped capturing is asked to resume. A permission refusal is only
//! reported; it needs the user to act.
//!
//! Stopping flushes the source's partial unit before the schedule is
//! cancelled.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use outpost_common::Scheduler;
use outpost_core::{ConfigurationProvider, HealthCheckable, SampleOutcome, StreamSampler};
use outpost_domain::config::HealthConfig;
use outpost_domain::HealthStatus;
use tracing::{debug, info, instrument, warn};

use super::error::{SchedulerError, SchedulerResult};
use super::slot::ScheduleSlot;

/// Configuration for [`SamplingWorker`]
#[derive(Debug, Clone, Copy)]
pub struct SamplingWorkerConfig {
    /// Longest tolerated gap between answered ticks before the schedule is
    /// restarted.
    pub max_silence: Duration,
}

impl Default for SamplingWorkerConfig {
    fn default() -> Self {
        Self::from(&HealthConfig::default())
    }
}

impl From<&HealthConfig> for SamplingWorkerConfig {
    fn from(config: &HealthConfig) -> Self {
        Self { max_silence: config.max_silence() }
    }
}

pub struct SamplingWorker {
    sampler: Arc<dyn StreamSampler>,
    config: Arc<dyn ConfigurationProvider>,
    scheduler: Scheduler,
    settings: SamplingWorkerConfig,
    slot: ScheduleSlot,
    stopped: AtomicBool,
}

impl SamplingWorker {
    pub fn new(
        sampler: Arc<dyn StreamSampler>,
        config: Arc<dyn ConfigurationProvider>,
        scheduler: Scheduler,
        settings: SamplingWorkerConfig,
    ) -> Self {
        Self {
            sampler,
            config,
            scheduler,
            settings,
            slot: ScheduleSlot::default(),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn stream_name(&self) -> &str {
        self.sampler.stream_name()
    }

    pub fn sampler(&self) -> &Arc<dyn StreamSampler> {
        &self.sampler
    }

    /// Start ticking at the sampler's interval.
    ///
    /// # Errors
    ///
    /// `AlreadyRunning` if the schedule is alive, `Disabled` if the stream is
    /// switched off.
    #[instrument(skip(self), fields(stream = %self.stream_name()))]
    pub async fn start(&self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }
        if !self.config.is_stream_enabled(self.stream_name()) {
            return Err(SchedulerError::Disabled(self.stream_name().to_string()));
        }

        self.stopped.store(false, Ordering::SeqCst);
        self.spawn();
        info!(interval_secs = self.sampler.interval().as_secs(), "sampling worker started");
        Ok(())
    }

    /// Flush the partial unit, then cancel the schedule.
    ///
    /// # Errors
    ///
    /// `NotRunning` if there is no live schedule, `Timeout` if the in-flight
    /// tick does not finish in time.
    #[instrument(skip(self), fields(stream = %self.stream_name()))]
    pub async fn stop(&self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.stopped.store(true, Ordering::SeqCst);
        self.halt().await?;
        info!("sampling worker stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.slot.is_active()
    }

    async fn halt(&self) -> SchedulerResult<()> {
        let outcome = self.sampler.flush().await;
        log_outcome(self.stream_name(), "flush", &outcome);
        self.slot.shutdown().await
    }

    fn spawn(&self) {
        let sampler = Arc::clone(&self.sampler);
        let handle = self.scheduler.schedule(
            format!("sampler:{}", sampler.stream_name()),
            sampler.interval(),
            true,
            move || {
                let sampler = Arc::clone(&sampler);
                async move {
                    let outcome = sampler.tick().await;
                    log_outcome(sampler.stream_name(), "tick", &outcome);
                }
            },
        );
        self.slot.install(handle, self.scheduler.clock().utc_now());
    }

    /// A slow stream gets at least two intervals before it counts as silent.
    fn silence_limit(&self) -> Duration {
        self.settings.max_silence.max(self.sampler.interval().saturating_mul(2))
    }

    fn is_silent(&self) -> bool {
        let reference = self.sampler.last_sample_at().into_iter().chain(self.slot.started_at()).max();
        let Some(reference) = reference else {
            return false;
        };
        let silence =
            (self.scheduler.clock().utc_now() - reference).to_std().unwrap_or(Duration::ZERO);
        silence > self.silence_limit()
    }
}

#[async_trait]
impl HealthCheckable for SamplingWorker {
    fn name(&self) -> String {
        format!("sampler:{}", self.stream_name())
    }

    async fn check(&self) -> HealthStatus {
        let stream = self.stream_name();

        if !self.config.is_stream_enabled(stream) {
            if self.is_running() {
                info!(stream, "stream disabled, stopping sampler");
                if let Err(err) = self.halt().await {
                    warn!(stream, error = %err, "failed to stop disabled sampler");
                }
            }
            return HealthStatus::Disabled;
        }

        if self.stopped.load(Ordering::SeqCst) {
            return HealthStatus::Disabled;
        }

        if !self.slot.is_active() {
            warn!(stream, "sampling schedule missing, restarting");
            self.spawn();
            return HealthStatus::unhealthy("restarting");
        }

        if !self.sampler.is_capturing() {
            warn!(stream, "capture stopped, asking source to resume");
            if let Err(err) = self.sampler.resume_capture().await {
                warn!(stream, error = %err, "capture resume failed");
            }
            return HealthStatus::unhealthy("restarting capture");
        }

        if let Some(capability) = self.sampler.last_permission_error() {
            return HealthStatus::unhealthy(format!("permission denied: {capability}"));
        }

        if self.is_silent() {
            warn!(stream, limit_secs = self.silence_limit().as_secs(), "sampler silent, restarting");
            self.spawn();
            return HealthStatus::unhealthy("restarting");
        }

        HealthStatus::Healthy
    }
}

fn log_outcome(stream: &str, phase: &'static str, outcome: &SampleOutcome) {
    match outcome {
        SampleOutcome::Enqueued(id) => debug!(stream, phase, entry_id = id.0, "sample enqueued"),
        SampleOutcome::Empty => debug!(stream, phase, "no new sample"),
        SampleOutcome::Stale { age } => {
            debug!(stream, phase, age_secs = age.as_secs(), "stale sample discarded");
        }
        SampleOutcome::Dropped(err) => debug!(stream, phase, error = %err, "sample dropped"),
        SampleOutcome::SourceError(err) => debug!(stream, phase, error = %err, "source error"),
    }
}
