//! Scheduled driver for the upload coordinator.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use outpost_common::Scheduler;
use outpost_core::{CycleReport, HealthCheckable, UploadCoordinator};
use outpost_domain::config::UploadConfig;
use outpost_domain::HealthStatus;
use tracing::{debug, info, instrument, warn};

use super::error::{SchedulerError, SchedulerResult};
use super::slot::ScheduleSlot;

/// Configuration for [`UploadWorker`]
#[derive(Debug, Clone, Copy)]
pub struct UploadWorkerConfig {
    pub interval: Duration,
    pub enabled: bool,
}

impl Default for UploadWorkerConfig {
    fn default() -> Self {
        Self::from(&UploadConfig::default())
    }
}

impl From<&UploadConfig> for UploadWorkerConfig {
    fn from(config: &UploadConfig) -> Self {
        Self { interval: config.interval(), enabled: config.enabled }
    }
}

pub struct UploadWorker {
    coordinator: Arc<UploadCoordinator>,
    scheduler: Scheduler,
    config: UploadWorkerConfig,
    slot: ScheduleSlot,
    stopped: AtomicBool,
}

impl UploadWorker {
    pub fn new(
        coordinator: Arc<UploadCoordinator>,
        scheduler: Scheduler,
        config: UploadWorkerConfig,
    ) -> Self {
        Self {
            coordinator,
            scheduler,
            config,
            slot: ScheduleSlot::default(),
            stopped: AtomicBool::new(false),
        }
    }

    pub fn coordinator(&self) -> &Arc<UploadCoordinator> {
        &self.coordinator
    }

    /// # Errors
    ///
    /// `AlreadyRunning` if the schedule is alive, `Disabled` if uploads are
    /// switched off.
    #[instrument(skip(self))]
    pub async fn start(&self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }
        if !self.config.enabled {
            return Err(SchedulerError::Disabled("upload".into()));
        }

        self.stopped.store(false, Ordering::SeqCst);
        self.spawn();
        info!(interval_secs = self.config.interval.as_secs(), "upload worker started");
        Ok(())
    }

    /// Cancel the schedule, waiting for a running cycle to finish.
    ///
    /// # Errors
    ///
    /// `NotRunning` if there is no live schedule.
    #[instrument(skip(self))]
    pub async fn stop(&self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }

        self.stopped.store(true, Ordering::SeqCst);
        self.slot.shutdown().await?;
        info!("upload worker stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.slot.is_active()
    }

    /// Run a cycle now, outside the schedule.
    pub async fn sync_now(&self) -> CycleReport {
        self.coordinator.sync_now().await
    }

    fn spawn(&self) {
        let coordinator = Arc::clone(&self.coordinator);
        let handle = self.scheduler.schedule("upload", self.config.interval, true, move || {
            let coordinator = Arc::clone(&coordinator);
            async move {
                log_report(&coordinator.run_cycle().await);
            }
        });
        self.slot.install(handle, self.scheduler.clock().utc_now());
    }
}

#[async_trait]
impl HealthCheckable for UploadWorker {
    fn name(&self) -> String {
        "upload".to_string()
    }

    async fn check(&self) -> HealthStatus {
        if !self.config.enabled || self.stopped.load(Ordering::SeqCst) {
            return HealthStatus::Disabled;
        }

        if !self.slot.is_active() {
            warn!("upload schedule missing, restarting");
            self.spawn();
            return HealthStatus::unhealthy("restarting");
        }

        let now = self.scheduler.clock().utc_now();
        if let Some(until) = self.coordinator.backoff_state().paused_until().filter(|u| now < *u) {
            return HealthStatus::unhealthy(format!(
                "uploads paused after repeated authorization failures until {}",
                until.to_rfc3339()
            ));
        }

        HealthStatus::Healthy
    }
}

fn log_report(report: &CycleReport) {
    match report {
        CycleReport::Busy => debug!("previous upload cycle still running"),
        CycleReport::Skipped(reason) => debug!(?reason, "upload cycle skipped"),
        CycleReport::Completed(summary) if summary.delivered > 0 => info!(
            delivered = summary.delivered,
            streams = summary.streams_attempted,
            "upload cycle delivered records"
        ),
        CycleReport::Completed(summary) => debug!(
            streams = summary.streams_attempted,
            failed = summary.failure.is_some(),
            "upload cycle finished"
        ),
    }
}
