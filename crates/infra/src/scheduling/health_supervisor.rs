//! Periodic health polling.
//!
//! The supervisor only observes: it polls every live registrant and keeps
//! the aggregated report. Repairs happen inside each subsystem's own check.

use std::sync::Arc;
use std::time::Duration;

use outpost_common::Scheduler;
use outpost_core::HealthRegistry;
use outpost_domain::config::HealthConfig;
use outpost_domain::HealthReport;
use tracing::{debug, info, instrument};

use super::error::{SchedulerError, SchedulerResult};
use super::slot::ScheduleSlot;

#[derive(Debug, Clone, Copy)]
pub struct HealthSupervisorConfig {
    pub interval: Duration,
}

impl Default for HealthSupervisorConfig {
    fn default() -> Self {
        Self::from(&HealthConfig::default())
    }
}

impl From<&HealthConfig> for HealthSupervisorConfig {
    fn from(config: &HealthConfig) -> Self {
        Self { interval: config.interval() }
    }
}

pub struct HealthSupervisor {
    registry: Arc<HealthRegistry>,
    scheduler: Scheduler,
    config: HealthSupervisorConfig,
    slot: ScheduleSlot,
}

impl HealthSupervisor {
    pub fn new(
        registry: Arc<HealthRegistry>,
        scheduler: Scheduler,
        config: HealthSupervisorConfig,
    ) -> Self {
        Self { registry, scheduler, config, slot: ScheduleSlot::default() }
    }

    pub fn registry(&self) -> &Arc<HealthRegistry> {
        &self.registry
    }

    #[instrument(skip(self))]
    pub async fn start(&self) -> SchedulerResult<()> {
        if self.is_running() {
            return Err(SchedulerError::AlreadyRunning);
        }

        let registry = Arc::clone(&self.registry);
        let clock = Arc::clone(self.scheduler.clock());
        let handle = self.scheduler.schedule("health", self.config.interval, true, move || {
            let registry = Arc::clone(&registry);
            let clock = Arc::clone(&clock);
            async move {
                let report = registry.poll(clock.utc_now()).await;
                debug!(
                    score = report.score,
                    healthy = report.is_healthy,
                    components = report.components.len(),
                    "health poll complete"
                );
            }
        });
        self.slot.install(handle, self.scheduler.clock().utc_now());

        info!(interval_secs = self.config.interval.as_secs(), "health supervisor started");
        Ok(())
    }

    #[instrument(skip(self))]
    pub async fn stop(&self) -> SchedulerResult<()> {
        if !self.is_running() {
            return Err(SchedulerError::NotRunning);
        }
        self.slot.shutdown().await?;
        info!("health supervisor stopped");
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.slot.is_active()
    }

    /// Poll outside the schedule.
    pub async fn poll_now(&self) -> HealthReport {
        self.registry.poll(self.scheduler.clock().utc_now()).await
    }

    pub fn last_report(&self) -> Option<HealthReport> {
        self.registry.last_report()
    }
}
