//! Application context - dependency injection container

use std::sync::Arc;

use outpost_common::{Clock, Scheduler, SystemClock};
use outpost_core::{
    BreakerPolicy, EnqueuePolicy, HealthRegistration, HealthRegistry, RetryingEnqueuer,
    UploadCoordinator, UploadPorts, UploadSettings,
};
use outpost_domain::{Config, HealthReport, OutpostError, Result};
use outpost_infra::observability::ErrorMetrics;
use outpost_infra::{
    DbManager, HealthSupervisor, HealthSupervisorConfig, IngestClient, IngestClientConfig,
    LoggingAuthFailureHandler, RuntimeConfigProvider, SamplingWorker, SamplingWorkerConfig,
    SchedulerError, SqlCipherQueueRepository, TracingErrorReporter, UploadMetrics, UploadWorker,
    UploadWorkerConfig,
};
use parking_lot::Mutex;
use tracing::{info, instrument, warn};

use crate::sources::{self, SamplerDeps};

/// Application context - holds all services and workers
pub struct AppContext {
    // Core services
    pub config: Config,
    pub clock: Arc<dyn Clock>,
    pub db: Arc<DbManager>,
    pub queue: Arc<SqlCipherQueueRepository>,
    pub provider: Arc<RuntimeConfigProvider>,
    pub enqueuer: Arc<RetryingEnqueuer>,
    pub coordinator: Arc<UploadCoordinator>,

    // Observability hooks
    pub reporter: Arc<TracingErrorReporter>,
    pub upload_metrics: Arc<UploadMetrics>,
    pub auth_handler: Arc<LoggingAuthFailureHandler>,

    // Workers
    pub samplers: Vec<Arc<SamplingWorker>>,
    pub upload_worker: Arc<UploadWorker>,
    pub health_registry: Arc<HealthRegistry>,
    pub supervisor: Arc<HealthSupervisor>,

    registrations: Mutex<Vec<HealthRegistration>>,
}

impl AppContext {
    /// Load configuration from the environment or a config file and build
    /// the context on the system clock.
    pub fn new() -> Result<Self> {
        let config = outpost_infra::config::load()?;
        Self::new_with_config(config)
    }

    pub fn new_with_config(config: Config) -> Result<Self> {
        Self::new_with_clock(config, Arc::new(SystemClock))
    }

    /// Build every service from `config`. Nothing is scheduled until
    /// [`AppContext::start`].
    pub fn new_with_clock(config: Config, clock: Arc<dyn Clock>) -> Result<Self> {
        outpost_infra::config::validate(&config)?;

        let db = Arc::new(DbManager::new(
            &config.database.path,
            config.database.pool_size,
            config.database.encryption_key.as_deref(),
        )?);
        db.run_migrations()?;

        let queue = Arc::new(SqlCipherQueueRepository::new(Arc::clone(&db), Arc::clone(&clock)));
        let provider = Arc::new(RuntimeConfigProvider::new(config.clone()));
        let reporter = Arc::new(TracingErrorReporter::new(Arc::new(ErrorMetrics::new())));
        let upload_metrics = Arc::new(UploadMetrics::new());
        let auth_handler = Arc::new(LoggingAuthFailureHandler::new());

        let enqueuer = Arc::new(RetryingEnqueuer::new(
            queue.clone(),
            reporter.clone(),
            EnqueuePolicy::from(&config.enqueue),
        ));

        let transport = Arc::new(
            IngestClient::with_config(IngestClientConfig::from(&config.upload))
                .map_err(|e| OutpostError::Config(format!("invalid upload endpoint: {e}")))?,
        );
        let coordinator = Arc::new(UploadCoordinator::new(
            UploadPorts {
                queue: queue.clone(),
                checkpoints: queue.clone(),
                transport,
                config: provider.clone(),
                stats: upload_metrics.clone(),
                auth_handler: auth_handler.clone(),
                reporter: reporter.clone(),
                clock: Arc::clone(&clock),
            },
            config.streams.iter().map(|s| s.name.clone()).collect(),
            UploadSettings::from(&config.upload),
            BreakerPolicy::from(&config.upload),
        ));

        let scheduler = Scheduler::new(Arc::clone(&clock), config.health.max_sleep_slice());

        let deps = SamplerDeps {
            enqueuer: enqueuer.clone(),
            reporter: reporter.clone(),
            config: provider.clone(),
            clock: Arc::clone(&clock),
        };
        let mut samplers = Vec::new();
        for stream in &config.streams {
            match sources::sampler_for(stream, &deps) {
                Some(sampler) => samplers.push(Arc::new(SamplingWorker::new(
                    sampler,
                    provider.clone(),
                    scheduler.clone(),
                    SamplingWorkerConfig::from(&config.health),
                ))),
                None => warn!(
                    stream = %stream.name,
                    "no capture source for stream; pending entries are uploaded only"
                ),
            }
        }

        let upload_worker = Arc::new(UploadWorker::new(
            coordinator.clone(),
            scheduler.clone(),
            UploadWorkerConfig::from(&config.upload),
        ));

        let health_registry = Arc::new(HealthRegistry::new());
        let mut registrations: Vec<HealthRegistration> =
            samplers.iter().map(|worker| health_registry.register(worker)).collect();
        registrations.push(health_registry.register(&upload_worker));
        registrations.push(health_registry.register(&queue));

        let supervisor = Arc::new(HealthSupervisor::new(
            health_registry.clone(),
            scheduler,
            HealthSupervisorConfig::from(&config.health),
        ));

        info!(
            streams = config.streams.len(),
            samplers = samplers.len(),
            db_path = %db.path().display(),
            "application context initialised"
        );

        Ok(Self {
            config,
            clock,
            db,
            queue,
            provider,
            enqueuer,
            coordinator,
            reporter,
            upload_metrics,
            auth_handler,
            samplers,
            upload_worker,
            health_registry,
            supervisor,
            registrations: Mutex::new(registrations),
        })
    }

    /// Start samplers, the upload worker and the health supervisor.
    ///
    /// Workers switched off by configuration are skipped; the supervisor
    /// starts them later if they get enabled.
    #[instrument(skip(self))]
    pub async fn start(&self) -> Result<()> {
        for worker in &self.samplers {
            tolerate_disabled(worker.start().await)?;
        }
        tolerate_disabled(self.upload_worker.start().await)?;
        self.supervisor.start().await?;

        info!("outpost started");
        Ok(())
    }

    /// Stop everything, flushing partial sampler units first.
    ///
    /// Workers that were not running are ignored. Health registrations are
    /// released so the registry holds nothing afterwards.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) -> Result<()> {
        tolerate_not_running(self.supervisor.stop().await)?;
        for worker in &self.samplers {
            tolerate_not_running(worker.stop().await)?;
        }
        tolerate_not_running(self.upload_worker.stop().await)?;

        self.registrations.lock().clear();
        info!("outpost stopped");
        Ok(())
    }

    /// Poll every registered subsystem now.
    pub async fn health_check(&self) -> HealthReport {
        self.supervisor.poll_now().await
    }
}

fn tolerate_disabled(result: std::result::Result<(), SchedulerError>) -> Result<()> {
    match result {
        Ok(()) | Err(SchedulerError::Disabled(_)) | Err(SchedulerError::AlreadyRunning) => Ok(()),
        Err(err) => Err(err.into()),
    }
}

fn tolerate_not_running(result: std::result::Result<(), SchedulerError>) -> Result<()> {
    match result {
        Ok(()) | Err(SchedulerError::NotRunning) => Ok(()),
        Err(err) => Err(err.into()),
    }
}
