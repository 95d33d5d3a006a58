#![allow(dead_code)]

use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use outpost_common::testing::TEST_ENCRYPTION_KEY;
use outpost_common::MockClock;
use outpost_core::{
    BreakerPolicy, EnqueuePolicy, RetryingEnqueuer, UploadCoordinator, UploadPorts, UploadSettings,
};
use outpost_domain::{Config, StreamConfig};
use outpost_infra::observability::ErrorMetrics;
use outpost_infra::{
    DbManager, IngestClient, IngestClientConfig, LoggingAuthFailureHandler, RuntimeConfigProvider,
    SqlCipherQueueRepository, TracingErrorReporter, UploadMetrics,
};
use tempfile::TempDir;

pub const TOKEN: &str = "device-token";

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).single().expect("valid epoch")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt().with_test_writer().with_env_filter("debug").try_init();
}

/// Temporary migrated database that lives as long as the value.
pub struct TestDatabase {
    pub manager: Arc<DbManager>,
    _temp_dir: TempDir,
}

impl TestDatabase {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir should be created");
        let db_path = temp_dir.path().join("outpost.db");

        let manager = DbManager::new(&db_path, 4, Some(TEST_ENCRYPTION_KEY))
            .expect("db manager should be created");
        manager.run_migrations().expect("migrations should run");

        Self { manager: Arc::new(manager), _temp_dir: temp_dir }
    }

    pub fn count(&self, sql: &str) -> i64 {
        let conn = self.manager.get_connection().expect("connection available");
        conn.query_row(sql, [], |row| row.get(0)).expect("count query succeeds")
    }
}

/// Real queue, client and reporting hooks wired to one coordinator.
pub struct UploadHarness {
    pub db: TestDatabase,
    pub clock: MockClock,
    pub queue: Arc<SqlCipherQueueRepository>,
    pub enqueuer: Arc<RetryingEnqueuer>,
    pub provider: Arc<RuntimeConfigProvider>,
    pub reporter: Arc<TracingErrorReporter>,
    pub metrics: Arc<UploadMetrics>,
    pub auth: Arc<LoggingAuthFailureHandler>,
    pub coordinator: Arc<UploadCoordinator>,
}

pub fn config_for(base_url: &str, streams: &[&str]) -> Config {
    let mut config = Config::default();
    config.device.id = "device-1".into();
    config.device.source = "outpost-test".into();
    config.device.token = Some(TOKEN.into());
    config.upload.base_url = base_url.into();
    config.upload.request_timeout_secs = 5;
    config.streams = streams.iter().map(|name| StreamConfig::new(*name)).collect();
    config
}

impl UploadHarness {
    pub fn new(base_url: &str, streams: &[&str]) -> Self {
        Self::with_config(config_for(base_url, streams))
    }

    pub fn with_config(config: Config) -> Self {
        init_tracing();
        let db = TestDatabase::new();
        let clock = MockClock::starting_at(epoch());

        let queue = Arc::new(SqlCipherQueueRepository::new(
            Arc::clone(&db.manager),
            Arc::new(clock.clone()),
        ));
        let reporter = Arc::new(TracingErrorReporter::new(Arc::new(ErrorMetrics::new())));
        let enqueuer = Arc::new(RetryingEnqueuer::new(
            queue.clone(),
            reporter.clone(),
            EnqueuePolicy::from(&config.enqueue),
        ));
        let transport = Arc::new(
            IngestClient::with_config(IngestClientConfig::from(&config.upload))
                .expect("ingest client builds"),
        );
        let provider = Arc::new(RuntimeConfigProvider::new(config.clone()));
        let metrics = Arc::new(UploadMetrics::new());
        let auth = Arc::new(LoggingAuthFailureHandler::new());

        let coordinator = Arc::new(UploadCoordinator::new(
            UploadPorts {
                queue: queue.clone(),
                checkpoints: queue.clone(),
                transport,
                config: provider.clone(),
                stats: metrics.clone(),
                auth_handler: auth.clone(),
                reporter: reporter.clone(),
                clock: Arc::new(clock.clone()),
            },
            config.streams.iter().map(|s| s.name.clone()).collect(),
            UploadSettings::from(&config.upload),
            BreakerPolicy::from(&config.upload),
        ));

        Self { db, clock, queue, enqueuer, provider, reporter, metrics, auth, coordinator }
    }

    pub async fn enqueue_json(&self, stream: &str, value: serde_json::Value) {
        let payload = serde_json::to_vec(&value).expect("json encodes");
        self.enqueuer.enqueue(stream, &payload).await.expect("enqueue succeeds");
    }
}
