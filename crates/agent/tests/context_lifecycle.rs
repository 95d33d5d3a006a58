//! Integration tests for AppContext lifecycle
//!
//! Builds the full context over a temporary SQLCipher database and a mock
//! ingest server, then drives it through start, sampling, upload and
//! shutdown.

use std::sync::Arc;
use std::time::Duration;

use outpost_agent::sources::SYSTEM_LOAD_STREAM;
use outpost_agent::AppContext;
use outpost_common::testing::TEST_ENCRYPTION_KEY;
use outpost_common::MockClock;
use outpost_core::{CycleReport, DurableQueue, SampleOutcome};
use outpost_domain::{Config, HealthStatus, StreamConfig};
use serde_json::json;
use tempfile::TempDir;
use wiremock::matchers::{body_partial_json, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn test_config(temp_dir: &TempDir, base_url: &str, streams: &[&str]) -> Config {
    let mut config = Config::default();
    config.database.path = temp_dir.path().join("outpost.db").to_string_lossy().to_string();
    config.database.encryption_key = Some(TEST_ENCRYPTION_KEY.to_string());
    config.device.id = "agent-test".into();
    config.device.token = Some("token".into());
    config.upload.base_url = base_url.into();
    config.upload.request_timeout_secs = 5;
    config.streams = streams.iter().map(|name| StreamConfig::new(*name)).collect();
    config
}

fn create_context(config: Config) -> AppContext {
    AppContext::new_with_clock(config, Arc::new(MockClock::new()))
        .expect("AppContext creation should succeed")
}

#[tokio::test(flavor = "multi_thread")]
async fn test_start_and_shutdown_manage_every_worker() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(test_config(&temp_dir, "http://127.0.0.1:9", &[SYSTEM_LOAD_STREAM]));

    assert_eq!(ctx.samplers.len(), 1);
    assert_eq!(ctx.health_registry.live_count(), 3);

    ctx.start().await.expect("start should succeed");
    assert!(ctx.samplers[0].is_running());
    assert!(ctx.upload_worker.is_running());
    assert!(ctx.supervisor.is_running());

    let report = ctx.health_check().await;
    assert!(report.is_healthy, "fresh context should be healthy: {report:?}");
    assert_eq!(report.components.len(), 3);
    let queue = report.components.iter().find(|c| c.name == "queue").expect("queue registered");
    assert_eq!(queue.status, HealthStatus::Healthy);

    let result = tokio::time::timeout(Duration::from_secs(10), ctx.shutdown()).await;
    assert!(result.is_ok(), "shutdown() should complete within 10 seconds");
    assert!(result.unwrap().is_ok());

    assert!(!ctx.samplers[0].is_running());
    assert!(!ctx.upload_worker.is_running());
    assert!(!ctx.supervisor.is_running());
    assert_eq!(ctx.health_registry.live_count(), 0);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_shutdown_without_start_is_ok() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(test_config(&temp_dir, "http://127.0.0.1:9", &[SYSTEM_LOAD_STREAM]));

    assert!(ctx.shutdown().await.is_ok());
}

#[tokio::test(flavor = "multi_thread")]
async fn test_streams_without_source_are_upload_only() {
    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(test_config(
        &temp_dir,
        "http://127.0.0.1:9",
        &[SYSTEM_LOAD_STREAM, "heart_rate"],
    ));

    assert_eq!(ctx.samplers.len(), 1);
    assert_eq!(ctx.samplers[0].stream_name(), SYSTEM_LOAD_STREAM);
    assert_eq!(ctx.coordinator.streams(), [SYSTEM_LOAD_STREAM, "heart_rate"]);
}

#[tokio::test(flavor = "multi_thread")]
async fn test_sampled_load_is_uploaded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/ingest"))
        .and(body_partial_json(json!({
            "stream": SYSTEM_LOAD_STREAM,
            "device_id": "agent-test"
        })))
        .respond_with(ResponseTemplate::new(200))
        .expect(1)
        .mount(&server)
        .await;

    let temp_dir = TempDir::new().unwrap();
    let ctx = create_context(test_config(&temp_dir, &server.uri(), &[SYSTEM_LOAD_STREAM]));
    ctx.start().await.expect("start should succeed");

    let outcome = ctx.samplers[0].sampler().tick().await;
    assert!(matches!(outcome, SampleOutcome::Enqueued(_)), "unexpected outcome {outcome:?}");
    assert_eq!(ctx.queue.pending_count(SYSTEM_LOAD_STREAM).await.unwrap(), 1);

    match ctx.upload_worker.sync_now().await {
        CycleReport::Completed(summary) => assert_eq!(summary.delivered, 1),
        other => panic!("expected completed cycle, got {other:?}"),
    }
    assert_eq!(ctx.queue.pending_count(SYSTEM_LOAD_STREAM).await.unwrap(), 0);
    assert_eq!(ctx.upload_metrics.total_records(), 1);

    ctx.shutdown().await.expect("shutdown should succeed");
}

#[tokio::test(flavor = "multi_thread")]
async fn test_disabled_uploads_report_disabled() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(&temp_dir, "http://127.0.0.1:9", &[SYSTEM_LOAD_STREAM]);
    config.upload.enabled = false;
    let ctx = create_context(config);

    ctx.start().await.expect("start should tolerate disabled uploads");
    assert!(!ctx.upload_worker.is_running());

    let report = ctx.health_check().await;
    let upload = report.components.iter().find(|c| c.name == "upload").expect("upload registered");
    assert_eq!(upload.status, HealthStatus::Disabled);
    assert!(report.is_healthy);

    ctx.shutdown().await.expect("shutdown should succeed");
}

#[test]
fn test_missing_encryption_key_fails_fast() {
    let temp_dir = TempDir::new().unwrap();
    let mut config = test_config(&temp_dir, "http://127.0.0.1:9", &[SYSTEM_LOAD_STREAM]);
    config.database.encryption_key = None;

    assert!(AppContext::new_with_clock(config, Arc::new(MockClock::new())).is_err());
}
