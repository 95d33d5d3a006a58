//! Configuration management
//!
//! Every section and field has a default, so a config file only needs to
//! name what it overrides.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::constants::{
    DEFAULT_AUTH_FAILURE_THRESHOLD, DEFAULT_BASE_PAUSE_SECS, DEFAULT_BASE_RETRY_DELAY_SECS,
    DEFAULT_ENQUEUE_MAX_ATTEMPTS, DEFAULT_ENQUEUE_RETRY_STEP_MS, DEFAULT_FRESHNESS_SECS,
    DEFAULT_HEALTH_INTERVAL_SECS, DEFAULT_MAX_PAUSE_SECS, DEFAULT_MAX_RETRY_DELAY_SECS,
    DEFAULT_MAX_SILENCE_SECS, DEFAULT_MAX_SLEEP_SLICE_SECS, DEFAULT_REQUEST_TIMEOUT_SECS,
    DEFAULT_RETENTION_DAYS, DEFAULT_SAMPLE_INTERVAL_SECS, DEFAULT_UPLOAD_BATCH_SIZE,
    DEFAULT_UPLOAD_INTERVAL_SECS,
};

/// Application configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub device: DeviceConfig,
    pub database: DatabaseConfig,
    pub upload: UploadConfig,
    pub enqueue: EnqueueConfig,
    pub health: HealthConfig,
    pub streams: Vec<StreamConfig>,
}

impl Config {
    /// Look up a stream section by name.
    pub fn stream(&self, name: &str) -> Option<&StreamConfig> {
        self.streams.iter().find(|s| s.name == name)
    }
}

/// Identity of this device towards the ingestion endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    pub id: String,
    /// Value sent as `source` in every envelope.
    pub source: String,
    #[serde(skip_serializing)]
    pub token: Option<String>,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self { id: "local-device".to_string(), source: "outpost".to_string(), token: None }
    }
}

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: String,
    pub pool_size: u32,
    #[serde(skip_serializing)]
    pub encryption_key: Option<String>,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self { path: "outpost.db".to_string(), pool_size: 4, encryption_key: None }
    }
}

/// Upload coordinator and circuit breaker tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub base_url: String,
    pub enabled: bool,
    pub interval_secs: u64,
    pub batch_size: usize,
    pub request_timeout_secs: u64,
    pub retention_days: u32,
    pub base_retry_delay_secs: u64,
    pub max_retry_delay_secs: u64,
    pub auth_failure_threshold: u32,
    pub base_pause_secs: u64,
    pub max_pause_secs: u64,
}

impl UploadConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:8080".to_string(),
            enabled: true,
            interval_secs: DEFAULT_UPLOAD_INTERVAL_SECS,
            batch_size: DEFAULT_UPLOAD_BATCH_SIZE,
            request_timeout_secs: DEFAULT_REQUEST_TIMEOUT_SECS,
            retention_days: DEFAULT_RETENTION_DAYS,
            base_retry_delay_secs: DEFAULT_BASE_RETRY_DELAY_SECS,
            max_retry_delay_secs: DEFAULT_MAX_RETRY_DELAY_SECS,
            auth_failure_threshold: DEFAULT_AUTH_FAILURE_THRESHOLD,
            base_pause_secs: DEFAULT_BASE_PAUSE_SECS,
            max_pause_secs: DEFAULT_MAX_PAUSE_SECS,
        }
    }
}

/// Bounded-retry enqueue tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EnqueueConfig {
    pub max_attempts: u32,
    pub retry_step_ms: u64,
}

impl Default for EnqueueConfig {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_ENQUEUE_MAX_ATTEMPTS,
            retry_step_ms: DEFAULT_ENQUEUE_RETRY_STEP_MS,
        }
    }
}

/// Health supervisor and scheduler tuning
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HealthConfig {
    pub interval_secs: u64,
    /// A sampler that has not produced a sample for this long is restarted.
    pub max_silence_secs: u64,
    /// Longest uninterrupted sleep of a scheduled task before it re-reads
    /// the wall clock.
    pub max_sleep_slice_secs: u64,
}

impl HealthConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn max_silence(&self) -> Duration {
        Duration::from_secs(self.max_silence_secs)
    }

    pub fn max_sleep_slice(&self) -> Duration {
        Duration::from_secs(self.max_sleep_slice_secs.max(1))
    }
}

impl Default for HealthConfig {
    fn default() -> Self {
        Self {
            interval_secs: DEFAULT_HEALTH_INTERVAL_SECS,
            max_silence_secs: DEFAULT_MAX_SILENCE_SECS,
            max_sleep_slice_secs: DEFAULT_MAX_SLEEP_SLICE_SECS,
        }
    }
}

/// One sampled stream
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamConfig {
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_sample_interval")]
    pub interval_secs: u64,
    /// Samples captured longer ago than this are discarded as stale.
    #[serde(default = "default_freshness")]
    pub freshness_secs: u64,
}

impl StreamConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            enabled: true,
            interval_secs: DEFAULT_SAMPLE_INTERVAL_SECS,
            freshness_secs: DEFAULT_FRESHNESS_SECS,
        }
    }

    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn freshness(&self) -> Duration {
        Duration::from_secs(self.freshness_secs)
    }
}

fn default_true() -> bool {
    true
}

fn default_sample_interval() -> u64 {
    DEFAULT_SAMPLE_INTERVAL_SECS
}

fn default_freshness() -> u64 {
    DEFAULT_FRESHNESS_SECS
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config: Config = serde_json::from_str("{}").expect("parse empty config");
        assert_eq!(config.enqueue.max_attempts, 3);
        assert_eq!(config.enqueue.retry_step_ms, 500);
        assert_eq!(config.upload.auth_failure_threshold, 3);
        assert_eq!(config.upload.base_pause_secs, 3_600);
        assert_eq!(config.upload.max_pause_secs, 86_400);
        assert_eq!(config.health.max_silence_secs, 60);
        assert!(config.streams.is_empty());
    }

    #[test]
    fn partial_toml_overrides_only_named_fields() {
        let config: Config = toml::from_str(
            r#"
[upload]
base_url = "https://ingest.example.com"
batch_size = 25

[[streams]]
name = "cpu"
interval_secs = 5
"#,
        )
        .expect("parse toml");

        assert_eq!(config.upload.base_url, "https://ingest.example.com");
        assert_eq!(config.upload.batch_size, 25);
        assert_eq!(config.upload.interval_secs, DEFAULT_UPLOAD_INTERVAL_SECS);

        let cpu = config.stream("cpu").expect("cpu stream");
        assert!(cpu.enabled);
        assert_eq!(cpu.interval(), Duration::from_secs(5));
        assert_eq!(cpu.freshness_secs, DEFAULT_FRESHNESS_SECS);
    }

    #[test]
    fn secrets_are_not_serialized() {
        let mut config = Config::default();
        config.device.token = Some("secret-token".into());
        config.database.encryption_key = Some("secret-key".into());

        let json = serde_json::to_string(&config).expect("serialize config");
        assert!(!json.contains("secret-token"));
        assert!(!json.contains("secret-key"));
    }

    #[test]
    fn sleep_slice_never_zero() {
        let health = HealthConfig { max_sleep_slice_secs: 0, ..HealthConfig::default() };
        assert_eq!(health.max_sleep_slice(), Duration::from_secs(1));
    }
}
