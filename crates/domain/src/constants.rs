//! Engine constants
//!
//! Defaults for every tunable knob. `Config` falls back to these when a
//! section or field is omitted.

// Bounded-retry enqueue
pub const DEFAULT_ENQUEUE_MAX_ATTEMPTS: u32 = 3;
pub const DEFAULT_ENQUEUE_RETRY_STEP_MS: u64 = 500;

// Upload cadence and batching
pub const DEFAULT_UPLOAD_INTERVAL_SECS: u64 = 60;
pub const DEFAULT_UPLOAD_BATCH_SIZE: usize = 100;
pub const DEFAULT_REQUEST_TIMEOUT_SECS: u64 = 30;
pub const DEFAULT_RETENTION_DAYS: u32 = 7;

// Transient-failure backoff
pub const DEFAULT_BASE_RETRY_DELAY_SECS: u64 = 5;
pub const DEFAULT_MAX_RETRY_DELAY_SECS: u64 = 300;

// Auth circuit breaker
pub const DEFAULT_AUTH_FAILURE_THRESHOLD: u32 = 3;
pub const DEFAULT_BASE_PAUSE_SECS: u64 = 3_600;
pub const DEFAULT_MAX_PAUSE_SECS: u64 = 86_400;

// Health supervision
pub const DEFAULT_HEALTH_INTERVAL_SECS: u64 = 30;
pub const DEFAULT_MAX_SILENCE_SECS: u64 = 60;
pub const HEALTHY_SCORE_THRESHOLD: f64 = 0.8;

// Sampling
pub const DEFAULT_SAMPLE_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_FRESHNESS_SECS: u64 = 120;

// Scheduler wake-up granularity
pub const DEFAULT_MAX_SLEEP_SLICE_SECS: u64 = 5;

// Wire protocol
pub const DEVICE_TOKEN_HEADER: &str = "X-Device-Token";
pub const INGEST_PATH: &str = "ingest";
