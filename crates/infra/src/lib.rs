//! # Outpost Infrastructure
//!
//! Infrastructure implementations of core ports.
//!
//! This crate contains:
//! - The SQLCipher-backed durable queue and checkpoint store
//! - The ingest HTTP client
//! - Scheduled sampling, upload and health workers
//! - Configuration loading and the runtime configuration provider
//! - Default reporting hooks that log through `tracing`
//!
//! ## Architecture
//! - Implements traits defined in `outpost-core`
//! - Depends on `outpost-common`, `outpost-domain` and `outpost-core`
//! - Contains all "impure" code (I/O, timers, network)

pub mod config;
pub mod database;
pub mod errors;
pub mod http;
pub mod observability;
pub mod scheduling;
pub mod sync;

// Re-export commonly used items
pub use config::RuntimeConfigProvider;
pub use database::{DbManager, SqlCipherQueueRepository};
pub use errors::InfraError;
pub use http::HttpClient;
pub use observability::{LoggingAuthFailureHandler, TracingErrorReporter, UploadMetrics};
pub use scheduling::{
    HealthSupervisor, HealthSupervisorConfig, SamplingWorker, SamplingWorkerConfig, SchedulerError,
    SchedulerResult, UploadWorker, UploadWorkerConfig,
};
pub use sync::{IngestClient, IngestClientConfig, SyncError};
