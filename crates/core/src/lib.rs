//! # Outpost Core
//!
//! Collection-and-sync logic with no infrastructure dependencies.
//!
//! This crate contains:
//! - Port interfaces (traits) for the durable queue, capture sources, the
//!   ingest transport and the collaborator hooks
//! - Bounded-retry enqueue, the sampler, the auth circuit breaker, the upload
//!   coordinator and the health registry
//!
//! ## Architecture Principles
//! - Only depends on `outpost-common` and `outpost-domain`
//! - No database, HTTP, or platform code
//! - All external dependencies via traits

pub mod health;
pub mod queue;
pub mod sampling;
pub mod sync;

// Collaborator ports
pub mod configuration_ports;
pub mod error_reporting_ports;

pub use configuration_ports::ConfigurationProvider;
pub use error_reporting_ports::ErrorReporter;
pub use health::{HealthCheckable, HealthRegistration, HealthRegistry, RegistrationId};
pub use queue::{CheckpointStore, DurableQueue, EnqueuePolicy, RetryingEnqueuer};
pub use sampling::{CaptureError, CaptureSource, Captured, SampleOutcome, Sampler, StreamSampler};
pub use sync::{
    AuthCircuitBreaker, AuthFailureHandler, AuthTrip, BackoffState, BreakerPolicy, CycleReport,
    CycleSummary, Gate, IngestOutcome, IngestTransport, SkipReason, UploadCoordinator,
    UploadPorts, UploadSettings, UploadStatsSink,
};
