//! Upload path: auth circuit breaker, coordinator and transport ports

pub mod breaker;
pub mod coordinator;
pub mod ports;

pub use breaker::{AuthCircuitBreaker, AuthTrip, BackoffState, BreakerPolicy, Gate};
pub use coordinator::{
    CycleReport, CycleSummary, SkipReason, UploadCoordinator, UploadPorts, UploadSettings,
};
pub use ports::{AuthFailureHandler, IngestOutcome, IngestTransport, UploadStatsSink};
