//! Observability infrastructure
//!
//! Default implementations of the reporting hooks the core calls:
//! - [`TracingErrorReporter`] logs classified failures and counts them
//! - [`LoggingAuthFailureHandler`] logs breaker trips
//! - [`UploadMetrics`] tracks deliveries per stream
//!
//! ## Design Principles
//!
//! 1. **Poison Recovery**: std mutex locks recover from poisoning with an
//!    explicit match and a `warn!`, never `.expect()`.
//!
//! 2. **Memory Ordering**: Acquire/Release for totals read together,
//!    Relaxed for independent counters.

pub mod metrics;
pub mod reporting;

pub use metrics::{ErrorCounts, ErrorMetrics, StreamDelivery, UploadMetrics, UploadSnapshot};
pub use reporting::{AuthTripRecord, LoggingAuthFailureHandler, TracingErrorReporter};
