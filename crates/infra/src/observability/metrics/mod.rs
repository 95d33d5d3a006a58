//! Metrics collection modules
//!
//! Thread-safe counters for the collection and upload paths.

pub mod errors;
pub mod upload;

pub use errors::{ErrorCounts, ErrorMetrics};
pub use upload::{StreamDelivery, UploadMetrics, UploadSnapshot};
