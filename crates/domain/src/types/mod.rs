//! Domain types and models

pub mod health;
pub mod ingest;
pub mod queue;

pub use health::{ComponentHealth, HealthReport, HealthStatus};
pub use ingest::{BreakerState, IngestEnvelope, IngestResponse};
pub use queue::{EntryId, QueueEntry, StreamStats};
