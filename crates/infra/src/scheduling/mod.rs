//! Scheduled workers
//!
//! Each worker owns one wall-clock schedule from
//! [`outpost_common::Scheduler`] and follows the same lifecycle:
//! - `start()` fails with `AlreadyRunning` while the schedule is alive
//! - `stop()` cancels and waits for the in-flight invocation, bounded by a
//!   join timeout
//! - `is_running()` reports whether the timer task is still alive
//!
//! The sampling and upload workers implement
//! [`outpost_core::HealthCheckable`] and restart their own schedule when the
//! health supervisor finds it dead.

pub mod error;
pub mod health_supervisor;
pub mod sampling_worker;
mod slot;
pub mod upload_worker;

pub use error::{SchedulerError, SchedulerResult};
pub use health_supervisor::{HealthSupervisor, HealthSupervisorConfig};
pub use sampling_worker::{SamplingWorker, SamplingWorkerConfig};
pub use upload_worker::{UploadWorker, UploadWorkerConfig};
