//! Health-check registry
//!
//! Subsystems describe themselves through [`HealthCheckable`]; the registry
//! holds them weakly and aggregates their self-checks into a
//! [`HealthReport`](outpost_domain::HealthReport).

pub mod ports;
pub mod registry;

pub use ports::HealthCheckable;
pub use registry::{HealthRegistration, HealthRegistry, RegistrationId};
