use async_trait::async_trait;
use outpost_domain::HealthStatus;

/// A subsystem that can check (and repair) itself.
///
/// `check` may restart schedules or resume capture before answering. It must
/// not block on long-running work.
#[async_trait]
pub trait HealthCheckable: Send + Sync {
    fn name(&self) -> String;

    async fn check(&self) -> HealthStatus;
}
