use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

use chrono::{DateTime, Utc};
use futures::future::join_all;
use outpost_domain::{ComponentHealth, HealthReport, HealthStatus};
use parking_lot::Mutex;
use tracing::{debug, warn};

use super::ports::HealthCheckable;

/// Identifies one registration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RegistrationId(u64);

struct Registrant {
    id: RegistrationId,
    subsystem: Weak<dyn HealthCheckable>,
}

/// Weakly-held set of health-checkable subsystems.
///
/// The registry never keeps a subsystem alive; entries whose subsystem has
/// been dropped are pruned on the next poll.
pub struct HealthRegistry {
    registrants: Mutex<Vec<Registrant>>,
    next_id: AtomicU64,
    last_report: Mutex<Option<HealthReport>>,
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl HealthRegistry {
    pub fn new() -> Self {
        Self {
            registrants: Mutex::new(Vec::new()),
            next_id: AtomicU64::new(1),
            last_report: Mutex::new(None),
        }
    }

    /// Add `subsystem`. The returned guard unregisters it when dropped.
    pub fn register<T>(self: &Arc<Self>, subsystem: &Arc<T>) -> HealthRegistration
    where
        T: HealthCheckable + 'static,
    {
        let id = RegistrationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let weak: Weak<dyn HealthCheckable> = Arc::downgrade(subsystem) as Weak<dyn HealthCheckable>;
        self.registrants.lock().push(Registrant { id, subsystem: weak });
        debug!(name = %subsystem.name(), ?id, "health check registered");
        HealthRegistration { id, registry: Arc::downgrade(self) }
    }

    /// Returns `false` when `id` was not registered.
    pub fn unregister(&self, id: RegistrationId) -> bool {
        let mut registrants = self.registrants.lock();
        let before = registrants.len();
        registrants.retain(|r| r.id != id);
        registrants.len() != before
    }

    /// Registrants whose subsystem is still alive.
    pub fn live_count(&self) -> usize {
        self.registrants.lock().iter().filter(|r| r.subsystem.strong_count() > 0).count()
    }

    /// Run every live check concurrently and aggregate the results.
    pub async fn poll(&self, now: DateTime<Utc>) -> HealthReport {
        let live: Vec<Arc<dyn HealthCheckable>> = {
            let mut registrants = self.registrants.lock();
            registrants.retain(|r| r.subsystem.strong_count() > 0);
            registrants.iter().filter_map(|r| r.subsystem.upgrade()).collect()
        };

        let components = join_all(live.iter().map(|subsystem| async move {
            ComponentHealth::new(subsystem.name(), subsystem.check().await)
        }))
        .await;

        for component in &components {
            if let HealthStatus::Unhealthy(reason) = &component.status {
                warn!(component = %component.name, reason = %reason, "health check failed");
            }
        }

        let report = HealthReport::from_components(components, now);
        debug!(score = report.score, healthy = report.is_healthy, "health poll complete");
        *self.last_report.lock() = Some(report.clone());
        report
    }

    pub fn last_report(&self) -> Option<HealthReport> {
        self.last_report.lock().clone()
    }
}

/// Registration guard
#[derive(Debug)]
pub struct HealthRegistration {
    id: RegistrationId,
    registry: Weak<HealthRegistry>,
}

impl HealthRegistration {
    pub fn id(&self) -> RegistrationId {
        self.id
    }
}

impl Drop for HealthRegistration {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.unregister(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use async_trait::async_trait;
    use chrono::TimeZone;

    use super::*;

    struct Fixed {
        name: &'static str,
        status: HealthStatus,
    }

    #[async_trait]
    impl HealthCheckable for Fixed {
        fn name(&self) -> String {
            self.name.to_string()
        }

        async fn check(&self) -> HealthStatus {
            self.status.clone()
        }
    }

    fn fixed(name: &'static str, status: HealthStatus) -> Arc<Fixed> {
        Arc::new(Fixed { name, status })
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn poll_scores_excluding_disabled() {
        let registry = Arc::new(HealthRegistry::new());
        let a = fixed("a", HealthStatus::Healthy);
        let b = fixed("b", HealthStatus::Healthy);
        let c = fixed("c", HealthStatus::unhealthy("restarting"));
        let d = fixed("d", HealthStatus::Disabled);
        let _regs: Vec<_> = [
            registry.register(&a),
            registry.register(&b),
            registry.register(&c),
            registry.register(&d),
        ]
        .into();

        let report = registry.poll(now()).await;

        assert_eq!(report.components.len(), 4);
        assert!((report.score - 2.0 / 3.0).abs() < f64::EPSILON);
        assert!(!report.is_healthy);
        assert_eq!(registry.last_report(), Some(report));
    }

    #[tokio::test]
    async fn dropped_subsystems_are_pruned() {
        let registry = Arc::new(HealthRegistry::new());
        let kept = fixed("kept", HealthStatus::Healthy);
        let gone = fixed("gone", HealthStatus::unhealthy("x"));
        let _r1 = registry.register(&kept);
        let _r2 = registry.register(&gone);
        drop(gone);

        assert_eq!(registry.live_count(), 1);
        let report = registry.poll(now()).await;

        assert_eq!(report.components.len(), 1);
        assert_eq!(report.components[0].name, "kept");
        assert!(report.is_healthy);
    }

    #[tokio::test]
    async fn dropping_registration_unregisters() {
        let registry = Arc::new(HealthRegistry::new());
        let subsystem = fixed("s", HealthStatus::Healthy);
        let registration = registry.register(&subsystem);
        let id = registration.id();

        drop(registration);

        assert_eq!(registry.live_count(), 0);
        assert!(!registry.unregister(id));
        assert!(registry.poll(now()).await.components.is_empty());
    }

    #[tokio::test]
    async fn empty_registry_is_healthy() {
        let registry = HealthRegistry::new();
        let report = registry.poll(now()).await;
        assert!(report.is_healthy);
        assert!((report.score - 1.0).abs() < f64::EPSILON);
    }
}
