//! Host load capture source backed by `sysinfo`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use outpost_common::Clock;
use outpost_core::{CaptureError, CaptureSource, Captured};
use parking_lot::Mutex;
use serde::Serialize;
use sysinfo::System;
use tracing::debug;

/// One reading of host CPU and memory pressure.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemLoad {
    /// Global CPU usage across all cores, 0-100.
    pub cpu_percent: f32,
    pub memory_used_bytes: u64,
    pub memory_total_bytes: u64,
    /// One-minute load average. Always 0 on Windows.
    pub load_one: f64,
}

/// Reads the host's CPU and memory counters on demand.
///
/// CPU usage is a delta between two refreshes, so the first reading after
/// construction reports 0.
pub struct SystemLoadSource {
    system: Arc<Mutex<System>>,
    clock: Arc<dyn Clock>,
    capturing: AtomicBool,
}

impl SystemLoadSource {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { system: Arc::new(Mutex::new(System::new())), clock, capturing: AtomicBool::new(true) }
    }

    /// Stop producing readings until [`CaptureSource::resume`] is called.
    pub fn pause(&self) {
        self.capturing.store(false, Ordering::SeqCst);
    }

    fn read(system: &Mutex<System>) -> SystemLoad {
        let mut system = system.lock();
        system.refresh_cpu_usage();
        system.refresh_memory();

        SystemLoad {
            cpu_percent: system.global_cpu_usage(),
            memory_used_bytes: system.used_memory(),
            memory_total_bytes: system.total_memory(),
            load_one: System::load_average().one,
        }
    }
}

#[async_trait]
impl CaptureSource for SystemLoadSource {
    type Record = SystemLoad;

    async fn latest(&self) -> Result<Option<Captured<SystemLoad>>, CaptureError> {
        if !self.is_capturing() {
            return Ok(None);
        }

        let system = Arc::clone(&self.system);
        let reading = tokio::task::spawn_blocking(move || Self::read(&system))
            .await
            .map_err(|e| CaptureError::Failed(format!("system load task failed: {e}")))?;

        Ok(Some(Captured::new(reading, self.clock.utc_now())))
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    async fn resume(&self) -> Result<(), CaptureError> {
        debug!("resuming system load capture");
        self.capturing.store(true, Ordering::SeqCst);
        Ok(())
    }
}
