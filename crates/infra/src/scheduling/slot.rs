use std::time::Duration;

use chrono::{DateTime, Utc};
use outpost_common::ScheduleHandle;
use parking_lot::Mutex;

use super::error::{SchedulerError, SchedulerResult};

const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Default)]
struct SlotState {
    handle: Option<ScheduleHandle>,
    started_at: Option<DateTime<Utc>>,
}

/// Holds the schedule a worker currently owns.
///
/// Installing a new handle drops, and therefore cancels, the previous one.
#[derive(Debug, Default)]
pub(crate) struct ScheduleSlot {
    state: Mutex<SlotState>,
}

impl ScheduleSlot {
    pub(crate) fn install(&self, handle: ScheduleHandle, started_at: DateTime<Utc>) {
        let mut state = self.state.lock();
        state.handle = Some(handle);
        state.started_at = Some(started_at);
    }

    pub(crate) fn is_active(&self) -> bool {
        self.state.lock().handle.as_ref().is_some_and(ScheduleHandle::is_active)
    }

    pub(crate) fn started_at(&self) -> Option<DateTime<Utc>> {
        self.state.lock().started_at
    }

    /// Cancel the schedule and wait for an in-flight invocation to finish.
    pub(crate) async fn shutdown(&self) -> SchedulerResult<()> {
        let handle = self.state.lock().handle.take();
        let Some(handle) = handle else {
            return Ok(());
        };

        tokio::time::timeout(JOIN_TIMEOUT, handle.shutdown())
            .await
            .map_err(|_| SchedulerError::Timeout { seconds: JOIN_TIMEOUT.as_secs() })
    }
}
