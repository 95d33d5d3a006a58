//! Suspension-resistant scheduling.
//!
//! Deadlines are computed on the wall clock and the timer task never sleeps
//! longer than `max_sleep_slice` before re-reading it. A host suspension that
//! freezes the monotonic clock therefore delays a tick by at most one slice
//! once the process resumes.
//!
//! Ticks missed while suspended are coalesced: the schedule fires a single
//! catch-up tick and is rebased onto the current time.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use super::clock::Clock;

const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// Spawns wall-clock driven timer tasks on the tokio runtime.
#[derive(Clone)]
pub struct Scheduler {
    clock: Arc<dyn Clock>,
    max_sleep_slice: Duration,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler").field("max_sleep_slice", &self.max_sleep_slice).finish()
    }
}

impl Scheduler {
    pub fn new(clock: Arc<dyn Clock>, max_sleep_slice: Duration) -> Self {
        Self { clock, max_sleep_slice: max_sleep_slice.max(MIN_INTERVAL) }
    }

    pub fn clock(&self) -> &Arc<dyn Clock> {
        &self.clock
    }

    /// Run `handler` after `interval`, and every `interval` afterwards when
    /// `repeating` is set.
    ///
    /// Invocations of one schedule never overlap: the next deadline is only
    /// evaluated after the previous invocation returned. Must be called from
    /// within a tokio runtime.
    pub fn schedule<F, Fut>(
        &self,
        name: impl Into<String>,
        interval: Duration,
        repeating: bool,
        handler: F,
    ) -> ScheduleHandle
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = name.into();
        let interval = interval.max(MIN_INTERVAL);
        let token = CancellationToken::new();
        let first_deadline = self.clock.utc_now() + to_chrono(interval);

        let task = tokio::spawn(run_schedule(
            self.clock.clone(),
            self.max_sleep_slice,
            name.clone(),
            interval,
            repeating,
            first_deadline,
            token.clone(),
            handler,
        ));

        debug!(schedule = %name, interval_ms = interval.as_millis() as u64, repeating, "schedule started");

        ScheduleHandle { name, token, task: Some(task) }
    }

    /// Cancel a schedule. Idempotent.
    pub fn cancel(&self, handle: &ScheduleHandle) {
        handle.cancel();
    }
}

/// Owner of one scheduled timer task.
///
/// Dropping the handle cancels the schedule.
#[derive(Debug)]
pub struct ScheduleHandle {
    name: String,
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl ScheduleHandle {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Stop future ticks. An invocation already in progress runs to
    /// completion.
    pub fn cancel(&self) {
        if !self.token.is_cancelled() {
            debug!(schedule = %self.name, "schedule cancelled");
            self.token.cancel();
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// `true` while the timer task is alive and has not been cancelled.
    ///
    /// A handler panic ends the task, so a dead schedule reports `false`
    /// even though nobody cancelled it.
    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled() && self.task.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Cancel and wait for the timer task (and any in-flight invocation) to
    /// finish.
    pub async fn shutdown(mut self) {
        self.cancel();
        if let Some(task) = self.task.take() {
            if let Err(err) = task.await {
                debug!(schedule = %self.name, error = %err, "schedule task ended abnormally");
            }
        }
    }
}

impl Drop for ScheduleHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

#[allow(clippy::too_many_arguments)]
async fn run_schedule<F, Fut>(
    clock: Arc<dyn Clock>,
    max_sleep_slice: Duration,
    name: String,
    interval: Duration,
    repeating: bool,
    mut deadline: DateTime<Utc>,
    token: CancellationToken,
    handler: F,
) where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let step = to_chrono(interval);

    loop {
        let now = clock.utc_now();
        if now < deadline {
            let remaining = (deadline - now).to_std().unwrap_or(Duration::ZERO);
            let nap = remaining.min(max_sleep_slice);
            tokio::select! {
                () = token.cancelled() => break,
                () = tokio::time::sleep(nap) => continue,
            }
        }

        if token.is_cancelled() {
            break;
        }

        trace!(schedule = %name, "tick");
        handler().await;

        if !repeating || token.is_cancelled() {
            break;
        }

        let now = clock.utc_now();
        deadline += step;
        if deadline <= now {
            let behind_ms = (now - deadline).num_milliseconds().max(0);
            let step_ms = step.num_milliseconds().max(1);
            debug!(schedule = %name, skipped = behind_ms / step_ms + 1, "coalescing missed ticks");
            deadline = now + step;
        }
    }

    debug!(schedule = %name, "schedule stopped");
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}
