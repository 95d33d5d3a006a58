//! Authorization circuit breaker
//!
//! Tracks consecutive 401 responses and transient-failure backoff for one
//! uploader and decides whether a cycle may touch the network.
//!
//! | From | Event | To |
//! |------|-------|----|
//! | Active | 2xx | Active (all backoff reset) |
//! | Active | non-auth failure | Active (`retry_delay` doubles, auth count reset) |
//! | Active | 401 below threshold | Active (auth count + 1) |
//! | Active | 401 at threshold | Paused until `now + next_pause_duration` |
//! | Paused | admit before `paused_until` | Paused, no network call |
//! | Paused | admit at/after `paused_until` | Active (auth count reset) |
//!
//! All deadlines are wall-clock so a pause survives process suspension.

use std::time::Duration;

use chrono::{DateTime, Utc};
use outpost_domain::config::UploadConfig;
use outpost_domain::BreakerState;
use tracing::{info, warn};

/// Thresholds and delay bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BreakerPolicy {
    pub auth_failure_threshold: u32,
    pub base_retry_delay: Duration,
    pub max_retry_delay: Duration,
    pub base_pause: Duration,
    pub max_pause: Duration,
}

impl Default for BreakerPolicy {
    fn default() -> Self {
        Self::from(&UploadConfig::default())
    }
}

impl From<&UploadConfig> for BreakerPolicy {
    fn from(config: &UploadConfig) -> Self {
        Self {
            auth_failure_threshold: config.auth_failure_threshold.max(1),
            base_retry_delay: Duration::from_secs(config.base_retry_delay_secs),
            max_retry_delay: Duration::from_secs(config.max_retry_delay_secs),
            base_pause: Duration::from_secs(config.base_pause_secs),
            max_pause: Duration::from_secs(config.max_pause_secs),
        }
    }
}

/// Mutable breaker state. `is_paused` holds exactly when `paused_until` is
/// set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackoffState {
    retry_delay: Duration,
    consecutive_auth_failures: u32,
    is_paused: bool,
    paused_until: Option<DateTime<Utc>>,
    next_pause_duration: Duration,
    retry_not_before: Option<DateTime<Utc>>,
}

impl BackoffState {
    fn initial(policy: &BreakerPolicy) -> Self {
        Self {
            retry_delay: policy.base_retry_delay,
            consecutive_auth_failures: 0,
            is_paused: false,
            paused_until: None,
            next_pause_duration: policy.base_pause,
            retry_not_before: None,
        }
    }

    pub fn retry_delay(&self) -> Duration {
        self.retry_delay
    }

    pub fn consecutive_auth_failures(&self) -> u32 {
        self.consecutive_auth_failures
    }

    pub fn is_paused(&self) -> bool {
        self.is_paused
    }

    pub fn paused_until(&self) -> Option<DateTime<Utc>> {
        self.paused_until
    }

    pub fn next_pause_duration(&self) -> Duration {
        self.next_pause_duration
    }

    pub fn retry_not_before(&self) -> Option<DateTime<Utc>> {
        self.retry_not_before
    }
}

/// Admission decision for one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Gate {
    Proceed,
    Paused { until: DateTime<Utc> },
    BackingOff { until: DateTime<Utc> },
}

/// Effect of a recorded 401
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthTrip {
    Counted(u32),
    Tripped { paused_until: DateTime<Utc>, consecutive_failures: u32 },
}

#[derive(Debug, Clone)]
pub struct AuthCircuitBreaker {
    policy: BreakerPolicy,
    state: BackoffState,
}

impl AuthCircuitBreaker {
    pub fn new(policy: BreakerPolicy) -> Self {
        let state = BackoffState::initial(&policy);
        Self { policy, state }
    }

    pub fn policy(&self) -> &BreakerPolicy {
        &self.policy
    }

    pub fn state(&self) -> &BackoffState {
        &self.state
    }

    pub fn breaker_state(&self) -> BreakerState {
        if self.state.is_paused {
            BreakerState::Paused
        } else {
            BreakerState::Active
        }
    }

    /// Decide whether a cycle starting at `now` may make network calls.
    /// Expired pauses are lifted here.
    pub fn admit(&mut self, now: DateTime<Utc>) -> Gate {
        if let Some(until) = self.state.paused_until {
            if now < until {
                return Gate::Paused { until };
            }
            info!(paused_until = %until, "auth pause expired, resuming uploads");
            self.state.is_paused = false;
            self.state.paused_until = None;
            self.state.consecutive_auth_failures = 0;
        }

        match self.state.retry_not_before {
            Some(until) if now < until => Gate::BackingOff { until },
            _ => Gate::Proceed,
        }
    }

    pub fn record_success(&mut self) {
        self.state.retry_delay = self.policy.base_retry_delay;
        self.state.consecutive_auth_failures = 0;
        self.state.next_pause_duration = self.policy.base_pause;
        self.state.retry_not_before = None;
    }

    /// Record a non-auth failure. Returns the delay applied before the next
    /// attempt (the value before doubling).
    pub fn record_transient_failure(&mut self, now: DateTime<Utc>) -> Duration {
        let applied = self.state.retry_delay;
        self.state.retry_not_before = Some(now + to_chrono(applied));
        self.state.retry_delay = (applied * 2).min(self.policy.max_retry_delay);
        self.state.consecutive_auth_failures = 0;
        applied
    }

    pub fn record_auth_failure(&mut self, now: DateTime<Utc>) -> AuthTrip {
        self.state.consecutive_auth_failures += 1;
        let count = self.state.consecutive_auth_failures;
        if count < self.policy.auth_failure_threshold {
            return AuthTrip::Counted(count);
        }

        let pause = self.state.next_pause_duration;
        let paused_until = now + to_chrono(pause);
        self.state.is_paused = true;
        self.state.paused_until = Some(paused_until);
        self.state.next_pause_duration = (pause * 2).min(self.policy.max_pause);

        warn!(
            consecutive_failures = count,
            pause_secs = pause.as_secs(),
            paused_until = %paused_until,
            "auth circuit breaker tripped"
        );
        AuthTrip::Tripped { paused_until, consecutive_failures: count }
    }
}

fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration).unwrap_or(chrono::Duration::MAX)
}
