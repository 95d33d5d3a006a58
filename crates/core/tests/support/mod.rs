//! Shared test helpers for `outpost-core` integration tests.
//!
//! In-memory implementations of every core port so the collection and
//! upload paths can be exercised without SQLite or HTTP.

#![allow(dead_code)]

pub mod collaborators;
pub mod queue;
pub mod source;

use std::time::Duration;

use chrono::{DateTime, TimeZone, Utc};
use outpost_common::time::MockClock;

pub use collaborators::{
    RecordingAuthHandler, RecordingReporter, RecordingStats, ScriptedTransport, StaticConfig,
};
pub use queue::InMemoryQueue;
pub use source::ScriptedSource;

pub fn epoch() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 3, 1, 8, 0, 0).unwrap()
}

pub fn clock_at_epoch() -> MockClock {
    MockClock::starting_at(epoch())
}

pub fn days(n: u64) -> Duration {
    Duration::from_secs(n * 86_400)
}
