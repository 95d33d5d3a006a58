//! Time abstractions
//!
//! - [`clock`]: real and mock clocks (monotonic and wall-clock readings)
//! - [`scheduler`]: periodic/one-shot scheduling on wall-clock deadlines
//!
//! ```rust
//! use std::time::Duration;
//!
//! use outpost_common::time::{Clock, MockClock};
//!
//! let clock = MockClock::new();
//! let before = clock.utc_now();
//! clock.advance(Duration::from_secs(5));
//! assert_eq!((clock.utc_now() - before).num_seconds(), 5);
//! ```

pub mod clock;
pub mod scheduler;

pub use clock::{Clock, MockClock, SystemClock};
pub use scheduler::{ScheduleHandle, Scheduler};
