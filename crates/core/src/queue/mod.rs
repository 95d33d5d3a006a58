//! Durable queue port and the bounded-retry enqueue path

pub mod enqueue;
pub mod ports;

pub use enqueue::{EnqueuePolicy, RetryingEnqueuer};
pub use ports::{CheckpointStore, DurableQueue};
