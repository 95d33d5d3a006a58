//! Per-stream sampling

pub mod ports;
pub mod sampler;

pub use ports::{CaptureError, CaptureSource, Captured};
pub use sampler::{SampleOutcome, Sampler, StreamSampler};
