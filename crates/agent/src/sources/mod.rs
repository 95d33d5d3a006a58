//! Capture sources shipped with the agent
//!
//! A stream gets a sampler only when a source is known for its name.
//! Streams without one are still uploaded, so entries written by other
//! producers into the same queue are delivered.

pub mod system;

use std::sync::Arc;

use outpost_common::Clock;
use outpost_core::{ConfigurationProvider, ErrorReporter, RetryingEnqueuer, Sampler, StreamSampler};
use outpost_domain::StreamConfig;

pub use system::{SystemLoad, SystemLoadSource};

/// Stream name served by [`SystemLoadSource`].
pub const SYSTEM_LOAD_STREAM: &str = "system_load";

/// Shared collaborators every sampler is built from.
#[derive(Clone)]
pub struct SamplerDeps {
    pub enqueuer: Arc<RetryingEnqueuer>,
    pub reporter: Arc<dyn ErrorReporter>,
    pub config: Arc<dyn ConfigurationProvider>,
    pub clock: Arc<dyn Clock>,
}

/// Build the sampler for `stream`, or `None` when no source serves it.
pub fn sampler_for(stream: &StreamConfig, deps: &SamplerDeps) -> Option<Arc<dyn StreamSampler>> {
    match stream.name.as_str() {
        SYSTEM_LOAD_STREAM => {
            let source = Arc::new(SystemLoadSource::new(Arc::clone(&deps.clock)));
            Some(Arc::new(Sampler::new(
                stream.clone(),
                source,
                Arc::clone(&deps.enqueuer),
                Arc::clone(&deps.reporter),
                Arc::clone(&deps.config),
                Arc::clone(&deps.clock),
            )))
        }
        _ => None,
    }
}
