//! Runtime view of the loaded configuration.

use outpost_core::ConfigurationProvider;
use outpost_domain::Config;
use parking_lot::RwLock;
use tracing::info;

/// [`ConfigurationProvider`] over a [`Config`] that can be changed while the
/// engine runs.
///
/// Streams that are not listed in the configuration count as disabled.
#[derive(Debug)]
pub struct RuntimeConfigProvider {
    config: RwLock<Config>,
}

impl RuntimeConfigProvider {
    pub fn new(config: Config) -> Self {
        Self { config: RwLock::new(config) }
    }

    pub fn snapshot(&self) -> Config {
        self.config.read().clone()
    }

    /// Switch a stream on or off. Returns `false` if the stream is unknown.
    pub fn set_stream_enabled(&self, stream: &str, enabled: bool) -> bool {
        let mut config = self.config.write();
        match config.streams.iter_mut().find(|s| s.name == stream) {
            Some(entry) => {
                entry.enabled = enabled;
                info!(stream, enabled, "stream toggled");
                true
            }
            None => false,
        }
    }

    /// Replace the device token, for example after re-pairing.
    pub fn set_credential(&self, token: Option<String>) {
        self.config.write().device.token = token;
        info!("device credential updated");
    }
}

impl ConfigurationProvider for RuntimeConfigProvider {
    fn is_stream_enabled(&self, stream: &str) -> bool {
        self.config.read().stream(stream).is_some_and(|s| s.enabled)
    }

    fn device_id(&self) -> String {
        self.config.read().device.id.clone()
    }

    fn credential(&self) -> Option<String> {
        self.config.read().device.token.clone()
    }

    fn source(&self) -> String {
        self.config.read().device.source.clone()
    }
}
