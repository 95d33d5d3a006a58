//! Runtime configuration port

/// Read access to the settings the engine consults on every cycle.
///
/// Implementations must reflect changes made at runtime (for example a
/// stream being switched off) on the next call.
pub trait ConfigurationProvider: Send + Sync {
    fn is_stream_enabled(&self, stream: &str) -> bool;

    fn device_id(&self) -> String;

    /// Device token sent with every upload. `None` until the device is
    /// paired.
    fn credential(&self) -> Option<String>;

    /// Value of the envelope `source` field.
    fn source(&self) -> String;
}
