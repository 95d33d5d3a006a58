//! Recording and scripted collaborators

use std::collections::{HashSet, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use outpost_core::{
    AuthFailureHandler, ConfigurationProvider, ErrorReporter, IngestOutcome, IngestTransport,
    UploadStatsSink,
};
use outpost_domain::{CollectionError, IngestEnvelope, IngestResponse};
use parking_lot::Mutex;

/// Captures every reported error and recovery event.
#[derive(Default)]
pub struct RecordingReporter {
    errors: Mutex<Vec<(CollectionError, String)>>,
    recoveries: Mutex<Vec<(String, u32)>>,
}

impl RecordingReporter {
    pub fn errors(&self) -> Vec<CollectionError> {
        self.errors.lock().iter().map(|(e, _)| e.clone()).collect()
    }

    pub fn device_ids(&self) -> Vec<String> {
        self.errors.lock().iter().map(|(_, d)| d.clone()).collect()
    }

    pub fn recoveries(&self) -> Vec<(String, u32)> {
        self.recoveries.lock().clone()
    }
}

impl ErrorReporter for RecordingReporter {
    fn log(&self, error: &CollectionError, device_id: &str) {
        self.errors.lock().push((error.clone(), device_id.to_string()));
    }

    fn log_recovered_on_retry(&self, stream: &str, attempt: u32) {
        self.recoveries.lock().push((stream.to_string(), attempt));
    }
}

/// Mutable in-memory configuration.
pub struct StaticConfig {
    device_id: String,
    source: String,
    credential: Mutex<Option<String>>,
    disabled: Mutex<HashSet<String>>,
}

impl StaticConfig {
    pub fn new(credential: Option<&str>) -> Self {
        Self {
            device_id: "device-1".into(),
            source: "outpost-test".into(),
            credential: Mutex::new(credential.map(str::to_string)),
            disabled: Mutex::new(HashSet::new()),
        }
    }

    pub fn set_enabled(&self, stream: &str, enabled: bool) {
        let mut disabled = self.disabled.lock();
        if enabled {
            disabled.remove(stream);
        } else {
            disabled.insert(stream.to_string());
        }
    }

    pub fn set_credential(&self, credential: Option<&str>) {
        *self.credential.lock() = credential.map(str::to_string);
    }
}

impl ConfigurationProvider for StaticConfig {
    fn is_stream_enabled(&self, stream: &str) -> bool {
        !self.disabled.lock().contains(stream)
    }

    fn device_id(&self) -> String {
        self.device_id.clone()
    }

    fn credential(&self) -> Option<String> {
        self.credential.lock().clone()
    }

    fn source(&self) -> String {
        self.source.clone()
    }
}

/// Replays queued outcomes; accepts everything once the script runs out.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<IngestOutcome>>,
    calls: Mutex<Vec<(IngestEnvelope, String)>>,
}

impl ScriptedTransport {
    pub fn push(&self, outcome: IngestOutcome) {
        self.script.lock().push_back(outcome);
    }

    pub fn push_unauthorized(&self, times: usize) {
        for _ in 0..times {
            self.push(IngestOutcome::Unauthorized { reason: "invalid device token".into() });
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn envelopes(&self) -> Vec<IngestEnvelope> {
        self.calls.lock().iter().map(|(e, _)| e.clone()).collect()
    }

    pub fn credentials(&self) -> Vec<String> {
        self.calls.lock().iter().map(|(_, c)| c.clone()).collect()
    }
}

#[async_trait]
impl IngestTransport for ScriptedTransport {
    async fn post_batch(&self, envelope: &IngestEnvelope, credential: &str) -> IngestOutcome {
        self.calls.lock().push((envelope.clone(), credential.to_string()));
        self.script.lock().pop_front().unwrap_or_else(|| {
            IngestOutcome::Accepted(IngestResponse {
                accepted: envelope.records.len() as u64,
                ..IngestResponse::default()
            })
        })
    }
}

#[derive(Default)]
pub struct RecordingStats {
    deliveries: Mutex<Vec<(String, usize)>>,
}

impl RecordingStats {
    pub fn deliveries(&self) -> Vec<(String, usize)> {
        self.deliveries.lock().clone()
    }
}

impl UploadStatsSink for RecordingStats {
    fn record_delivery(&self, stream: &str, delivered: usize, _response: &IngestResponse) {
        self.deliveries.lock().push((stream.to_string(), delivered));
    }
}

#[derive(Default)]
pub struct RecordingAuthHandler {
    trips: Mutex<Vec<(DateTime<Utc>, u32)>>,
}

impl RecordingAuthHandler {
    pub fn trips(&self) -> Vec<(DateTime<Utc>, u32)> {
        self.trips.lock().clone()
    }
}

impl AuthFailureHandler for RecordingAuthHandler {
    fn on_auth_failure(&self, paused_until: DateTime<Utc>, consecutive_failures: u32) {
        self.trips.lock().push((paused_until, consecutive_failures));
    }
}
