//! Scripted capture source

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use outpost_core::{CaptureError, CaptureSource, Captured};
use parking_lot::Mutex;
use serde_json::Value;

type Reading = Result<Option<Captured<Value>>, CaptureError>;

/// Returns queued readings in order, then `Ok(None)`.
pub struct ScriptedSource {
    readings: Mutex<VecDeque<Reading>>,
    partial: Mutex<Option<Captured<Value>>>,
    capturing: AtomicBool,
    resumes: AtomicUsize,
}

impl Default for ScriptedSource {
    fn default() -> Self {
        Self {
            readings: Mutex::new(VecDeque::new()),
            partial: Mutex::new(None),
            capturing: AtomicBool::new(true),
            resumes: AtomicUsize::new(0),
        }
    }
}

impl ScriptedSource {
    pub fn push(&self, reading: Reading) {
        self.readings.lock().push_back(reading);
    }

    pub fn push_value(&self, captured: Captured<Value>) {
        self.push(Ok(Some(captured)));
    }

    pub fn set_partial(&self, captured: Captured<Value>) {
        *self.partial.lock() = Some(captured);
    }

    pub fn set_capturing(&self, capturing: bool) {
        self.capturing.store(capturing, Ordering::SeqCst);
    }

    pub fn resume_count(&self) -> usize {
        self.resumes.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CaptureSource for ScriptedSource {
    type Record = Value;

    async fn latest(&self) -> Result<Option<Captured<Value>>, CaptureError> {
        self.readings.lock().pop_front().unwrap_or(Ok(None))
    }

    async fn take_partial(&self) -> Result<Option<Captured<Value>>, CaptureError> {
        Ok(self.partial.lock().take())
    }

    fn is_capturing(&self) -> bool {
        self.capturing.load(Ordering::SeqCst)
    }

    async fn resume(&self) -> Result<(), CaptureError> {
        self.resumes.fetch_add(1, Ordering::SeqCst);
        self.capturing.store(true, Ordering::SeqCst);
        Ok(())
    }
}
