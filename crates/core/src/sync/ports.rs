//! Port interfaces for the upload path

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use outpost_domain::{IngestEnvelope, IngestResponse};

/// Classified result of one batch POST
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IngestOutcome {
    /// 2xx. The body is parsed leniently; an unreadable body yields the
    /// default response.
    Accepted(IngestResponse),
    /// 401.
    Unauthorized { reason: String },
    /// Any other status, transport error or timeout.
    Transient { status: Option<u16>, reason: String },
}

/// Delivers one envelope to the ingestion endpoint.
#[async_trait]
pub trait IngestTransport: Send + Sync {
    async fn post_batch(&self, envelope: &IngestEnvelope, credential: &str) -> IngestOutcome;
}

/// Notified after every acknowledged batch.
pub trait UploadStatsSink: Send + Sync {
    fn record_delivery(&self, stream: &str, delivered: usize, response: &IngestResponse);
}

/// Notified when repeated 401s pause uploads.
pub trait AuthFailureHandler: Send + Sync {
    fn on_auth_failure(&self, paused_until: DateTime<Utc>, consecutive_failures: u32);
}
