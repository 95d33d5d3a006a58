//! Ingest endpoint wire types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::impl_domain_status_conversions;

/// Body of `POST {base_url}/ingest`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IngestEnvelope {
    pub source: String,
    pub stream: String,
    pub device_id: String,
    pub records: Vec<Value>,
    /// Serialized as RFC 3339.
    pub timestamp: DateTime<Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub checkpoint: Option<String>,
}

/// Acknowledgement body. Every field is optional on the wire.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestResponse {
    pub accepted: u64,
    pub rejected: u64,
    pub next_checkpoint: Option<String>,
    pub activity_id: Option<String>,
}

/// Gate position of the auth circuit breaker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BreakerState {
    Active,
    Paused,
}

impl_domain_status_conversions!(BreakerState {
    Active => "active",
    Paused => "paused",
});

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use serde_json::json;

    use super::*;

    #[test]
    fn envelope_omits_missing_checkpoint() {
        let envelope = IngestEnvelope {
            source: "outpost".into(),
            stream: "cpu".into(),
            device_id: "dev-1".into(),
            records: vec![json!({"load": 0.5})],
            timestamp: Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap(),
            checkpoint: None,
        };

        let value = serde_json::to_value(&envelope).expect("serialize envelope");
        assert_eq!(value["timestamp"], "2024-05-01T12:00:00Z");
        assert!(value.get("checkpoint").is_none());
        assert_eq!(value["records"][0]["load"], 0.5);
    }

    #[test]
    fn response_parses_partial_body() {
        let response: IngestResponse =
            serde_json::from_str(r#"{"accepted": 3, "next_checkpoint": "c-42"}"#)
                .expect("parse response");
        assert_eq!(response.accepted, 3);
        assert_eq!(response.rejected, 0);
        assert_eq!(response.next_checkpoint.as_deref(), Some("c-42"));
        assert!(response.activity_id.is_none());
    }

    #[test]
    fn breaker_state_round_trips_label() {
        assert_eq!(BreakerState::Paused.to_string(), "paused");
        assert_eq!("Active".parse::<BreakerState>().unwrap(), BreakerState::Active);
    }
}
