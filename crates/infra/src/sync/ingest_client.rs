//! HTTP client for the ingestion endpoint
//!
//! Posts one [`IngestEnvelope`] per call to `{base_url}/ingest` with the
//! device token in the `X-Device-Token` header. A 2xx is success whatever
//! the body says; a body that does not parse as an [`IngestResponse`] yields
//! the default response.

use std::time::Duration;

use async_trait::async_trait;
use outpost_core::{IngestOutcome, IngestTransport};
use outpost_domain::config::UploadConfig;
use outpost_domain::constants::{DEVICE_TOKEN_HEADER, INGEST_PATH};
use outpost_domain::{IngestEnvelope, IngestResponse};
use reqwest::Method;
use tracing::{debug, instrument, warn};
use url::Url;

use super::errors::SyncError;
use crate::http::HttpClient;

/// Configuration for [`IngestClient`]
#[derive(Debug, Clone)]
pub struct IngestClientConfig {
    pub base_url: String,
    pub timeout: Duration,
    pub user_agent: String,
}

impl Default for IngestClientConfig {
    fn default() -> Self {
        Self::from(&UploadConfig::default())
    }
}

impl From<&UploadConfig> for IngestClientConfig {
    fn from(config: &UploadConfig) -> Self {
        Self {
            base_url: config.base_url.clone(),
            timeout: config.request_timeout(),
            user_agent: concat!("outpost/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

pub struct IngestClient {
    http: HttpClient,
    endpoint: Url,
    timeout: Duration,
}

impl IngestClient {
    /// # Errors
    /// `SyncError::Config` when the base URL is not an absolute http(s) URL
    /// or the HTTP client cannot be built.
    pub fn with_config(config: IngestClientConfig) -> Result<Self, SyncError> {
        let endpoint = ingest_endpoint(&config.base_url)?;

        let http = HttpClient::builder()
            .timeout(config.timeout)
            .user_agent(config.user_agent)
            .build()
            .map_err(|e| SyncError::Config(format!("Failed to build HttpClient: {e}")))?;

        Ok(Self { http, endpoint, timeout: config.timeout })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    /// Post `envelope` and return the parsed acknowledgement.
    #[instrument(skip(self, envelope, credential), fields(stream = %envelope.stream, records = envelope.records.len()))]
    pub async fn submit(
        &self,
        envelope: &IngestEnvelope,
        credential: &str,
    ) -> Result<IngestResponse, SyncError> {
        let builder = self
            .http
            .request(Method::POST, self.endpoint.clone())
            .header(DEVICE_TOKEN_HEADER, credential)
            .json(envelope);

        let response = tokio::time::timeout(self.timeout, self.http.send(builder))
            .await
            .map_err(|_| SyncError::Timeout(self.timeout))??;

        let status = response.status();
        let body = response.bytes().await.unwrap_or_default();

        if !status.is_success() {
            let err = SyncError::from_status(status.as_u16(), &String::from_utf8_lossy(&body));
            warn!(status = status.as_u16(), error = %err, "ingest request rejected");
            return Err(err);
        }

        let parsed = if body.is_empty() {
            IngestResponse::default()
        } else {
            serde_json::from_slice(&body).unwrap_or_else(|err| {
                debug!(error = %err, "unparseable ingest response body, treating as accepted");
                IngestResponse::default()
            })
        };
        debug!(accepted = parsed.accepted, rejected = parsed.rejected, "batch acknowledged");
        Ok(parsed)
    }
}

#[async_trait]
impl IngestTransport for IngestClient {
    async fn post_batch(&self, envelope: &IngestEnvelope, credential: &str) -> IngestOutcome {
        match self.submit(envelope, credential).await {
            Ok(response) => IngestOutcome::Accepted(response),
            Err(err) => err.into_outcome(),
        }
    }
}

fn ingest_endpoint(base_url: &str) -> Result<Url, SyncError> {
    let mut base = base_url.trim().to_string();
    if !base.ends_with('/') {
        base.push('/');
    }

    let url = Url::parse(&base)
        .map_err(|e| SyncError::Config(format!("invalid base_url '{base_url}': {e}")))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(SyncError::Config(format!("unsupported base_url scheme '{}'", url.scheme())));
    }

    url.join(INGEST_PATH)
        .map_err(|e| SyncError::Config(format!("invalid ingest endpoint: {e}")))
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn envelope() -> IngestEnvelope {
        IngestEnvelope {
            source: "outpost".into(),
            stream: "heart_rate".into(),
            device_id: "device-1".into(),
            records: vec![json!({"bpm": 64})],
            timestamp: Utc::now(),
            checkpoint: Some("c-1".into()),
        }
    }

    fn client(server: &MockServer) -> IngestClient {
        IngestClient::with_config(IngestClientConfig {
            base_url: format!("{}/api/v1", server.uri()),
            timeout: Duration::from_secs(2),
            ..IngestClientConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn endpoint_is_joined_under_base_path() {
        let url = ingest_endpoint("https://example.com/api/v1").unwrap();
        assert_eq!(url.as_str(), "https://example.com/api/v1/ingest");
        assert!(matches!(ingest_endpoint("ftp://example.com"), Err(SyncError::Config(_))));
        assert!(matches!(ingest_endpoint("not a url"), Err(SyncError::Config(_))));
    }

    #[tokio::test]
    async fn posts_envelope_with_device_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/v1/ingest"))
            .and(header("X-Device-Token", "secret"))
            .and(body_partial_json(json!({
                "source": "outpost",
                "stream": "heart_rate",
                "device_id": "device-1",
                "checkpoint": "c-1",
                "records": [{"bpm": 64}]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "accepted": 1,
                "rejected": 0,
                "next_checkpoint": "c-2",
                "activity_id": "act-9"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let outcome = client(&server).post_batch(&envelope(), "secret").await;

        match outcome {
            IngestOutcome::Accepted(response) => {
                assert_eq!(response.accepted, 1);
                assert_eq!(response.next_checkpoint.as_deref(), Some("c-2"));
                assert_eq!(response.activity_id.as_deref(), Some("act-9"));
            }
            other => panic!("expected accepted, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unparseable_success_body_is_still_accepted() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(202).set_body_string("<html>ok</html>"))
            .mount(&server)
            .await;

        let outcome = client(&server).post_batch(&envelope(), "secret").await;

        assert_eq!(outcome, IngestOutcome::Accepted(IngestResponse::default()));
    }

    #[tokio::test]
    async fn status_401_is_unauthorized() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("token revoked"))
            .mount(&server)
            .await;

        let outcome = client(&server).post_batch(&envelope(), "secret").await;

        assert_eq!(outcome, IngestOutcome::Unauthorized { reason: "token revoked".into() });
    }

    #[tokio::test]
    async fn server_and_forbidden_errors_are_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(403))
            .up_to_n_times(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = client(&server);
        let first = client.post_batch(&envelope(), "secret").await;
        let second = client.post_batch(&envelope(), "secret").await;

        assert!(matches!(first, IngestOutcome::Transient { status: Some(403), .. }));
        assert!(matches!(second, IngestOutcome::Transient { status: Some(500), .. }));
    }

    #[tokio::test]
    async fn slow_server_times_out_as_transient() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_millis(500)))
            .mount(&server)
            .await;

        let client = IngestClient::with_config(IngestClientConfig {
            base_url: server.uri(),
            timeout: Duration::from_millis(50),
            ..IngestClientConfig::default()
        })
        .unwrap();

        let outcome = client.post_batch(&envelope(), "secret").await;

        assert!(matches!(outcome, IngestOutcome::Transient { status: None, .. }));
    }
}
