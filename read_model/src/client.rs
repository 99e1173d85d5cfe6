//! HTTP client for the read-model service.

use async_trait::async_trait;
use ballot_types::Tally;
use std::time::Duration;

use crate::{ReadModel, ReadModelError};

/// Default timeout for read-model requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default connection timeout.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Client for a read-model service reachable over HTTP.
///
/// Sends `GET {base_url}/votes` and parses the flat `{candidate: count}` body.
#[derive(Clone)]
pub struct HttpReadModel {
    http_client: reqwest::Client,
    base_url: String,
}

impl HttpReadModel {
    pub fn new(base_url: impl Into<String>) -> Result<Self, ReadModelError> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ReadModelError> {
        let http_client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT.min(timeout))
            .build()
            .map_err(|e| ReadModelError::Unreachable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http_client,
            base_url: base_url.into(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn votes_url(&self) -> String {
        format!("{}/votes", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ReadModel for HttpReadModel {
    fn name(&self) -> &'static str {
        "http"
    }

    async fn fetch_votes(&self) -> Result<Tally, ReadModelError> {
        let url = self.votes_url();
        let response = self.http_client.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                ReadModelError::Unreachable(format!("request timed out: {e}"))
            } else if e.is_connect() {
                ReadModelError::Unreachable(format!("connection failed: {e}"))
            } else {
                ReadModelError::Unreachable(e.to_string())
            }
        })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = upstream_message(&body)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown status").to_string());
            return Err(ReadModelError::Status {
                status: status.as_u16(),
                message,
            });
        }

        let tally: Tally = response.json().await.map_err(|e| {
            ReadModelError::InvalidResponse(format!("failed to parse vote counts: {e}"))
        })?;
        tracing::debug!(url = %url, candidates = tally.len(), "fetched read-model votes");
        Ok(tally)
    }
}

/// The upstream's own error text, if the body is `{"message": "..."}`.
fn upstream_message(body: &str) -> Option<String> {
    let json: serde_json::Value = serde_json::from_str(body).ok()?;
    json.get("message")?.as_str().map(str::to_owned)
}
