//! Remote JSON source.
//!
//! Issues a time-bounded GET against the configured URL. Every failure is
//! returned as a [`SourceError`] so the caller can fall back to simulated
//! data; nothing here panics or retries.

use crate::config::MAX_REQUEST_TIMEOUT;
use crate::source::types::RawPayload;
use crate::source::SourceError;
use reqwest::StatusCode;
use std::time::Duration;

/// HTTP client for a watch or phone companion feed.
#[derive(Debug, Clone)]
pub struct RemoteSource {
    url: String,
    timeout: Duration,
    client: reqwest::Client,
}

impl RemoteSource {
    /// Create a remote source. `timeout` is clamped to five seconds.
    ///
    /// Idle connections are not pooled: each fetch closes its socket once the
    /// body has been read.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, SourceError> {
        let timeout = timeout.min(MAX_REQUEST_TIMEOUT);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| SourceError::unavailable(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            url: url.into(),
            timeout,
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch the latest payload.
    pub async fn fetch(&self) -> Result<RawPayload, SourceError> {
        if self.url.trim().is_empty() {
            return Err(SourceError::unavailable("no remote URL configured"));
        }

        let response = self.client.get(&self.url).send().await.map_err(|e| {
            if e.is_timeout() {
                SourceError::unavailable(format!("request timed out after {:?}", self.timeout))
            } else {
                SourceError::unavailable(e.to_string())
            }
        })?;

        let status = response.status();
        if status != StatusCode::OK {
            return Err(SourceError::Unavailable {
                reason: format!("HTTP status {status} from data URL"),
                status: Some(status.as_u16()),
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| SourceError::unavailable(format!("failed to read body: {e}")))?;

        RawPayload::from_json_str(&body).map_err(|e| SourceError::Malformed(e.to_string()))
    }
}
