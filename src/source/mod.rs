//! Payload acquisition.
//!
//! Two sources produce [`RawPayload`]s: a local simulator that never fails
//! and a remote JSON endpoint that fails soft. Callers fall back to the
//! simulator when the remote source reports an error.

pub mod remote;
pub mod simulated;
pub mod types;

pub use remote::RemoteSource;
pub use simulated::SimulatedSource;
pub use types::{RawPayload, RawTimestamp};

use crate::config::{DataSourceKind, MonitorConfig};
use chrono::{DateTime, Utc};

/// Errors reported by a payload source.
///
/// Both variants lead to the same fallback action upstream.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SourceError {
    /// Transport failure, timeout, or non-200 status
    #[error("source unavailable: {reason}")]
    Unavailable {
        reason: String,
        /// HTTP status, when the server answered at all
        status: Option<u16>,
    },
    /// The body arrived but was not valid JSON
    #[error("malformed payload: {0}")]
    Malformed(String),
}

impl SourceError {
    pub fn unavailable(reason: impl Into<String>) -> Self {
        SourceError::Unavailable {
            reason: reason.into(),
            status: None,
        }
    }
}

/// The configured source of readings.
#[derive(Debug)]
pub enum PayloadSource {
    Simulated(SimulatedSource),
    Remote(RemoteSource),
}

impl PayloadSource {
    /// Build the source selected by `config`.
    pub fn from_config(config: &MonitorConfig) -> Result<Self, SourceError> {
        match config.source {
            DataSourceKind::Simulated => Ok(PayloadSource::Simulated(SimulatedSource::new(
                config.thresholds,
            ))),
            DataSourceKind::Remote => {
                let url = config.remote_url().unwrap_or_default();
                let remote = RemoteSource::new(url, config.effective_request_timeout())?;
                Ok(PayloadSource::Remote(remote))
            }
        }
    }

    /// Acquire one raw payload.
    pub async fn acquire(&mut self) -> Result<RawPayload, SourceError> {
        self.acquire_at(Utc::now()).await
    }

    /// Acquire one raw payload; simulated readings are stamped with `now`.
    pub async fn acquire_at(&mut self, now: DateTime<Utc>) -> Result<RawPayload, SourceError> {
        match self {
            PayloadSource::Simulated(simulated) => Ok(simulated.generate_at(now)),
            PayloadSource::Remote(remote) => remote.fetch().await,
        }
    }

    pub fn kind(&self) -> DataSourceKind {
        match self {
            PayloadSource::Simulated(_) => DataSourceKind::Simulated,
            PayloadSource::Remote(_) => DataSourceKind::Remote,
        }
    }

    /// Human-readable description for status output.
    pub fn description(&self) -> String {
        match self {
            PayloadSource::Simulated(_) => "Simulated (realistic)".to_string(),
            PayloadSource::Remote(remote) => format!("HTTP JSON ({})", remote.url()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_simulated_source_never_fails() {
        let mut source = PayloadSource::Simulated(SimulatedSource::with_seed(
            crate::config::Thresholds::default(),
            7,
        ));
        for _ in 0..20 {
            assert!(source.acquire().await.is_ok());
        }
        assert_eq!(source.kind(), DataSourceKind::Simulated);
    }

    #[test]
    fn test_from_config_selects_kind() {
        let mut config = MonitorConfig {
            remote_url: None,
            ..MonitorConfig::default()
        };
        let source = PayloadSource::from_config(&config).unwrap();
        assert_eq!(source.kind(), DataSourceKind::Simulated);

        config.source = DataSourceKind::Remote;
        config.remote_url = Some("http://127.0.0.1:1/latest".to_string());
        let source = PayloadSource::from_config(&config).unwrap();
        assert_eq!(source.kind(), DataSourceKind::Remote);
        assert!(source.description().contains("127.0.0.1:1"));
    }

    #[test]
    fn test_error_display() {
        let err = SourceError::unavailable("connection refused");
        assert_eq!(err.to_string(), "source unavailable: connection refused");
        assert!(SourceError::Malformed("eof".to_string())
            .to_string()
            .contains("malformed"));
    }
}
