//! Configuration for the PulseGuard monitor.

use crate::core::alerts::{BreachDirection, DEFAULT_ALERT_CAPACITY};
use crate::core::window::DEFAULT_HORIZON_SECS;
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Upper bound on how long a remote acquisition may block.
pub const MAX_REQUEST_TIMEOUT: Duration = Duration::from_secs(5);

/// Environment variable consulted for the default remote URL.
pub const DATA_URL_ENV: &str = "DATA_URL";

/// Where readings come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataSourceKind {
    /// Locally generated readings
    #[default]
    Simulated,
    /// JSON over HTTP, with simulated fallback
    Remote,
}

impl FromStr for DataSourceKind {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "simulated" | "sim" | "simulation" => Ok(DataSourceKind::Simulated),
            "remote" | "http" | "http-json" => Ok(DataSourceKind::Remote),
            other => Err(ConfigError::Invalid(format!(
                "unknown data source '{other}' (expected simulated or remote)"
            ))),
        }
    }
}

impl std::fmt::Display for DataSourceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DataSourceKind::Simulated => write!(f, "simulated"),
            DataSourceKind::Remote => write!(f, "remote"),
        }
    }
}

/// Heart-rate bands in bpm.
///
/// Only the alert pair decides breaches; the safe pair is the display band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Thresholds {
    pub safe_low: i64,
    pub safe_high: i64,
    pub alert_low: i64,
    pub alert_high: i64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            safe_low: 55,
            safe_high: 100,
            alert_low: 45,
            alert_high: 120,
        }
    }
}

impl Thresholds {
    /// Which alert threshold `bpm` reaches, if any. Both bounds are inclusive.
    pub fn breach(&self, bpm: i64) -> Option<BreachDirection> {
        if bpm >= self.alert_high {
            Some(BreachDirection::High)
        } else if bpm <= self.alert_low {
            Some(BreachDirection::Low)
        } else {
            None
        }
    }

    /// Whether `bpm` lies within the safe display band.
    pub fn in_safe_range(&self, bpm: i64) -> bool {
        (self.safe_low..=self.safe_high).contains(&bpm)
    }
}

/// Main configuration for the monitor. Read-only to the core.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MonitorConfig {
    /// Which source to acquire readings from
    pub source: DataSourceKind,

    /// URL of the remote JSON feed
    pub remote_url: Option<String>,

    /// Safe and alert bands
    pub thresholds: Thresholds,

    /// How long samples stay in the vitals window
    #[serde(with = "duration_serde")]
    pub window_horizon: Duration,

    /// Maximum number of alerts retained
    pub alert_log_capacity: usize,

    /// Cadence of the monitoring tick
    #[serde(with = "duration_serde")]
    pub refresh_interval: Duration,

    /// Remote request timeout (clamped to 5 seconds)
    #[serde(with = "duration_serde")]
    pub request_timeout: Duration,

    /// IANA timezone used for human-readable output
    pub display_timezone: String,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        let remote_url = std::env::var(DATA_URL_ENV)
            .ok()
            .filter(|url| !url.trim().is_empty());

        Self {
            source: DataSourceKind::Simulated,
            remote_url,
            thresholds: Thresholds::default(),
            window_horizon: Duration::from_secs(DEFAULT_HORIZON_SECS),
            alert_log_capacity: DEFAULT_ALERT_CAPACITY,
            refresh_interval: Duration::from_secs(3),
            request_timeout: Duration::from_secs(4),
            display_timezone: "UTC".to_string(),
        }
    }
}

impl MonitorConfig {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, or defaults when it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)?;
        serde_json::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Save configuration to the default location.
    pub fn save(&self) -> Result<(), ConfigError> {
        self.save_to(&Self::config_path())
    }

    /// Save configuration to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)
            .map_err(|e| ConfigError::Serialize(e.to_string()))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("pulseguard")
            .join("config.json")
    }

    /// Reject configurations the core cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let t = &self.thresholds;
        if t.alert_high <= t.alert_low {
            return Err(ConfigError::Invalid(format!(
                "alert_high ({}) must be greater than alert_low ({})",
                t.alert_high, t.alert_low
            )));
        }
        if t.safe_high <= t.safe_low {
            return Err(ConfigError::Invalid(format!(
                "safe_high ({}) must be greater than safe_low ({})",
                t.safe_high, t.safe_low
            )));
        }
        if self.alert_log_capacity == 0 {
            return Err(ConfigError::Invalid(
                "alert_log_capacity must be at least 1".to_string(),
            ));
        }
        if self.window_horizon.is_zero() {
            return Err(ConfigError::Invalid(
                "window_horizon must be non-zero".to_string(),
            ));
        }
        if self.refresh_interval.is_zero() {
            return Err(ConfigError::Invalid(
                "refresh_interval must be non-zero".to_string(),
            ));
        }
        if self.request_timeout.is_zero() {
            return Err(ConfigError::Invalid(
                "request_timeout must be non-zero".to_string(),
            ));
        }
        if self.source == DataSourceKind::Remote && self.remote_url().is_none() {
            return Err(ConfigError::Invalid(
                "remote source selected but no remote_url configured".to_string(),
            ));
        }
        self.display_tz()?;
        Ok(())
    }

    /// The remote URL, ignoring blank values.
    pub fn remote_url(&self) -> Option<&str> {
        self.remote_url
            .as_deref()
            .map(str::trim)
            .filter(|url| !url.is_empty())
    }

    /// Request timeout, never more than [`MAX_REQUEST_TIMEOUT`].
    pub fn effective_request_timeout(&self) -> Duration {
        self.request_timeout.min(MAX_REQUEST_TIMEOUT)
    }

    /// The parsed display timezone.
    pub fn display_tz(&self) -> Result<Tz, ConfigError> {
        self.display_timezone.parse::<Tz>().map_err(|_| {
            ConfigError::Invalid(format!(
                "unknown display timezone '{}'",
                self.display_timezone
            ))
        })
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    Parse(String),
    #[error("Serialize error: {0}")]
    Serialize(String),
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Serde support for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}
