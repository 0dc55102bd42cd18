//! Canonical reading types produced by normalization.
//!
//! Every instant stored here is `DateTime<Utc>`: the timezone invariant is
//! carried by the type, so nothing downstream ever compares naive times.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A normalized reading. Immutable once created.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reading {
    /// When the reading was observed (UTC-normalized)
    pub instant: DateTime<Utc>,
    /// Heart rate in beats per minute, absent when the producer sent nothing usable
    pub heart_rate_bpm: Option<i64>,
}

impl Reading {
    pub fn new(instant: DateTime<Utc>, heart_rate_bpm: Option<i64>) -> Self {
        Self {
            instant,
            heart_rate_bpm,
        }
    }

    /// The sample this reading contributes to the vitals window, if any.
    pub fn sample(&self) -> Option<Sample> {
        self.heart_rate_bpm.map(|bpm| Sample::new(self.instant, bpm))
    }
}

/// An `(instant, bpm)` pair held by the vitals window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    pub instant: DateTime<Utc>,
    pub bpm: i64,
}

impl Sample {
    pub fn new(instant: DateTime<Utc>, bpm: i64) -> Self {
        Self { instant, bpm }
    }
}

/// Emergency flag as reported by the producer.
///
/// Informational only: alerting is driven by the configured thresholds,
/// never by this flag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmergencyFlag {
    pub active: bool,
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_reading_without_bpm_has_no_sample() {
        let instant = Utc.with_ymd_and_hms(2024, 1, 22, 10, 0, 0).unwrap();
        assert!(Reading::new(instant, None).sample().is_none());

        let sample = Reading::new(instant, Some(88)).sample().unwrap();
        assert_eq!(sample.instant, instant);
        assert_eq!(sample.bpm, 88);
    }
}
