//! Sliding time window of heart-rate samples.
//!
//! Samples are kept in arrival order. Eviction is driven by the wall clock
//! at call time, not by the newest sample, so the window keeps ageing out
//! even when no fresh samples arrive.

use crate::core::reading::{Reading, Sample};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::VecDeque;

/// Default window horizon in seconds (10 minutes).
pub const DEFAULT_HORIZON_SECS: u64 = 600;

/// Descriptive statistics over the samples currently in the window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WindowSummary {
    pub count: usize,
    pub min_bpm: i64,
    pub max_bpm: i64,
    pub mean_bpm: f64,
    /// Sample standard deviation; `None` with fewer than two samples
    pub std_dev_bpm: Option<f64>,
    pub first: DateTime<Utc>,
    pub last: DateTime<Utc>,
}

/// Bounded-by-time buffer of `(instant, bpm)` samples.
#[derive(Debug, Clone)]
pub struct VitalsWindow {
    /// How far back a sample stays visible
    horizon: Duration,
    /// Samples in arrival order
    samples: VecDeque<Sample>,
}

impl VitalsWindow {
    /// Create an empty window with the given horizon.
    pub fn new(horizon: std::time::Duration) -> Self {
        Self {
            horizon: Duration::from_std(horizon).unwrap_or(Duration::MAX),
            samples: VecDeque::new(),
        }
    }

    /// The configured horizon.
    pub fn horizon(&self) -> Duration {
        self.horizon
    }

    /// Earliest instant still inside the window at `now`.
    pub fn cutoff(&self, now: DateTime<Utc>) -> DateTime<Utc> {
        now.checked_sub_signed(self.horizon)
            .unwrap_or(DateTime::<Utc>::MIN_UTC)
    }

    /// Append a sample and evict against the current wall clock.
    pub fn append(&mut self, sample: Sample) {
        self.append_at(sample, Utc::now());
    }

    /// Append a sample, then evict everything older than `now - horizon`.
    ///
    /// The new sample itself is evicted immediately if it is already stale.
    pub fn append_at(&mut self, sample: Sample, now: DateTime<Utc>) {
        self.samples.push_back(sample);
        self.evict_expired(now);
    }

    /// Offer a normalized reading. Readings without a heart rate are dropped.
    ///
    /// Returns the sample if it was appended and survived eviction.
    pub fn offer(&mut self, reading: &Reading, now: DateTime<Utc>) -> Option<Sample> {
        let sample = reading.sample()?;
        self.append_at(sample, now);
        self.samples
            .back()
            .filter(|last| **last == sample)
            .copied()
    }

    /// Drop every sample whose instant is before `now - horizon`.
    ///
    /// Returns the number of samples evicted.
    pub fn evict_expired(&mut self, now: DateTime<Utc>) -> usize {
        let cutoff = self.cutoff(now);
        let before = self.samples.len();
        // Out-of-order remote timestamps rule out popping from the front only.
        self.samples.retain(|sample| sample.instant >= cutoff);
        before - self.samples.len()
    }

    /// Most recently appended sample still in the window.
    pub fn latest(&self) -> Option<Sample> {
        self.samples.back().copied()
    }

    /// Full window contents in arrival order.
    pub fn series(&self) -> Vec<Sample> {
        self.samples.iter().copied().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Sample> {
        self.samples.iter()
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Summary statistics over the window, or `None` when it is empty.
    pub fn summary(&self) -> Option<WindowSummary> {
        let first = self.samples.front()?;
        let last = self.samples.back()?;
        let values: Vec<f64> = self.samples.iter().map(|s| s.bpm as f64).collect();

        Some(WindowSummary {
            count: values.len(),
            min_bpm: Iterator::min(self.samples.iter().map(|s| s.bpm))?,
            max_bpm: Iterator::max(self.samples.iter().map(|s| s.bpm))?,
            mean_bpm: values.iter().mean(),
            std_dev_bpm: (values.len() >= 2).then(|| values.iter().std_dev()),
            first: first.instant,
            last: last.instant,
        })
    }
}

impl Default for VitalsWindow {
    fn default() -> Self {
        Self::new(std::time::Duration::from_secs(DEFAULT_HORIZON_SECS))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 22, 10, 0, 0).unwrap()
    }

    fn ten_minutes() -> VitalsWindow {
        VitalsWindow::new(std::time::Duration::from_secs(600))
    }

    #[test]
    fn test_empty_window() {
        let window = ten_minutes();
        assert!(window.is_empty());
        assert!(window.latest().is_none());
        assert!(window.series().is_empty());
        assert!(window.summary().is_none());
    }

    #[test]
    fn test_append_and_latest() {
        let mut window = ten_minutes();
        window.append_at(Sample::new(t0(), 70), t0());
        window.append_at(Sample::new(t0() + Duration::seconds(3), 74), t0() + Duration::seconds(3));

        assert_eq!(window.len(), 2);
        assert_eq!(window.latest().unwrap().bpm, 74);
        let series: Vec<i64> = window.series().iter().map(|s| s.bpm).collect();
        assert_eq!(series, vec![70, 74]);
    }

    #[test]
    fn test_append_evicts_against_wall_clock() {
        let mut window = ten_minutes();
        let now = Utc::now();
        window.append(Sample::new(now, 80));
        window.append(Sample::new(now - Duration::hours(1), 60));

        assert_eq!(window.len(), 1);
        assert_eq!(window.latest().unwrap().bpm, 80);
    }

    #[test]
    fn test_eviction_uses_call_time() {
        let mut window = ten_minutes();
        window.append_at(Sample::new(t0(), 130), t0());

        let later = t0() + Duration::minutes(11);
        window.append_at(Sample::new(later, 75), later);

        assert_eq!(window.series(), vec![Sample::new(later, 75)]);
    }

    #[test]
    fn test_no_stale_sample_survives() {
        let mut window = ten_minutes();
        let now = t0() + Duration::minutes(30);
        for minute in 0..30 {
            window.append_at(Sample::new(t0() + Duration::minutes(minute), 60 + minute), now);
            let cutoff = window.cutoff(now);
            assert!(window.iter().all(|s| s.instant >= cutoff));
        }
        assert_eq!(window.len(), 10);
    }

    #[test]
    fn test_boundary_sample_is_kept() {
        let mut window = ten_minutes();
        let now = t0() + Duration::minutes(10);
        window.append_at(Sample::new(t0(), 80), now);
        assert_eq!(window.len(), 1);

        assert_eq!(window.evict_expired(now + Duration::milliseconds(1)), 1);
        assert!(window.is_empty());
    }

    #[test]
    fn test_stale_sample_is_evicted_on_arrival() {
        let mut window = ten_minutes();
        let now = t0() + Duration::hours(1);
        let reading = Reading::new(t0(), Some(90));
        assert!(window.offer(&reading, now).is_none());
        assert!(window.is_empty());
    }

    #[test]
    fn test_offer_drops_readings_without_bpm() {
        let mut window = ten_minutes();
        assert!(window.offer(&Reading::new(t0(), None), t0()).is_none());
        assert!(window.is_empty());

        let sample = window.offer(&Reading::new(t0(), Some(66)), t0()).unwrap();
        assert_eq!(sample.bpm, 66);
    }

    #[test]
    fn test_summary() {
        let mut window = ten_minutes();
        for (i, bpm) in [60, 70, 80].into_iter().enumerate() {
            let at = t0() + Duration::seconds(i as i64);
            window.append_at(Sample::new(at, bpm), at);
        }

        let summary = window.summary().unwrap();
        assert_eq!(summary.count, 3);
        assert_eq!(summary.min_bpm, 60);
        assert_eq!(summary.max_bpm, 80);
        assert!((summary.mean_bpm - 70.0).abs() < 1e-9);
        assert!((summary.std_dev_bpm.unwrap() - 10.0).abs() < 1e-9);
        assert_eq!(summary.first, t0());
        assert_eq!(summary.last, t0() + Duration::seconds(2));
    }

    #[test]
    fn test_single_sample_has_no_std_dev() {
        let mut window = ten_minutes();
        window.append_at(Sample::new(t0(), 72), t0());
        assert_eq!(window.summary().unwrap().std_dev_bpm, None);
    }
}
