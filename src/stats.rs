//! Running counters for the monitoring session.
//!
//! Counters are lock-free so the read surface can report them without
//! contending with the tick writer.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Sync statistics for the current session.
#[derive(Debug)]
pub struct SyncStats {
    /// Completed monitoring ticks
    ticks: AtomicU64,
    /// Payloads successfully fetched from the remote source
    remote_successes: AtomicU64,
    /// Ticks that fell back to simulated data
    remote_fallbacks: AtomicU64,
    /// Samples appended to the vitals window
    samples_appended: AtomicU64,
    /// Alerts recorded
    alerts_raised: AtomicU64,
    /// Readings whose heart rate could not be coerced
    invalid_heart_rates: AtomicU64,
    /// Readings stamped with "now" because the timestamp was missing or bad
    defaulted_timestamps: AtomicU64,
    /// Session start time
    session_start: DateTime<Utc>,
}

impl SyncStats {
    pub fn new() -> Self {
        Self {
            ticks: AtomicU64::new(0),
            remote_successes: AtomicU64::new(0),
            remote_fallbacks: AtomicU64::new(0),
            samples_appended: AtomicU64::new(0),
            alerts_raised: AtomicU64::new(0),
            invalid_heart_rates: AtomicU64::new(0),
            defaulted_timestamps: AtomicU64::new(0),
            session_start: Utc::now(),
        }
    }

    pub fn record_tick(&self) {
        self.ticks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_remote_success(&self) {
        self.remote_successes.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_remote_fallback(&self) {
        self.remote_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_sample(&self) {
        self.samples_appended.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_alert(&self) {
        self.alerts_raised.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_invalid_heart_rate(&self) {
        self.invalid_heart_rates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_defaulted_timestamp(&self) {
        self.defaulted_timestamps.fetch_add(1, Ordering::Relaxed);
    }

    /// Get the current statistics.
    pub fn snapshot(&self) -> SyncStatsSnapshot {
        SyncStatsSnapshot {
            ticks: self.ticks.load(Ordering::Relaxed),
            remote_successes: self.remote_successes.load(Ordering::Relaxed),
            remote_fallbacks: self.remote_fallbacks.load(Ordering::Relaxed),
            samples_appended: self.samples_appended.load(Ordering::Relaxed),
            alerts_raised: self.alerts_raised.load(Ordering::Relaxed),
            invalid_heart_rates: self.invalid_heart_rates.load(Ordering::Relaxed),
            defaulted_timestamps: self.defaulted_timestamps.load(Ordering::Relaxed),
            session_start: self.session_start,
            session_duration_secs: (Utc::now() - self.session_start).num_seconds().max(0) as u64,
        }
    }

    /// Get a summary string for display.
    pub fn summary(&self) -> String {
        let stats = self.snapshot();
        format!(
            "Session Statistics:\n\
             - Ticks completed: {}\n\
             - Remote payloads: {}\n\
             - Simulated fallbacks: {}\n\
             - Samples recorded: {}\n\
             - Alerts recorded: {}\n\
             - Invalid heart rates: {}\n\
             - Defaulted timestamps: {}\n\
             - Session duration: {} seconds\n\
             \n\
             Alerts are recorded locally only; nothing is sent to contacts.",
            stats.ticks,
            stats.remote_successes,
            stats.remote_fallbacks,
            stats.samples_appended,
            stats.alerts_raised,
            stats.invalid_heart_rates,
            stats.defaulted_timestamps,
            stats.session_duration_secs
        )
    }
}

impl Default for SyncStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of sync statistics.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncStatsSnapshot {
    pub ticks: u64,
    pub remote_successes: u64,
    pub remote_fallbacks: u64,
    pub samples_appended: u64,
    pub alerts_raised: u64,
    pub invalid_heart_rates: u64,
    pub defaulted_timestamps: u64,
    pub session_start: DateTime<Utc>,
    pub session_duration_secs: u64,
}

/// Thread-safe shared statistics.
pub type SharedSyncStats = Arc<SyncStats>;

/// Create new shared statistics.
pub fn create_shared_stats() -> SharedSyncStats {
    Arc::new(SyncStats::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counting() {
        let stats = SyncStats::new();

        stats.record_tick();
        stats.record_tick();
        stats.record_remote_fallback();
        stats.record_sample();
        stats.record_alert();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.ticks, 2);
        assert_eq!(snapshot.remote_fallbacks, 1);
        assert_eq!(snapshot.remote_successes, 0);
        assert_eq!(snapshot.samples_appended, 1);
        assert_eq!(snapshot.alerts_raised, 1);
    }

    #[test]
    fn test_shared_across_threads() {
        let stats = create_shared_stats();
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let stats = stats.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        stats.record_sample();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(stats.snapshot().samples_appended, 400);
    }

    #[test]
    fn test_summary_format() {
        let stats = SyncStats::new();
        let summary = stats.summary();

        assert!(summary.contains("Ticks completed"));
        assert!(summary.contains("Simulated fallbacks"));
        assert!(summary.contains("recorded locally only"));
    }
}
