//! The monitoring cycle and the state it owns.
//!
//! One [`MonitorLoop::tick`] runs `Idle → Acquiring → Normalizing → Updating
//! → Idle`. The loop holds the only write path into [`MonitorState`]; the
//! read surface goes through the shared lock and never blocks a tick for
//! longer than a read.
//!
//! ```no_run
//! use pulseguard_monitor::{MonitorConfig, MonitorLoop};
//!
//! # async fn demo() -> Result<(), pulseguard_monitor::SourceError> {
//! let config = MonitorConfig::default();
//! let mut monitor = MonitorLoop::new(&config)?;
//! let report = monitor.tick().await;
//! println!("{:?} bpm", report.reading.heart_rate_bpm);
//! # Ok(())
//! # }
//! ```

use crate::config::{MonitorConfig, Thresholds};
use crate::core::alerts::{AlertEvent, AlertLog};
use crate::core::normalizer::{normalize, NormalizationIssue, NormalizedPayload};
use crate::core::panels::{PanelSnapshot, PanelState};
use crate::core::reading::{EmergencyFlag, Reading, Sample};
use crate::core::window::{VitalsWindow, WindowSummary};
use crate::source::{PayloadSource, SimulatedSource, SourceError};
use crate::stats::{create_shared_stats, SharedSyncStats};
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Number of alerts shown in the dashboard view.
pub const RECENT_ALERTS_SHOWN: usize = 5;

/// Phase of the monitoring cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TickPhase {
    Idle,
    Acquiring,
    Normalizing,
    Updating,
}

/// Where a tick's payload came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadOrigin {
    /// Configured simulated source
    Simulated,
    /// Configured remote source
    Remote,
    /// Remote source failed; simulated data substituted for this tick
    Fallback,
}

/// What one tick did.
#[derive(Debug, Clone, Serialize)]
pub struct TickReport {
    pub origin: PayloadOrigin,
    /// Why the remote source was bypassed, for fallback ticks
    pub fallback_reason: Option<String>,
    pub reading: Reading,
    /// Sample appended to the window, if it survived eviction
    pub sample: Option<Sample>,
    pub alert: Option<AlertEvent>,
    pub emergency: EmergencyFlag,
    pub issues: Vec<NormalizationIssue>,
    pub synced_at: DateTime<Utc>,
}

/// Result of the updating phase.
#[derive(Debug, Clone, PartialEq)]
pub struct UpdateOutcome {
    pub sample: Option<Sample>,
    pub alert: Option<AlertEvent>,
}

/// Everything the presentation layer needs, in one serializable value.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardView {
    pub instance_id: Uuid,
    pub generated_at: DateTime<Utc>,
    pub current_bpm: Option<i64>,
    /// Whether the current reading lies in the safe display band
    pub current_in_safe_range: Option<bool>,
    pub emergency_active: bool,
    /// Emergency flag as sent by the producer with the last payload
    pub reported_emergency: EmergencyFlag,
    pub series: Vec<Sample>,
    pub summary: Option<WindowSummary>,
    /// Most recent first
    pub recent_alerts: Vec<AlertEvent>,
    /// Alerts whose time falls inside the window horizon
    pub alerts_in_horizon: usize,
    pub alert_log_len: usize,
    pub alert_log_capacity: usize,
    pub panels: PanelSnapshot,
    pub last_sync: Option<DateTime<Utc>>,
    pub thresholds: Thresholds,
}

/// The monitor's owned state: vitals window, alert log and panels.
#[derive(Debug, Clone)]
pub struct MonitorState {
    instance_id: Uuid,
    thresholds: Thresholds,
    window: VitalsWindow,
    alerts: AlertLog,
    panels: PanelState,
    last_sync: Option<DateTime<Utc>>,
    last_emergency: EmergencyFlag,
}

impl MonitorState {
    pub fn new(config: &MonitorConfig) -> Self {
        Self {
            instance_id: Uuid::new_v4(),
            thresholds: config.thresholds,
            window: VitalsWindow::new(config.window_horizon),
            alerts: AlertLog::new(config.alert_log_capacity),
            panels: PanelState::new(),
            last_sync: None,
            last_emergency: EmergencyFlag::default(),
        }
    }

    /// Apply a normalized payload: window, alerts, panels, then `last_sync`.
    pub fn apply(&mut self, normalized: &NormalizedPayload, now: DateTime<Utc>) -> UpdateOutcome {
        let candidate = normalized.reading.sample();
        let sample = match candidate {
            Some(_) => self.window.offer(&normalized.reading, now),
            None => {
                self.window.evict_expired(now);
                None
            }
        };

        // Alerts follow the reading even if its sample was already stale.
        let alert = candidate.and_then(|s| {
            self.alerts
                .record_if_breach(&s, &self.thresholds)
                .cloned()
        });

        self.panels.merge(normalized.panels.clone());
        self.last_emergency = normalized.emergency.clone();
        self.last_sync = Some(now);

        UpdateOutcome { sample, alert }
    }

    pub fn instance_id(&self) -> Uuid {
        self.instance_id
    }

    pub fn thresholds(&self) -> &Thresholds {
        &self.thresholds
    }

    pub fn window(&self) -> &VitalsWindow {
        &self.window
    }

    pub fn alert_log(&self) -> &AlertLog {
        &self.alerts
    }

    /// Window contents, time-ascending.
    pub fn series(&self) -> Vec<Sample> {
        self.window.series()
    }

    pub fn latest(&self) -> Option<Sample> {
        self.window.latest()
    }

    /// Up to `limit` alerts, most recent first.
    pub fn recent_alerts(&self, limit: usize) -> Vec<AlertEvent> {
        self.alerts.recent(limit)
    }

    pub fn alert_count_since(&self, cutoff: DateTime<Utc>) -> usize {
        self.alerts.count_since(cutoff)
    }

    pub fn panel_snapshot(&self) -> &PanelSnapshot {
        self.panels.snapshot()
    }

    pub fn last_sync(&self) -> Option<DateTime<Utc>> {
        self.last_sync
    }

    /// Emergency flag from the most recent payload, as the producer reported it.
    pub fn reported_emergency(&self) -> &EmergencyFlag {
        &self.last_emergency
    }

    pub fn window_summary(&self) -> Option<WindowSummary> {
        self.window.summary()
    }

    /// Whether the latest sample is at or beyond an alert threshold.
    pub fn emergency_active(&self) -> bool {
        self.latest()
            .is_some_and(|sample| self.thresholds.breach(sample.bpm).is_some())
    }

    /// Build the full read view at `now`.
    pub fn dashboard(&self, now: DateTime<Utc>) -> DashboardView {
        DashboardView {
            instance_id: self.instance_id,
            generated_at: now,
            current_bpm: self.latest().map(|s| s.bpm),
            current_in_safe_range: self
                .latest()
                .map(|s| self.thresholds.in_safe_range(s.bpm)),
            emergency_active: self.emergency_active(),
            reported_emergency: self.reported_emergency().clone(),
            series: self.series(),
            summary: self.window_summary(),
            recent_alerts: self.recent_alerts(RECENT_ALERTS_SHOWN),
            alerts_in_horizon: self.alert_count_since(self.window.cutoff(now)),
            alert_log_len: self.alerts.len(),
            alert_log_capacity: self.alerts.capacity(),
            panels: self.panel_snapshot().clone(),
            last_sync: self.last_sync,
            thresholds: self.thresholds,
        }
    }
}

/// Monitor state behind the single exclusive-access lock.
pub type SharedMonitor = Arc<RwLock<MonitorState>>;

/// Drives one acquisition-normalize-update cycle per external tick.
#[derive(Debug)]
pub struct MonitorLoop {
    source: PayloadSource,
    fallback: SimulatedSource,
    state: SharedMonitor,
    stats: SharedSyncStats,
    phase: TickPhase,
}

impl MonitorLoop {
    /// Create a loop with fresh state for `config`.
    pub fn new(config: &MonitorConfig) -> Result<Self, SourceError> {
        let source = PayloadSource::from_config(config)?;
        Ok(Self::with_source(config, source))
    }

    /// Create a loop around an explicit source.
    pub fn with_source(config: &MonitorConfig, source: PayloadSource) -> Self {
        Self {
            source,
            fallback: SimulatedSource::new(config.thresholds),
            state: Arc::new(RwLock::new(MonitorState::new(config))),
            stats: create_shared_stats(),
            phase: TickPhase::Idle,
        }
    }

    /// Replace the fallback simulator (deterministic tests).
    pub fn with_fallback(mut self, fallback: SimulatedSource) -> Self {
        self.fallback = fallback;
        self
    }

    /// Handle to the shared state for readers.
    pub fn shared_state(&self) -> SharedMonitor {
        Arc::clone(&self.state)
    }

    pub fn stats(&self) -> SharedSyncStats {
        Arc::clone(&self.stats)
    }

    pub fn phase(&self) -> TickPhase {
        self.phase
    }

    pub fn source(&self) -> &PayloadSource {
        &self.source
    }

    /// Run one cycle against the wall clock.
    pub async fn tick(&mut self) -> TickReport {
        self.tick_at(Utc::now()).await
    }

    /// Run one cycle with `now` as the wall-clock instant.
    ///
    /// Never fails: an unavailable remote source is replaced by exactly one
    /// simulated acquisition within the same tick.
    pub async fn tick_at(&mut self, now: DateTime<Utc>) -> TickReport {
        self.phase = TickPhase::Acquiring;
        let (raw, origin, fallback_reason) = match self.source.acquire_at(now).await {
            Ok(raw) => {
                let origin = match self.source {
                    PayloadSource::Simulated(_) => PayloadOrigin::Simulated,
                    PayloadSource::Remote(_) => {
                        self.stats.record_remote_success();
                        PayloadOrigin::Remote
                    }
                };
                (raw, origin, None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "remote source failed, using simulated data");
                self.stats.record_remote_fallback();
                (
                    self.fallback.generate_at(now),
                    PayloadOrigin::Fallback,
                    Some(e.to_string()),
                )
            }
        };

        self.phase = TickPhase::Normalizing;
        let normalized = normalize(&raw, now);

        self.phase = TickPhase::Updating;
        let outcome = {
            let mut state = self.state.write().await;
            state.apply(&normalized, now)
        };

        self.record_stats(&normalized, &outcome);
        self.phase = TickPhase::Idle;

        tracing::debug!(
            origin = ?origin,
            bpm = ?normalized.reading.heart_rate_bpm,
            alert = outcome.alert.is_some(),
            "tick complete"
        );

        TickReport {
            origin,
            fallback_reason,
            reading: normalized.reading,
            sample: outcome.sample,
            alert: outcome.alert,
            emergency: normalized.emergency,
            issues: normalized.issues,
            synced_at: now,
        }
    }

    fn record_stats(&self, normalized: &NormalizedPayload, outcome: &UpdateOutcome) {
        self.stats.record_tick();
        if normalized.reading.heart_rate_bpm.is_some() {
            self.stats.record_sample();
        }
        if outcome.alert.is_some() {
            self.stats.record_alert();
        }
        for issue in &normalized.issues {
            match issue {
                NormalizationIssue::InvalidHeartRate(_) => self.stats.record_invalid_heart_rate(),
                NormalizationIssue::TimestampMissing | NormalizationIssue::TimestampUnparsable(_) => {
                    self.stats.record_defaulted_timestamp()
                }
            }
        }
    }
}

/// Format an instant in the display timezone, e.g. `14:03:27 UTC`.
pub fn display_time(instant: DateTime<Utc>, tz: Tz) -> String {
    instant.with_timezone(&tz).format("%H:%M:%S %Z").to_string()
}

/// Cutoff for "alerts in the last `horizon`" reads.
pub fn cutoff_before(now: DateTime<Utc>, horizon: std::time::Duration) -> DateTime<Utc> {
    Duration::from_std(horizon)
        .ok()
        .and_then(|h| now.checked_sub_signed(h))
        .unwrap_or(DateTime::<Utc>::MIN_UTC)
}
