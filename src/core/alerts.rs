//! Bounded log of threshold breaches.
//!
//! The log only records that an alert condition occurred. Delivering the
//! alert anywhere is somebody else's job.

use crate::config::Thresholds;
use crate::core::reading::Sample;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Default number of alerts retained.
pub const DEFAULT_ALERT_CAPACITY: usize = 50;

/// Alert classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AlertKind {
    Emergency,
}

/// Which threshold was crossed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreachDirection {
    /// At or above the high alert threshold
    High,
    /// At or below the low alert threshold
    Low,
}

/// A recorded breach. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertEvent {
    /// Instant of the breaching sample
    pub time: DateTime<Utc>,
    #[serde(rename = "type")]
    pub kind: AlertKind,
    pub direction: BreachDirection,
    /// The breaching heart rate in bpm
    pub value: i64,
    pub message: String,
}

impl AlertEvent {
    fn breach(sample: &Sample, direction: BreachDirection, thresholds: &Thresholds) -> Self {
        let message = match direction {
            BreachDirection::High => format!(
                "Heart rate {} bpm at or above alert threshold {} bpm",
                sample.bpm, thresholds.alert_high
            ),
            BreachDirection::Low => format!(
                "Heart rate {} bpm at or below alert threshold {} bpm",
                sample.bpm, thresholds.alert_low
            ),
        };

        Self {
            time: sample.instant,
            kind: AlertKind::Emergency,
            direction,
            value: sample.bpm,
            message,
        }
    }
}

/// Append-only alert history truncated to the most recent `capacity` entries.
#[derive(Debug, Clone)]
pub struct AlertLog {
    capacity: usize,
    /// Oldest first
    events: VecDeque<AlertEvent>,
}

impl AlertLog {
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            capacity,
            events: VecDeque::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Record an alert if `sample` is at or beyond an alert threshold.
    ///
    /// Returns the new event, or `None` when the sample is within bounds.
    pub fn record_if_breach(
        &mut self,
        sample: &Sample,
        thresholds: &Thresholds,
    ) -> Option<&AlertEvent> {
        let direction = thresholds.breach(sample.bpm)?;
        let event = AlertEvent::breach(sample, direction, thresholds);
        tracing::info!(
            bpm = event.value,
            direction = ?event.direction,
            time = %event.time,
            "heart rate alert recorded"
        );

        self.events.push_back(event);
        while self.events.len() > self.capacity {
            self.events.pop_front();
        }
        self.events.back()
    }

    /// Number of events at or after `cutoff`.
    pub fn count_since(&self, cutoff: DateTime<Utc>) -> usize {
        self.events.iter().filter(|e| e.time >= cutoff).count()
    }

    /// Up to `limit` events, most recent first.
    pub fn recent(&self, limit: usize) -> Vec<AlertEvent> {
        self.events.iter().rev().take(limit).cloned().collect()
    }

    /// Most recent event, if any.
    pub fn last(&self) -> Option<&AlertEvent> {
        self.events.back()
    }

    /// All events, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &AlertEvent> {
        self.events.iter()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }
}

impl Default for AlertLog {
    fn default() -> Self {
        Self::new(DEFAULT_ALERT_CAPACITY)
    }
}
