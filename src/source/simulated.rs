//! Simulated wearable feed.
//!
//! Heart rate hovers around a resting baseline with small jitter, and now
//! and then jumps past one of the alert thresholds. Auxiliary panels are
//! drawn fresh on every call.

use crate::config::Thresholds;
use crate::source::types::{RawPayload, RawTimestamp};
use chrono::{DateTime, SecondsFormat, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::json;

/// Resting heart rate the simulator hovers around.
pub const BASELINE_BPM: i64 = 72;

/// Probability of a high-side excursion per reading.
pub const HIGH_EXCURSION_PROBABILITY: f64 = 0.03;

/// Probability of a low-side excursion per reading.
pub const LOW_EXCURSION_PROBABILITY: f64 = 0.03;

/// Floor for low-side excursions.
const LOW_EXCURSION_FLOOR: i64 = 30;

const SLEEP_PRESETS: [(i64, &str); 4] = [
    (0, "—"),
    (360, "fair"),
    (420, "good"),
    (480, "excellent"),
];

/// Generates plausible payloads with no external I/O.
#[derive(Debug, Clone)]
pub struct SimulatedSource {
    thresholds: Thresholds,
    rng: StdRng,
}

impl SimulatedSource {
    /// Create a simulator seeded from the operating system.
    pub fn new(thresholds: Thresholds) -> Self {
        Self {
            thresholds,
            rng: StdRng::from_os_rng(),
        }
    }

    /// Create a deterministic simulator.
    pub fn with_seed(thresholds: Thresholds, seed: u64) -> Self {
        Self {
            thresholds,
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Generate a payload stamped with the current instant.
    pub fn generate(&mut self) -> RawPayload {
        self.generate_at(Utc::now())
    }

    /// Generate a payload stamped with `now`, encoded as a `Z`-suffixed string.
    pub fn generate_at(&mut self, now: DateTime<Utc>) -> RawPayload {
        let bpm = self.heart_rate();
        let (duration_min, quality) = SLEEP_PRESETS[self.rng.random_range(0..SLEEP_PRESETS.len())];
        let emergency_active = self.thresholds.breach(bpm).is_some();

        RawPayload {
            timestamp: RawTimestamp::Text(now.to_rfc3339_opts(SecondsFormat::Micros, true)),
            heart_rate_bpm: json!(bpm),
            sleep: json!({"duration_min": duration_min, "quality": quality}),
            fitness: json!({
                "steps": self.rng.random_range(800..=12_000),
                "calories": self.rng.random_range(180..=650),
            }),
            nutrition: json!({
                "hydration_ml": self.rng.random_range(600..=2_500),
                "meals": self.rng.random_range(1..=4),
            }),
            emergency: json!({
                "active": emergency_active,
                "reason": if emergency_active { "Heart rate out of bounds" } else { "" },
            }),
        }
    }

    fn heart_rate(&mut self) -> i64 {
        let circadian = BASELINE_BPM + (4.0 * (self.rng.random::<f64>() - 0.5)) as i64;
        let roll: f64 = self.rng.random();

        if roll < HIGH_EXCURSION_PROBABILITY {
            let high = self.thresholds.alert_high;
            self.rng.random_range(high..=high.saturating_add(20))
        } else if roll < HIGH_EXCURSION_PROBABILITY + LOW_EXCURSION_PROBABILITY {
            let low = self.thresholds.alert_low;
            let floor = low.saturating_sub(10).max(LOW_EXCURSION_FLOOR);
            if floor > low {
                low
            } else {
                self.rng.random_range(floor..=low)
            }
        } else {
            circadian + self.rng.random_range(-3..=3)
        }
    }
}
