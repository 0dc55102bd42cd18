//! Last-known-value state for the sleep, fitness and nutrition panels.
//!
//! Updates merge field by field: a field the update leaves as `None` keeps
//! its previous value, so partial payloads never blank out a panel.

use serde::{Deserialize, Serialize};

/// Sleep summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SleepPanel {
    /// Total sleep in minutes
    pub duration_min: Option<i64>,
    /// Free-form quality label ("fair", "good", ...)
    pub quality: Option<String>,
}

/// Fitness summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FitnessPanel {
    pub steps: Option<i64>,
    pub calories: Option<i64>,
}

/// Nutrition summary.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NutritionPanel {
    pub hydration_ml: Option<i64>,
    pub meals: Option<i64>,
}

impl SleepPanel {
    pub fn merge(&mut self, update: SleepPanel) {
        merge_field(&mut self.duration_min, update.duration_min);
        merge_field(&mut self.quality, update.quality);
    }

    pub fn is_empty(&self) -> bool {
        self.duration_min.is_none() && self.quality.is_none()
    }
}

impl FitnessPanel {
    pub fn merge(&mut self, update: FitnessPanel) {
        merge_field(&mut self.steps, update.steps);
        merge_field(&mut self.calories, update.calories);
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_none() && self.calories.is_none()
    }
}

impl NutritionPanel {
    pub fn merge(&mut self, update: NutritionPanel) {
        merge_field(&mut self.hydration_ml, update.hydration_ml);
        merge_field(&mut self.meals, update.meals);
    }

    pub fn is_empty(&self) -> bool {
        self.hydration_ml.is_none() && self.meals.is_none()
    }
}

/// All three panels together. Used both as the merged state and as an update.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PanelSnapshot {
    pub sleep: SleepPanel,
    pub fitness: FitnessPanel,
    pub nutrition: NutritionPanel,
}

impl PanelSnapshot {
    /// True when no field carries a value (an update that changes nothing).
    pub fn is_empty(&self) -> bool {
        self.sleep.is_empty() && self.fitness.is_empty() && self.nutrition.is_empty()
    }
}

/// Holds the latest merged panel snapshot. No history is kept.
#[derive(Debug, Clone, Default)]
pub struct PanelState {
    current: PanelSnapshot,
}

impl PanelState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge an update into the current snapshot, last write wins per field.
    pub fn merge(&mut self, update: PanelSnapshot) {
        self.current.sleep.merge(update.sleep);
        self.current.fitness.merge(update.fitness);
        self.current.nutrition.merge(update.nutrition);
    }

    /// The latest merged snapshot.
    pub fn snapshot(&self) -> &PanelSnapshot {
        &self.current
    }
}

fn merge_field<T>(slot: &mut Option<T>, update: Option<T>) {
    if let Some(value) = update {
        *slot = Some(value);
    }
}
