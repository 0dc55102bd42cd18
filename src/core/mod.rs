//! Core functionality for the PulseGuard monitor.
//!
//! This module contains:
//! - Payload normalization into canonical readings
//! - The sliding vitals window
//! - The bounded alert log
//! - Last-known-value panel state

pub mod alerts;
pub mod normalizer;
pub mod panels;
pub mod reading;
pub mod window;

// Re-export commonly used types
pub use alerts::{AlertEvent, AlertKind, AlertLog, BreachDirection, DEFAULT_ALERT_CAPACITY};
pub use normalizer::{normalize, parse_timestamp, NormalizationIssue, NormalizedPayload};
pub use panels::{FitnessPanel, NutritionPanel, PanelSnapshot, PanelState, SleepPanel};
pub use reading::{EmergencyFlag, Reading, Sample};
pub use window::{VitalsWindow, WindowSummary, DEFAULT_HORIZON_SECS};
