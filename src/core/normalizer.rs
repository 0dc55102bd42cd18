//! Payload normalization.
//!
//! Turns a loosely-typed [`RawPayload`] into a canonical [`Reading`] plus
//! panel updates. Normalization never fails: every bad field has an explicit
//! fallback, and each fallback taken is reported as a [`NormalizationIssue`].

use crate::core::panels::{FitnessPanel, NutritionPanel, PanelSnapshot, SleepPanel};
use crate::core::reading::{EmergencyFlag, Reading};
use crate::source::types::{RawPayload, RawTimestamp};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

/// Offset-aware layouts accepted after a trailing `Z` has been rewritten.
const OFFSET_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%dT%H:%M:%S%.f%z",
    "%Y-%m-%d %H:%M:%S%.f%z",
    "%Y-%m-%dT%H:%M%:z",
];

/// Layouts without an offset; these are interpreted as UTC.
const NAIVE_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M",
];

/// A fallback taken while normalizing a payload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum NormalizationIssue {
    /// No timestamp was supplied; the current instant was used
    TimestampMissing,
    /// The timestamp could not be parsed; the current instant was used
    TimestampUnparsable(String),
    /// The heart rate was present but not an integer; the reading has no sample
    InvalidHeartRate(String),
}

impl NormalizationIssue {
    /// Whether the reading's instant was substituted with "now".
    pub fn is_timestamp_defaulted(&self) -> bool {
        matches!(
            self,
            NormalizationIssue::TimestampMissing | NormalizationIssue::TimestampUnparsable(_)
        )
    }
}

/// The typed result of normalizing one raw payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NormalizedPayload {
    pub reading: Reading,
    /// Panel fields supplied by this payload; `None` means "no change"
    pub panels: PanelSnapshot,
    pub emergency: EmergencyFlag,
    pub issues: Vec<NormalizationIssue>,
}

/// Result of coercing a loosely-typed value to an integer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Coerced {
    Absent,
    Value(i64),
    Invalid,
}

impl Coerced {
    fn ok(self) -> Option<i64> {
        match self {
            Coerced::Value(v) => Some(v),
            Coerced::Absent | Coerced::Invalid => None,
        }
    }
}

/// Normalize a raw payload. `now` substitutes for missing or bad timestamps.
pub fn normalize(raw: &RawPayload, now: DateTime<Utc>) -> NormalizedPayload {
    let mut issues = Vec::new();

    let instant = match resolve_timestamp(&raw.timestamp) {
        Ok(instant) => instant,
        Err(issue) => {
            tracing::debug!(?issue, "substituting current instant for timestamp");
            issues.push(issue);
            now
        }
    };

    let heart_rate_bpm = match coerce_integer(&raw.heart_rate_bpm) {
        Coerced::Value(bpm) => Some(bpm),
        Coerced::Absent => None,
        Coerced::Invalid => {
            tracing::warn!(value = %raw.heart_rate_bpm, "heart rate is not an integer, ignoring");
            issues.push(NormalizationIssue::InvalidHeartRate(
                raw.heart_rate_bpm.to_string(),
            ));
            None
        }
    };

    NormalizedPayload {
        reading: Reading::new(instant, heart_rate_bpm),
        panels: PanelSnapshot {
            sleep: sleep_update(&raw.sleep),
            fitness: fitness_update(&raw.fitness),
            nutrition: nutrition_update(&raw.nutrition),
        },
        emergency: emergency_flag(&raw.emergency),
        issues,
    }
}

/// Parse an ISO-8601 timestamp and normalize it to UTC.
///
/// A trailing `Z` means offset zero. Values without an offset are taken as UTC.
pub fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return None;
    }

    let rewritten;
    let candidate = match trimmed.strip_suffix(['Z', 'z']) {
        Some(stem) => {
            rewritten = format!("{stem}+00:00");
            rewritten.as_str()
        }
        None => trimmed,
    };

    if let Ok(parsed) = DateTime::parse_from_rfc3339(candidate) {
        return Some(parsed.with_timezone(&Utc));
    }
    for format in OFFSET_FORMATS {
        if let Ok(parsed) = DateTime::parse_from_str(candidate, format) {
            return Some(parsed.with_timezone(&Utc));
        }
    }
    for format in NAIVE_FORMATS {
        if let Ok(naive) = NaiveDateTime::parse_from_str(candidate, format) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(candidate, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn resolve_timestamp(raw: &RawTimestamp) -> Result<DateTime<Utc>, NormalizationIssue> {
    match raw {
        RawTimestamp::Instant(instant) => Ok(instant.with_timezone(&Utc)),
        RawTimestamp::Naive(naive) => Ok(naive.and_utc()),
        RawTimestamp::Text(text) => parse_timestamp(text)
            .ok_or_else(|| NormalizationIssue::TimestampUnparsable(text.clone())),
        RawTimestamp::Other(value) => Err(NormalizationIssue::TimestampUnparsable(value.to_string())),
        RawTimestamp::Missing => Err(NormalizationIssue::TimestampMissing),
    }
}

fn coerce_integer(value: &Value) -> Coerced {
    match value {
        Value::Null => Coerced::Absent,
        Value::Number(number) => {
            if let Some(v) = number.as_i64() {
                Coerced::Value(v)
            } else if let Some(f) = number.as_f64().filter(|f| f.is_finite()) {
                let truncated = f.trunc();
                if truncated >= i64::MIN as f64 && truncated <= i64::MAX as f64 {
                    Coerced::Value(truncated as i64)
                } else {
                    Coerced::Invalid
                }
            } else {
                Coerced::Invalid
            }
        }
        Value::String(text) => text
            .trim()
            .parse::<i64>()
            .map_or(Coerced::Invalid, Coerced::Value),
        Value::Bool(_) | Value::Array(_) | Value::Object(_) => Coerced::Invalid,
    }
}

/// Sub-objects that are missing or not objects behave as an empty mapping.
fn as_mapping(value: &Value) -> Option<&Map<String, Value>> {
    value.as_object()
}

fn int_field(mapping: Option<&Map<String, Value>>, key: &str) -> Option<i64> {
    mapping
        .and_then(|m| m.get(key))
        .map(coerce_integer)
        .and_then(Coerced::ok)
}

fn text_field(mapping: Option<&Map<String, Value>>, key: &str) -> Option<String> {
    mapping
        .and_then(|m| m.get(key))
        .and_then(Value::as_str)
        .map(str::to_string)
}

fn sleep_update(value: &Value) -> SleepPanel {
    let mapping = as_mapping(value);
    SleepPanel {
        duration_min: int_field(mapping, "duration_min"),
        quality: text_field(mapping, "quality"),
    }
}

fn fitness_update(value: &Value) -> FitnessPanel {
    let mapping = as_mapping(value);
    FitnessPanel {
        steps: int_field(mapping, "steps"),
        calories: int_field(mapping, "calories"),
    }
}

fn nutrition_update(value: &Value) -> NutritionPanel {
    let mapping = as_mapping(value);
    NutritionPanel {
        hydration_ml: int_field(mapping, "hydration_ml"),
        meals: int_field(mapping, "meals"),
    }
}

fn emergency_flag(value: &Value) -> EmergencyFlag {
    let mapping = as_mapping(value);
    EmergencyFlag {
        active: mapping
            .and_then(|m| m.get("active"))
            .and_then(Value::as_bool)
            .unwrap_or(false),
        reason: text_field(mapping, "reason").unwrap_or_default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{FixedOffset, TimeZone};
    use serde_json::json;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 22, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_z_suffix_and_explicit_offset_agree() {
        let z = parse_timestamp("2024-01-22T10:00:00.250Z").unwrap();
        let offset = parse_timestamp("2024-01-22T10:00:00.250+00:00").unwrap();
        assert_eq!(z, offset);
        assert_eq!(
            z,
            Utc.with_ymd_and_hms(2024, 1, 22, 10, 0, 0).unwrap() + chrono::Duration::milliseconds(250)
        );
    }

    #[test]
    fn test_non_utc_offset_is_converted() {
        let parsed = parse_timestamp("2024-01-22T12:30:00+02:30").unwrap();
        assert_eq!(parsed, Utc.with_ymd_and_hms(2024, 1, 22, 10, 0, 0).unwrap());
    }

    #[test]
    fn test_naive_timestamp_is_utc() {
        let expected = Utc.with_ymd_and_hms(2024, 1, 22, 10, 0, 0).unwrap();
        assert_eq!(parse_timestamp("2024-01-22T10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-22 10:00:00"), Some(expected));
        assert_eq!(parse_timestamp("2024-01-22T10:00"), Some(expected));
        assert_eq!(
            parse_timestamp("2024-01-22"),
            Some(Utc.with_ymd_and_hms(2024, 1, 22, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_garbage_timestamp_is_rejected() {
        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2024-13-40T99:00:00Z"), None);
    }

    #[test]
    fn test_typed_instants_are_normalized() {
        let offset = FixedOffset::east_opt(5 * 3600).unwrap();
        let instant = offset.with_ymd_and_hms(2024, 1, 22, 15, 0, 0).unwrap();
        let raw = RawPayload {
            timestamp: RawTimestamp::Instant(instant),
            ..Default::default()
        };
        let normalized = normalize(&raw, now());
        assert_eq!(
            normalized.reading.instant,
            Utc.with_ymd_and_hms(2024, 1, 22, 10, 0, 0).unwrap()
        );
        assert!(normalized.issues.is_empty());

        let naive = NaiveDate::from_ymd_opt(2024, 1, 22)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap();
        let raw = RawPayload {
            timestamp: RawTimestamp::Naive(naive),
            ..Default::default()
        };
        assert_eq!(normalize(&raw, now()).reading.instant, naive.and_utc());
    }

    #[test]
    fn test_missing_or_bad_timestamp_uses_now() {
        let normalized = normalize(&RawPayload::default(), now());
        assert_eq!(normalized.reading.instant, now());
        assert_eq!(normalized.issues, vec![NormalizationIssue::TimestampMissing]);

        let raw = RawPayload::from_json(json!({"timestamp": "not a time"}));
        let normalized = normalize(&raw, now());
        assert_eq!(normalized.reading.instant, now());
        assert!(normalized.issues[0].is_timestamp_defaulted());

        let raw = RawPayload::from_json(json!({"timestamp": 1_700_000_000}));
        assert_eq!(normalize(&raw, now()).reading.instant, now());
    }

    #[test]
    fn test_heart_rate_coercion() {
        let bpm = |value: Value| {
            let raw = RawPayload::from_json(json!({
                "timestamp": "2024-01-22T10:00:00Z",
                "heart_rate_bpm": value
            }));
            normalize(&raw, now()).reading.heart_rate_bpm
        };

        assert_eq!(bpm(json!(72)), Some(72));
        assert_eq!(bpm(json!("88")), Some(88));
        assert_eq!(bpm(json!(" 91 ")), Some(91));
        assert_eq!(bpm(json!(101.9)), Some(101));
        assert_eq!(bpm(json!("abc")), None);
        assert_eq!(bpm(json!("72.5")), None);
        assert_eq!(bpm(json!(true)), None);
        assert_eq!(bpm(json!([72])), None);
        assert_eq!(bpm(Value::Null), None);
    }

    #[test]
    fn test_invalid_heart_rate_still_updates_panels() {
        let raw = RawPayload::from_json(json!({
            "heart_rate_bpm": "abc",
            "fitness": {"steps": 4000, "calories": "310"}
        }));
        let normalized = normalize(&raw, now());

        assert_eq!(normalized.reading.heart_rate_bpm, None);
        assert!(normalized
            .issues
            .contains(&NormalizationIssue::InvalidHeartRate("\"abc\"".to_string())));
        assert_eq!(normalized.panels.fitness.steps, Some(4000));
        assert_eq!(normalized.panels.fitness.calories, Some(310));
    }

    #[test]
    fn test_missing_sub_objects_are_empty_updates() {
        let raw = RawPayload::from_json(json!({
            "timestamp": "2024-01-22T10:00:00Z",
            "heart_rate_bpm": 70,
            "sleep": "not an object",
            "nutrition": {"meals": "many"}
        }));
        let normalized = normalize(&raw, now());
        assert!(normalized.panels.is_empty());
        assert_eq!(normalized.emergency, EmergencyFlag::default());
    }

    #[test]
    fn test_full_payload() {
        let raw = RawPayload::from_json(json!({
            "timestamp": "2024-01-22T10:00:00Z",
            "heart_rate_bpm": 130,
            "sleep": {"duration_min": 420, "quality": "good"},
            "fitness": {"steps": 8000, "calories": 500},
            "nutrition": {"hydration_ml": 2000, "meals": 3},
            "emergency": {"active": true, "reason": "Heart rate out of bounds"}
        }));
        let normalized = normalize(&raw, now());

        assert_eq!(normalized.reading.heart_rate_bpm, Some(130));
        assert_eq!(normalized.panels.sleep.quality.as_deref(), Some("good"));
        assert_eq!(normalized.panels.nutrition.hydration_ml, Some(2000));
        assert!(normalized.emergency.active);
        assert_eq!(normalized.emergency.reason, "Heart rate out of bounds");
        assert!(normalized.issues.is_empty());
    }
}
