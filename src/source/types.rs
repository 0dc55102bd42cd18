//! Loosely-typed payloads as they arrive from a source.
//!
//! Nothing here is trusted: fields may be missing, null or of the wrong
//! type. [`crate::core::normalize`] turns a [`RawPayload`] into typed values.

use chrono::{DateTime, FixedOffset, NaiveDateTime};
use serde_json::{Map, Value};

/// The timestamp field of a raw payload.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RawTimestamp {
    /// Already a typed, offset-aware instant
    Instant(DateTime<FixedOffset>),
    /// Typed but without an offset; interpreted as UTC
    Naive(NaiveDateTime),
    /// A string expected to hold ISO-8601
    Text(String),
    /// Present but neither a string nor null
    Other(Value),
    #[default]
    Missing,
}

impl RawTimestamp {
    fn from_json(value: Option<Value>) -> Self {
        match value {
            None | Some(Value::Null) => RawTimestamp::Missing,
            Some(Value::String(text)) => RawTimestamp::Text(text),
            Some(other) => RawTimestamp::Other(other),
        }
    }

    fn to_json(&self) -> Value {
        match self {
            RawTimestamp::Instant(instant) => Value::String(instant.to_rfc3339()),
            RawTimestamp::Naive(naive) => {
                Value::String(naive.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
            }
            RawTimestamp::Text(text) => Value::String(text.clone()),
            RawTimestamp::Other(value) => value.clone(),
            RawTimestamp::Missing => Value::Null,
        }
    }
}

/// One raw reading as acquired from a source.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RawPayload {
    pub timestamp: RawTimestamp,
    pub heart_rate_bpm: Value,
    pub sleep: Value,
    pub fitness: Value,
    pub nutrition: Value,
    pub emergency: Value,
}

impl RawPayload {
    /// Build a payload from a decoded JSON document.
    ///
    /// A document that is not an object yields an all-missing payload.
    pub fn from_json(value: Value) -> Self {
        let Value::Object(mut fields) = value else {
            return Self::default();
        };

        let mut take = |key: &str| fields.remove(key).unwrap_or(Value::Null);
        let heart_rate_bpm = take("heart_rate_bpm");
        let sleep = take("sleep");
        let fitness = take("fitness");
        let nutrition = take("nutrition");
        let emergency = take("emergency");

        Self {
            timestamp: RawTimestamp::from_json(fields.remove("timestamp")),
            heart_rate_bpm,
            sleep,
            fitness,
            nutrition,
            emergency,
        }
    }

    /// Decode a payload from JSON text.
    pub fn from_json_str(body: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(body)?;
        Ok(Self::from_json(value))
    }

    /// Render the payload in the remote wire schema. Null fields are omitted.
    pub fn to_json(&self) -> Value {
        let mut object = Map::new();
        let timestamp = self.timestamp.to_json();
        if !timestamp.is_null() {
            object.insert("timestamp".to_string(), timestamp);
        }
        for (key, value) in [
            ("heart_rate_bpm", &self.heart_rate_bpm),
            ("sleep", &self.sleep),
            ("fitness", &self.fitness),
            ("nutrition", &self.nutrition),
            ("emergency", &self.emergency),
        ] {
            if !value.is_null() {
                object.insert(key.to_string(), value.clone());
            }
        }
        Value::Object(object)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_json_object() {
        let payload = RawPayload::from_json(json!({
            "timestamp": "2024-01-22T10:00:00Z",
            "heart_rate_bpm": 71,
            "fitness": {"steps": 1200}
        }));

        assert_eq!(
            payload.timestamp,
            RawTimestamp::Text("2024-01-22T10:00:00Z".to_string())
        );
        assert_eq!(payload.heart_rate_bpm, json!(71));
        assert_eq!(payload.fitness, json!({"steps": 1200}));
        assert!(payload.sleep.is_null());
    }

    #[test]
    fn test_non_object_document_is_empty_payload() {
        assert_eq!(RawPayload::from_json(json!([1, 2, 3])), RawPayload::default());
        assert_eq!(RawPayload::from_json(json!("hello")), RawPayload::default());
    }

    #[test]
    fn test_non_string_timestamp_is_kept_as_other() {
        let payload = RawPayload::from_json(json!({"timestamp": 1_700_000_000}));
        assert_eq!(payload.timestamp, RawTimestamp::Other(json!(1_700_000_000)));

        let payload = RawPayload::from_json(json!({"timestamp": null}));
        assert_eq!(payload.timestamp, RawTimestamp::Missing);
    }

    #[test]
    fn test_to_json_omits_missing_fields() {
        let payload = RawPayload::from_json(json!({"heart_rate_bpm": 80}));
        assert_eq!(payload.to_json(), json!({"heart_rate_bpm": 80}));
    }

    #[test]
    fn test_invalid_json_text() {
        assert!(RawPayload::from_json_str("{not json").is_err());
        assert!(RawPayload::from_json_str("{}").is_ok());
    }
}
