//! Inbound record payloads
//!
//! The raw body accepts every field any client era ever sent. It is
//! resolved exactly once into a `PayloadShape`; nothing downstream looks
//! at the optional fields again.

use chrono::{DateTime, NaiveDate, TimeZone, Utc};
use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

use super::normalizer::{has_content, is_non_empty};

/// A legacy flat field: absent from the body, or set (explicit `null` included)
#[derive(Debug, Clone, PartialEq, Default)]
pub enum LegacyField {
    #[default]
    Absent,
    Set(Value),
}

impl LegacyField {
    pub fn is_set(&self) -> bool {
        matches!(self, Self::Set(_))
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Self::Absent => None,
            Self::Set(value) => Some(value),
        }
    }
}

// Only called when the key is present; `#[serde(default)]` covers absence.
impl<'de> Deserialize<'de> for LegacyField {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::Set)
    }
}

/// Raw request body for create and update
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordPayload {
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub aggregated_data: Option<Value>,
    #[serde(default)]
    pub nasa: LegacyField,
    #[serde(default)]
    pub weather: LegacyField,
    #[serde(default)]
    pub news: LegacyField,
    /// Client capture time; only used on create
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub timestamp: Option<DateTime<Utc>>,
}

/// The three legacy flat fields
#[derive(Debug, Clone, PartialEq, Default)]
pub struct LegacyFields {
    pub nasa: LegacyField,
    pub weather: LegacyField,
    pub news: LegacyField,
}

impl LegacyFields {
    /// Field name paired with its value, in a fixed order
    pub fn entries(&self) -> [(&'static str, &LegacyField); 3] {
        [
            ("nasa", &self.nasa),
            ("weather", &self.weather),
            ("news", &self.news),
        ]
    }
}

/// Payload shape after precedence resolution (first match wins)
#[derive(Debug, Clone, PartialEq)]
pub enum PayloadShape {
    /// `data` envelope from the current client
    Unified(Value),
    /// `aggregatedData` object with at least one key
    Aggregated(Value),
    /// Flat `nasa` / `weather` / `news` fields
    Legacy(LegacyFields),
}

/// A payload that passed validation
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedPayload {
    pub shape: PayloadShape,
    pub timestamp: Option<DateTime<Utc>>,
    /// The body carried an `aggregatedData` field, whichever shape won
    pub carries_aggregated_data: bool,
}

impl RecordPayload {
    /// Parse a request body; an empty body reads as `{}`.
    ///
    /// Anything but a JSON object is rejected, arrays included.
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(Self::default());
        }
        match serde_json::from_slice::<Value>(body)? {
            object @ Value::Object(_) => serde_json::from_value(object),
            _ => Err(serde_json::Error::custom("request body must be a JSON object")),
        }
    }

    /// Resolve into a shape, or `None` when there is nothing to save
    pub fn resolve(self) -> Option<ResolvedPayload> {
        if !has_content(&self) {
            return None;
        }

        let carries_aggregated_data = self
            .aggregated_data
            .as_ref()
            .is_some_and(|value| !value.is_null());

        let shape = match (self.data, self.aggregated_data) {
            (Some(data), _) if is_non_empty(&data) => PayloadShape::Unified(data),
            (_, Some(aggregated)) if has_keys(&aggregated) => PayloadShape::Aggregated(aggregated),
            _ => PayloadShape::Legacy(LegacyFields {
                nasa: self.nasa,
                weather: self.weather,
                news: self.news,
            }),
        };

        Some(ResolvedPayload {
            shape,
            timestamp: self.timestamp,
            carries_aggregated_data,
        })
    }
}

/// Accept RFC 3339, a bare `YYYY-MM-DD` date or epoch milliseconds.
///
/// Anything else reads as absent, so a bad timestamp never fails the body.
fn lenient_timestamp<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<DateTime<Utc>>, D::Error> {
    let parsed = match Value::deserialize(deserializer)? {
        Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
            .map(|ts| ts.with_timezone(&Utc))
            .ok()
            .or_else(|| {
                NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d")
                    .ok()
                    .and_then(|date| date.and_hms_opt(0, 0, 0))
                    .map(|naive| naive.and_utc())
            }),
        Value::Number(n) => n
            .as_i64()
            .and_then(|millis| Utc.timestamp_millis_opt(millis).single()),
        _ => None,
    };
    Ok(parsed)
}

/// An object with at least one key
pub(crate) fn has_keys(value: &Value) -> bool {
    value.as_object().is_some_and(|map| !map.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn parse(body: Value) -> RecordPayload {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_absent_vs_explicit_null() {
        let payload = parse(json!({ "nasa": null, "weather": { "temp": 3 } }));
        assert_eq!(payload.nasa, LegacyField::Set(Value::Null));
        assert_eq!(payload.weather, LegacyField::Set(json!({ "temp": 3 })));
        assert_eq!(payload.news, LegacyField::Absent);
    }

    #[test]
    fn test_empty_body_is_empty_object() {
        let payload = RecordPayload::from_slice(b"  \n").unwrap();
        assert!(payload.resolve().is_none());
        assert!(RecordPayload::from_slice(b"{not json").is_err());
        assert!(RecordPayload::from_slice(b"[1,2]").is_err());
    }

    #[test]
    fn test_data_wins_over_everything() {
        let resolved = parse(json!({
            "data": { "a": 1 },
            "aggregatedData": { "b": 2 },
            "nasa": { "c": 3 }
        }))
        .resolve()
        .unwrap();
        assert_eq!(resolved.shape, PayloadShape::Unified(json!({ "a": 1 })));
        assert!(resolved.carries_aggregated_data);
    }

    #[test]
    fn test_aggregated_wins_over_legacy() {
        let resolved = parse(json!({ "aggregatedData": { "b": 2 }, "news": [1] }))
            .resolve()
            .unwrap();
        assert_eq!(resolved.shape, PayloadShape::Aggregated(json!({ "b": 2 })));
    }

    #[test]
    fn test_empty_data_falls_through_to_legacy() {
        let resolved = parse(json!({ "data": {}, "aggregatedData": {}, "weather": "rain" }))
            .resolve()
            .unwrap();
        match resolved.shape {
            PayloadShape::Legacy(fields) => {
                assert_eq!(fields.weather, LegacyField::Set(json!("rain")));
                assert!(!fields.nasa.is_set());
            }
            other => panic!("expected legacy shape, got {:?}", other),
        }
        assert!(resolved.carries_aggregated_data);
    }

    #[test]
    fn test_nothing_to_save() {
        assert!(parse(json!({})).resolve().is_none());
        assert!(parse(json!({ "nasa": null, "data": null })).resolve().is_none());
        assert!(parse(json!({ "aggregatedData": {} })).resolve().is_none());
        assert!(parse(json!({ "type": "nasa", "format": "structured" })).resolve().is_none());
    }

    #[test]
    fn test_array_body_rejected() {
        assert!(RecordPayload::from_slice(br#"[{"x":1}]"#).is_err());
        assert!(RecordPayload::from_slice(b"\"text\"").is_err());
        assert!(RecordPayload::from_slice(b"null").is_err());
        assert!(RecordPayload::from_slice(br#"{"data":{"x":1}}"#).is_ok());
    }

    #[test]
    fn test_lenient_timestamps() {
        let ts = |value: Value| {
            RecordPayload::from_slice(json!({ "data": { "a": 1 }, "timestamp": value }).to_string().as_bytes())
                .unwrap()
                .timestamp
        };

        assert_eq!(
            ts(json!(1_700_000_000_000i64)).unwrap().timestamp_millis(),
            1_700_000_000_000
        );
        assert_eq!(
            ts(json!("2024-03-01")).unwrap().to_rfc3339(),
            "2024-03-01T00:00:00+00:00"
        );
        assert!(ts(json!("")).is_none());
        assert!(ts(json!("yesterday")).is_none());
        assert!(ts(json!(true)).is_none());
        assert!(ts(Value::Null).is_none());
    }

    #[test]
    fn test_timestamp_parsed() {
        let resolved = parse(json!({ "data": { "x": 1 }, "timestamp": "2024-03-01T10:00:00.000Z" }))
            .resolve()
            .unwrap();
        assert_eq!(
            resolved.timestamp.unwrap().to_rfc3339(),
            "2024-03-01T10:00:00+00:00"
        );
    }
}
