//! Record normalization
//!
//! Pure functions: no I/O, and the current time is always passed in.
//!
//! Create and update share the precedence `data` → `aggregatedData` →
//! legacy flat fields. Update replaces `data` wholesale on the first two
//! paths and merges on the legacy path. Only the legacy merge keeps the
//! existing `metadata` object; a full replace drops it.

use chrono::{DateTime, SecondsFormat, Utc};
use serde_json::{json, Map, Value};

use super::payload::{has_keys, LegacyField, PayloadShape, RecordPayload};

/// Source tag written into records built from legacy payloads
pub const LEGACY_SOURCE: &str = "Legacy Format";

/// False for `null`, `false`, `0`, `""`, `{}` and `[]`
pub fn is_non_empty(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Whether a payload carries anything worth persisting
pub fn has_content(payload: &RecordPayload) -> bool {
    let present = |v: Option<&Value>| v.is_some_and(is_non_empty);

    present(payload.data.as_ref())
        || present(payload.nasa.as_value())
        || present(payload.weather.as_value())
        || present(payload.news.as_value())
        || payload.aggregated_data.as_ref().is_some_and(has_keys)
}

/// Build the persisted `data` for a new record
pub fn normalize_for_create(shape: PayloadShape, now: DateTime<Utc>) -> Value {
    match shape {
        PayloadShape::Unified(data) => data,
        PayloadShape::Aggregated(data) => data,
        PayloadShape::Legacy(fields) => {
            let mut data = Map::new();
            for (key, field) in fields.entries() {
                data.insert(key.to_string(), field.as_value().cloned().unwrap_or(Value::Null));
            }
            data.insert(
                "metadata".to_string(),
                json!({
                    "savedAt": iso_timestamp(now),
                    "source": LEGACY_SOURCE,
                }),
            );
            Value::Object(data)
        }
    }
}

/// Compute the new `data` for an existing record
pub fn normalize_for_update(existing: &Value, shape: PayloadShape, now: DateTime<Utc>) -> Value {
    match shape {
        PayloadShape::Unified(data) => data,
        PayloadShape::Aggregated(data) => data,
        PayloadShape::Legacy(fields) => {
            let mut merged = existing.as_object().cloned().unwrap_or_default();

            for (key, field) in fields.entries() {
                if let LegacyField::Set(value) = field {
                    merged.insert(key.to_string(), value.clone());
                }
            }

            let mut metadata = merged
                .get("metadata")
                .and_then(Value::as_object)
                .cloned()
                .unwrap_or_default();
            metadata.insert("updatedAt".to_string(), Value::String(iso_timestamp(now)));
            merged.insert("metadata".to_string(), Value::Object(metadata));

            Value::Object(merged)
        }
    }
}

/// Millisecond ISO-8601 timestamp, e.g. `2024-03-01T10:00:00.000Z`
fn iso_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}
