//! Record types as seen by the service and on the wire

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Which normalization path produced a record's `data`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordFormat {
    /// Saved by the current client (unified envelope)
    Structured,
    /// Last written from an `aggregatedData` payload
    Aggregated,
    #[default]
    Legacy,
}

/// A persisted record.
///
/// Field names on the wire follow what the dashboard client reads
/// (`_id`, `userId`, camelCase timestamps).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Record {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "userId")]
    pub owner_id: String,
    pub format: RecordFormat,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
    #[serde(rename = "createdAt")]
    pub created_at: DateTime<Utc>,
    #[serde(rename = "updatedAt")]
    pub updated_at: DateTime<Utc>,
}

/// A list entry: the record plus the legacy flat fields mirrored from `data`
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RecordView {
    #[serde(flatten)]
    pub record: Record,
    pub nasa: Value,
    pub weather: Value,
    pub news: Value,
}

impl From<Record> for RecordView {
    fn from(record: Record) -> Self {
        let mirror = |key: &str| record.data.get(key).cloned().unwrap_or(Value::Null);
        let (nasa, weather, news) = (mirror("nasa"), mirror("weather"), mirror("news"));
        Self {
            record,
            nasa,
            weather,
            news,
        }
    }
}

/// Everything the store needs to insert a record; id and timestamps are its own
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    pub owner_id: String,
    pub format: RecordFormat,
    pub data: Value,
    pub timestamp: DateTime<Utc>,
}

/// Fields replaced by an update
#[derive(Debug, Clone, PartialEq)]
pub struct RecordUpdate {
    pub data: Value,
    pub format: RecordFormat,
}

/// Response body for a successful delete
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletedRecord {
    pub message: String,
    pub deleted_id: String,
}

impl DeletedRecord {
    pub fn new(deleted_id: String) -> Self {
        Self {
            message: "Record deleted successfully".to_string(),
            deleted_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample(data: Value) -> Record {
        let now = Utc::now();
        Record {
            id: "665f1c2e9b1e8a3d4c5b6a79".into(),
            owner_id: "user-1".into(),
            format: RecordFormat::Structured,
            data,
            timestamp: now,
            created_at: now,
            updated_at: now,
        }
    }

    #[test]
    fn test_view_mirrors_legacy_fields() {
        let view = RecordView::from(sample(json!({ "nasa": { "title": "Orion" }, "news": [] })));
        assert_eq!(view.nasa, json!({ "title": "Orion" }));
        assert_eq!(view.news, json!([]));
        assert_eq!(view.weather, Value::Null);
    }

    #[test]
    fn test_view_of_non_object_data() {
        let view = RecordView::from(sample(json!([1, 2, 3])));
        assert_eq!(view.nasa, Value::Null);
    }

    #[test]
    fn test_wire_field_names() {
        let body = serde_json::to_value(RecordView::from(sample(json!({ "weather": 21 })))).unwrap();
        assert_eq!(body["_id"], "665f1c2e9b1e8a3d4c5b6a79");
        assert_eq!(body["userId"], "user-1");
        assert_eq!(body["format"], "structured");
        assert_eq!(body["weather"], 21);
        assert!(body.get("createdAt").is_some());
        assert!(body.get("updatedAt").is_some());
    }

    #[test]
    fn test_deleted_record_body() {
        let body = serde_json::to_value(DeletedRecord::new("abc".into())).unwrap();
        assert_eq!(body, json!({ "message": "Record deleted successfully", "deletedId": "abc" }));
    }
}
