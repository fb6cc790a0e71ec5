//! Record document schema
//!
//! One saved dashboard snapshot. `data` is stored as-is; the schema
//! imposes nothing on its contents.

use bson::{doc, oid::ObjectId, DateTime, Document};
use mongodb::options::IndexOptions;
use serde::{Deserialize, Serialize};

use crate::db::mongo::{IntoIndexes, MutMetadata};
use crate::db::schemas::Metadata;
use crate::records::{NewRecord, Record, RecordFormat};

/// Collection name for records
pub const RECORD_COLLECTION: &str = "records";

/// Record document stored in MongoDB
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RecordDoc {
    /// MongoDB document ID
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,

    /// Creation/update timestamps
    #[serde(default)]
    pub metadata: Metadata,

    /// Owning user id from the identity provider
    pub user_id: String,

    /// Normalization path that produced `data`
    #[serde(default)]
    pub format: RecordFormat,

    /// Arbitrary JSON snapshot
    #[serde(default)]
    pub data: serde_json::Value,

    /// Capture time supplied by the client (or insert time)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<DateTime>,
}

impl RecordDoc {
    /// Build an unsaved document from a new record
    pub fn from_new(record: NewRecord) -> Self {
        Self {
            id: None,
            metadata: Metadata::default(),
            user_id: record.owner_id,
            format: record.format,
            data: record.data,
            timestamp: Some(DateTime::from_chrono(record.timestamp)),
        }
    }

    /// Convert into the domain record.
    ///
    /// Missing timestamps fall back to the creation time, then to the epoch.
    pub fn into_record(self) -> Record {
        let created_at = self
            .metadata
            .created_at
            .unwrap_or(DateTime::from_millis(0))
            .to_chrono();
        let updated_at = self
            .metadata
            .updated_at
            .map(DateTime::to_chrono)
            .unwrap_or(created_at);
        let timestamp = self
            .timestamp
            .map(DateTime::to_chrono)
            .unwrap_or(created_at);

        Record {
            id: self.id.map(|id| id.to_hex()).unwrap_or_default(),
            owner_id: self.user_id,
            format: self.format,
            data: self.data,
            timestamp,
            created_at,
            updated_at,
        }
    }
}

impl IntoIndexes for RecordDoc {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)> {
        vec![
            // Owner listing, newest first
            (
                doc! { "user_id": 1, "metadata.created_at": -1 },
                Some(
                    IndexOptions::builder()
                        .name("user_id_created_at".to_string())
                        .build(),
                ),
            ),
        ]
    }
}

impl MutMetadata for RecordDoc {
    fn mut_metadata(&mut self) -> &mut Metadata {
        &mut self.metadata
    }
}
