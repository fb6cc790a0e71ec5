//! MongoDB-backed record store

use bson::{doc, oid::ObjectId, Document};
use tracing::debug;

use super::model::{NewRecord, Record, RecordUpdate};
use super::store::RecordStore;
use crate::db::schemas::{RecordDoc, RECORD_COLLECTION};
use crate::db::{MongoClient, MongoCollection};
use crate::types::Result;

pub struct MongoRecordStore {
    collection: MongoCollection<RecordDoc>,
}

impl MongoRecordStore {
    /// Open the records collection, creating its indexes
    pub async fn new(mongo: &MongoClient) -> Result<Self> {
        let collection = mongo.collection::<RecordDoc>(RECORD_COLLECTION).await?;
        Ok(Self { collection })
    }
}

/// Filter for one record of one owner.
///
/// An id that is not a valid ObjectId cannot match anything, so it yields
/// `None` rather than an error.
fn owned_filter(id: &str, owner_id: &str) -> Option<Document> {
    let oid = ObjectId::parse_str(id).ok()?;
    Some(doc! { "_id": oid, "user_id": owner_id })
}

#[async_trait::async_trait]
impl RecordStore for MongoRecordStore {
    async fn insert(&self, record: NewRecord) -> Result<Record> {
        let (id, mut stored) = self.collection.insert_one(RecordDoc::from_new(record)).await?;
        stored.id = Some(id);
        debug!(id = %id, "Inserted record");
        Ok(stored.into_record())
    }

    async fn find_recent_by_owner(&self, owner_id: &str, limit: i64) -> Result<Vec<Record>> {
        let docs = self
            .collection
            .find_sorted(
                doc! { "user_id": owner_id },
                doc! { "metadata.created_at": -1, "_id": -1 },
                limit,
            )
            .await?;

        Ok(docs.into_iter().map(RecordDoc::into_record).collect())
    }

    async fn find_by_id_and_owner(&self, id: &str, owner_id: &str) -> Result<Option<Record>> {
        let Some(filter) = owned_filter(id, owner_id) else {
            return Ok(None);
        };
        Ok(self
            .collection
            .find_one(filter)
            .await?
            .map(RecordDoc::into_record))
    }

    async fn update_by_id_and_owner(
        &self,
        id: &str,
        owner_id: &str,
        update: RecordUpdate,
    ) -> Result<Option<Record>> {
        let Some(filter) = owned_filter(id, owner_id) else {
            return Ok(None);
        };
        let set = doc! {
            "data": bson::to_bson(&update.data)?,
            "format": bson::to_bson(&update.format)?,
        };

        Ok(self
            .collection
            .find_one_and_update(filter, set)
            .await?
            .map(RecordDoc::into_record))
    }

    async fn delete_by_id_and_owner(&self, id: &str, owner_id: &str) -> Result<Option<Record>> {
        let Some(filter) = owned_filter(id, owner_id) else {
            return Ok(None);
        };
        Ok(self
            .collection
            .find_one_and_delete(filter)
            .await?
            .map(RecordDoc::into_record))
    }

    fn backend_name(&self) -> &'static str {
        "mongodb"
    }
}
