//! MongoDB client and collection wrapper

use bson::{doc, oid::ObjectId, Document};
use futures_util::TryStreamExt;
use mongodb::{
    options::{IndexOptions, ReturnDocument, UpdateModifications},
    Client, Collection, IndexModel,
};
use serde::{de::DeserializeOwned, Serialize};
use tracing::info;

use crate::db::schemas::Metadata;
use crate::types::SkydeckError;

/// Trait for schemas that provide index definitions
pub trait IntoIndexes {
    fn into_indices() -> Vec<(Document, Option<IndexOptions>)>;
}

/// Trait for schemas with mutable metadata
pub trait MutMetadata {
    fn mut_metadata(&mut self) -> &mut Metadata;
}

/// MongoDB client wrapper
#[derive(Clone)]
pub struct MongoClient {
    client: Client,
    db_name: String,
}

impl MongoClient {
    /// Connect and verify the server answers a ping
    pub async fn new(uri: &str, db_name: &str) -> Result<Self, SkydeckError> {
        info!("Connecting to MongoDB");

        // Fail fast instead of hanging on an unreachable server
        let timeout_uri = if uri.contains('?') {
            format!("{}&serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        } else {
            format!("{}?serverSelectionTimeoutMS=3000&connectTimeoutMS=3000", uri)
        };

        let client = Client::with_uri_str(&timeout_uri)
            .await
            .map_err(|e| SkydeckError::Store(format!("Failed to connect to MongoDB: {}", e)))?;

        client
            .database(db_name)
            .run_command(doc! { "ping": 1 })
            .await
            .map_err(|e| SkydeckError::Store(format!("MongoDB ping failed: {}", e)))?;

        info!("Connected to MongoDB database '{}'", db_name);

        Ok(Self {
            client,
            db_name: db_name.to_string(),
        })
    }

    /// Get a typed collection, creating its indexes
    pub async fn collection<T>(&self, name: &str) -> Result<MongoCollection<T>, SkydeckError>
    where
        T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
    {
        MongoCollection::new(&self.client, &self.db_name, name).await
    }

    /// Get the database name
    pub fn db_name(&self) -> &str {
        &self.db_name
    }
}

/// Typed MongoDB collection with automatic indexing
#[derive(Debug, Clone)]
pub struct MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync,
{
    inner: Collection<T>,
}

impl<T> MongoCollection<T>
where
    T: Serialize + DeserializeOwned + Unpin + Send + Sync + IntoIndexes + MutMetadata,
{
    /// Create a new collection and apply indexes
    pub async fn new(
        client: &Client,
        db_name: &str,
        collection_name: &str,
    ) -> Result<Self, SkydeckError> {
        let collection = client.database(db_name).collection::<T>(collection_name);
        let mongo_collection = MongoCollection { inner: collection };

        mongo_collection.apply_indexes().await?;

        Ok(mongo_collection)
    }

    /// Apply schema-defined indexes
    async fn apply_indexes(&self) -> Result<(), SkydeckError> {
        let schema_indices = T::into_indices();

        if schema_indices.is_empty() {
            return Ok(());
        }

        let indices: Vec<IndexModel> = schema_indices
            .into_iter()
            .map(|(keys, opts)| IndexModel::builder().keys(keys).options(opts).build())
            .collect();

        self.inner
            .create_indexes(indices)
            .await
            .map_err(|e| SkydeckError::Store(format!("Failed to create indexes: {}", e)))?;

        Ok(())
    }

    /// Insert a document, stamping metadata timestamps.
    ///
    /// Returns the generated id and the document as stored.
    pub async fn insert_one(&self, mut item: T) -> Result<(ObjectId, T), SkydeckError> {
        *item.mut_metadata() = Metadata::new();

        let result = self
            .inner
            .insert_one(&item)
            .await
            .map_err(|e| SkydeckError::Store(format!("Insert failed: {}", e)))?;

        let id = result
            .inserted_id
            .as_object_id()
            .ok_or_else(|| SkydeckError::Store("Failed to get inserted ID".into()))?;

        Ok((id, item))
    }

    /// Find one document by filter
    pub async fn find_one(&self, filter: Document) -> Result<Option<T>, SkydeckError> {
        self.inner
            .find_one(filter)
            .await
            .map_err(|e| SkydeckError::Store(format!("Find failed: {}", e)))
    }

    /// Find documents by filter with a sort order and a cap
    pub async fn find_sorted(
        &self,
        filter: Document,
        sort: Document,
        limit: i64,
    ) -> Result<Vec<T>, SkydeckError> {
        let cursor = self
            .inner
            .find(filter)
            .sort(sort)
            .limit(limit)
            .await
            .map_err(|e| SkydeckError::Store(format!("Find failed: {}", e)))?;

        cursor
            .try_collect()
            .await
            .map_err(|e| SkydeckError::Store(format!("Reading documents failed: {}", e)))
    }

    /// Atomically update the single match and return it as updated.
    ///
    /// `metadata.updated_at` is set from the server clock in the same
    /// operation, so it never moves backwards between writers.
    pub async fn find_one_and_update(
        &self,
        filter: Document,
        mut set: Document,
    ) -> Result<Option<T>, SkydeckError> {
        set.remove("metadata.updated_at");
        let update = UpdateModifications::Document(doc! {
            "$set": set,
            "$currentDate": { "metadata.updated_at": true },
        });

        self.inner
            .find_one_and_update(filter, update)
            .return_document(ReturnDocument::After)
            .await
            .map_err(|e| SkydeckError::Store(format!("Update failed: {}", e)))
    }

    /// Atomically delete the single match and return it
    pub async fn find_one_and_delete(&self, filter: Document) -> Result<Option<T>, SkydeckError> {
        self.inner
            .find_one_and_delete(filter)
            .await
            .map_err(|e| SkydeckError::Store(format!("Delete failed: {}", e)))
    }
}

