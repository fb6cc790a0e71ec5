//! Record storage
//!
//! `RecordStore` is the seam between the service and persistence. Every
//! lookup is scoped by owner: a record that exists but belongs to someone
//! else is indistinguishable from one that does not exist.

use std::sync::atomic::{AtomicU64, Ordering};

use bson::oid::ObjectId;
use chrono::Utc;
use dashmap::DashMap;
use tracing::debug;

use super::model::{NewRecord, Record, RecordUpdate};
use crate::types::Result;

/// Storage backend for records
#[async_trait::async_trait]
pub trait RecordStore: Send + Sync {
    /// Persist a new record, assigning its id and timestamps
    async fn insert(&self, record: NewRecord) -> Result<Record>;

    /// Most recently created records of one owner, newest first
    async fn find_recent_by_owner(&self, owner_id: &str, limit: i64) -> Result<Vec<Record>>;

    async fn find_by_id_and_owner(&self, id: &str, owner_id: &str) -> Result<Option<Record>>;

    /// Replace `data` and `format` and bump `updated_at`; returns the updated record
    async fn update_by_id_and_owner(
        &self,
        id: &str,
        owner_id: &str,
        update: RecordUpdate,
    ) -> Result<Option<Record>>;

    /// Remove the record; returns what was removed
    async fn delete_by_id_and_owner(&self, id: &str, owner_id: &str) -> Result<Option<Record>>;

    /// Short backend name for health output
    fn backend_name(&self) -> &'static str;
}

#[derive(Debug, Clone)]
struct StoredRecord {
    record: Record,
    /// Insertion order, breaks ties between equal creation times
    seq: u64,
}

/// In-memory record store for dev mode and tests
pub struct MemoryRecordStore {
    records: DashMap<String, StoredRecord>,
    next_seq: AtomicU64,
}

impl MemoryRecordStore {
    pub fn new() -> Self {
        Self {
            records: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl Default for MemoryRecordStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RecordStore for MemoryRecordStore {
    async fn insert(&self, new: NewRecord) -> Result<Record> {
        let now = Utc::now();
        let record = Record {
            id: ObjectId::new().to_hex(),
            owner_id: new.owner_id,
            format: new.format,
            data: new.data,
            timestamp: new.timestamp,
            created_at: now,
            updated_at: now,
        };
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);

        self.records.insert(
            record.id.clone(),
            StoredRecord {
                record: record.clone(),
                seq,
            },
        );
        debug!(id = %record.id, "Stored record in memory");

        Ok(record)
    }

    async fn find_recent_by_owner(&self, owner_id: &str, limit: i64) -> Result<Vec<Record>> {
        let mut owned: Vec<StoredRecord> = self
            .records
            .iter()
            .filter(|entry| entry.record.owner_id == owner_id)
            .map(|entry| entry.value().clone())
            .collect();

        owned.sort_by(|a, b| {
            (b.record.created_at, b.seq).cmp(&(a.record.created_at, a.seq))
        });

        Ok(owned
            .into_iter()
            .take(usize::try_from(limit).unwrap_or(0))
            .map(|stored| stored.record)
            .collect())
    }

    async fn find_by_id_and_owner(&self, id: &str, owner_id: &str) -> Result<Option<Record>> {
        Ok(self
            .records
            .get(id)
            .filter(|entry| entry.record.owner_id == owner_id)
            .map(|entry| entry.record.clone()))
    }

    async fn update_by_id_and_owner(
        &self,
        id: &str,
        owner_id: &str,
        update: RecordUpdate,
    ) -> Result<Option<Record>> {
        let Some(mut entry) = self.records.get_mut(id) else {
            return Ok(None);
        };
        if entry.record.owner_id != owner_id {
            return Ok(None);
        }

        let record = &mut entry.record;
        record.data = update.data;
        record.format = update.format;
        record.updated_at = Utc::now().max(record.updated_at);

        Ok(Some(record.clone()))
    }

    async fn delete_by_id_and_owner(&self, id: &str, owner_id: &str) -> Result<Option<Record>> {
        Ok(self
            .records
            .remove_if(id, |_, stored| stored.record.owner_id == owner_id)
            .map(|(_, stored)| stored.record))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}
