//! Record service
//!
//! Authorization, validation and normalization in front of a `RecordStore`.
//! Every operation takes an `Owner`, which only `authorize` can produce, so
//! an unauthenticated or unkeyed request cannot reach the store.

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, warn};

use super::model::{DeletedRecord, NewRecord, Record, RecordFormat, RecordUpdate, RecordView};
use super::normalizer::{normalize_for_create, normalize_for_update};
use super::payload::RecordPayload;
use super::store::RecordStore;
use crate::auth::{ApiKeyValidator, CallerIdentity};
use crate::types::{Result, SkydeckError};

const UNAUTHORIZED_MESSAGE: &str = "Unauthorized - please log in";
const INVALID_API_KEY_MESSAGE: &str = "Invalid API Key";
const NO_DATA_MESSAGE: &str = "No data provided. Include nasa, weather, news, or data field.";
const NO_UPDATE_MESSAGE: &str = "No data to update";
const NOT_FOUND_MESSAGE: &str = "Record not found";

/// Settings injected into the record service
#[derive(Debug, Clone)]
pub struct RecordServiceConfig {
    pub api_keys: ApiKeyValidator,
    /// Maximum records returned by a list
    pub list_limit: i64,
}

/// An authenticated caller who also presented the application key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Owner {
    id: String,
}

impl Owner {
    pub fn id(&self) -> &str {
        &self.id
    }
}

pub struct RecordService {
    store: Arc<dyn RecordStore>,
    config: RecordServiceConfig,
}

impl RecordService {
    pub fn new(store: Arc<dyn RecordStore>, config: RecordServiceConfig) -> Self {
        Self { store, config }
    }

    pub fn store(&self) -> &Arc<dyn RecordStore> {
        &self.store
    }

    /// Gate for every record operation: session first, then the API key
    pub fn authorize(
        &self,
        caller: Option<&CallerIdentity>,
        api_key: Option<&str>,
    ) -> Result<Owner> {
        let Some(caller) = caller.filter(|c| !c.id.is_empty()) else {
            warn!("Records request without a session");
            return Err(SkydeckError::Unauthorized(UNAUTHORIZED_MESSAGE.into()));
        };

        if !self.config.api_keys.is_valid(api_key) {
            warn!(
                owner = %caller.id,
                key_present = api_key.is_some(),
                "Records request with invalid API key"
            );
            return Err(SkydeckError::Forbidden(INVALID_API_KEY_MESSAGE.into()));
        }

        Ok(Owner {
            id: caller.id.clone(),
        })
    }

    pub async fn create(&self, owner: &Owner, payload: RecordPayload) -> Result<Record> {
        let resolved = payload
            .resolve()
            .ok_or_else(|| SkydeckError::Validation(NO_DATA_MESSAGE.into()))?;

        let now = Utc::now();
        let new = NewRecord {
            owner_id: owner.id.clone(),
            format: RecordFormat::Structured,
            data: normalize_for_create(resolved.shape, now),
            timestamp: resolved.timestamp.unwrap_or(now),
        };

        let record = self.store.insert(new).await?;
        info!(owner = %owner.id, id = %record.id, "Created record");
        Ok(record)
    }

    /// Newest records of the owner, each with the legacy fields mirrored
    pub async fn list(&self, owner: &Owner) -> Result<Vec<RecordView>> {
        let records = self
            .store
            .find_recent_by_owner(&owner.id, self.config.list_limit)
            .await?;

        info!(owner = %owner.id, count = records.len(), "Listed records");
        Ok(records.into_iter().map(RecordView::from).collect())
    }

    pub async fn update(&self, owner: &Owner, id: &str, payload: RecordPayload) -> Result<Record> {
        let resolved = payload
            .resolve()
            .ok_or_else(|| SkydeckError::Validation(NO_UPDATE_MESSAGE.into()))?;

        let existing = self
            .store
            .find_by_id_and_owner(id, &owner.id)
            .await?
            .ok_or_else(not_found)?;

        let format = if resolved.carries_aggregated_data {
            RecordFormat::Aggregated
        } else {
            existing.format
        };
        let update = RecordUpdate {
            data: normalize_for_update(&existing.data, resolved.shape, Utc::now()),
            format,
        };

        // Deleted between the read and the write
        let record = self
            .store
            .update_by_id_and_owner(id, &owner.id, update)
            .await?
            .ok_or_else(not_found)?;

        info!(owner = %owner.id, id = %record.id, "Updated record");
        Ok(record)
    }

    pub async fn delete(&self, owner: &Owner, id: &str) -> Result<DeletedRecord> {
        let removed = self
            .store
            .delete_by_id_and_owner(id, &owner.id)
            .await?
            .ok_or_else(not_found)?;

        info!(owner = %owner.id, id = %removed.id, "Deleted record");
        Ok(DeletedRecord::new(removed.id))
    }
}

fn not_found() -> SkydeckError {
    SkydeckError::NotFound(NOT_FOUND_MESSAGE.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::MemoryRecordStore;
    use serde_json::{json, Value};
    use tokio_test::{assert_err, assert_ok};

    const KEY: &str = "test-app-key";

    fn service_with(store: Arc<MemoryRecordStore>, limit: i64) -> RecordService {
        RecordService::new(
            store,
            RecordServiceConfig {
                api_keys: ApiKeyValidator::new(Some(KEY.into())),
                list_limit: limit,
            },
        )
    }

    fn service() -> (RecordService, Arc<MemoryRecordStore>) {
        let store = Arc::new(MemoryRecordStore::new());
        (service_with(store.clone(), 20), store)
    }

    fn caller(id: &str) -> CallerIdentity {
        CallerIdentity {
            id: id.to_string(),
            display_name: None,
            email: None,
        }
    }

    fn owner(svc: &RecordService, id: &str) -> Owner {
        svc.authorize(Some(&caller(id)), Some(KEY)).unwrap()
    }

    fn payload(body: Value) -> RecordPayload {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_authorize_checks_session_before_key() {
        let (svc, _) = service();

        let err = svc.authorize(None, Some("wrong")).unwrap_err();
        assert!(matches!(err, SkydeckError::Unauthorized(ref m) if m == UNAUTHORIZED_MESSAGE));

        let err = svc.authorize(Some(&caller("")), Some(KEY)).unwrap_err();
        assert!(matches!(err, SkydeckError::Unauthorized(_)));

        let err = svc.authorize(Some(&caller("u1")), None).unwrap_err();
        assert!(matches!(err, SkydeckError::Forbidden(ref m) if m == INVALID_API_KEY_MESSAGE));

        let err = svc.authorize(Some(&caller("u1")), Some("wrong")).unwrap_err();
        assert!(matches!(err, SkydeckError::Forbidden(_)));

        assert_eq!(assert_ok!(svc.authorize(Some(&caller("u1")), Some(KEY))).id(), "u1");
    }

    #[test]
    fn test_unconfigured_key_rejects_everything() {
        let svc = RecordService::new(
            Arc::new(MemoryRecordStore::new()),
            RecordServiceConfig {
                api_keys: ApiKeyValidator::new(None),
                list_limit: 20,
            },
        );
        assert_err!(svc.authorize(Some(&caller("u1")), Some("")));
    }

    #[tokio::test]
    async fn test_create_without_content_touches_nothing() {
        let (svc, store) = service();
        let owner = owner(&svc, "u1");

        for body in [json!({}), json!({ "data": {} }), json!({ "nasa": null, "news": "" })] {
            let err = svc.create(&owner, payload(body)).await.unwrap_err();
            assert!(matches!(err, SkydeckError::Validation(ref m) if m == NO_DATA_MESSAGE));
        }
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_create_owner_comes_from_caller() {
        let (svc, _) = service();
        let owner = owner(&svc, "u1");

        let record = svc
            .create(
                &owner,
                payload(json!({ "data": { "a": 1 }, "userId": "intruder", "ownerId": "intruder" })),
            )
            .await
            .unwrap();

        assert_eq!(record.owner_id, "u1");
        assert_eq!(record.format, RecordFormat::Structured);
    }

    #[tokio::test]
    async fn test_create_then_list_round_trips_data() {
        let (svc, _) = service();
        let owner = owner(&svc, "u1");
        let data = json!({ "nasa": { "title": "Crab Nebula" }, "notes": ["x", 2, null] });

        svc.create(&owner, payload(json!({ "data": data.clone() }))).await.unwrap();

        let listed = svc.list(&owner).await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].record.data, data);
        assert_eq!(listed[0].nasa, json!({ "title": "Crab Nebula" }));
        assert_eq!(listed[0].weather, Value::Null);
    }

    #[tokio::test]
    async fn test_create_uses_client_timestamp() {
        let (svc, _) = service();
        let owner = owner(&svc, "u1");

        let record = svc
            .create(
                &owner,
                payload(json!({ "nasa": "apod", "timestamp": "2023-12-24T18:30:00Z" })),
            )
            .await
            .unwrap();

        assert_eq!(record.timestamp.to_rfc3339(), "2023-12-24T18:30:00+00:00");
        assert_eq!(record.data["metadata"]["source"], "Legacy Format");
    }

    #[tokio::test]
    async fn test_list_is_capped_and_newest_first() {
        let store = Arc::new(MemoryRecordStore::new());
        let svc = service_with(store, 20);
        let owner = owner(&svc, "u1");

        for i in 0..25 {
            svc.create(&owner, payload(json!({ "data": { "i": i } }))).await.unwrap();
        }

        let listed = svc.list(&owner).await.unwrap();
        assert_eq!(listed.len(), 20);
        assert_eq!(listed[0].record.data["i"], 24);
        assert_eq!(listed[19].record.data["i"], 5);
        assert!(listed
            .windows(2)
            .all(|w| w[0].record.created_at >= w[1].record.created_at));
    }

    #[tokio::test]
    async fn test_list_only_shows_own_records() {
        let (svc, _) = service();
        let alice = owner(&svc, "alice");
        let bob = owner(&svc, "bob");

        svc.create(&alice, payload(json!({ "data": { "who": "alice" } }))).await.unwrap();

        assert_eq!(svc.list(&alice).await.unwrap().len(), 1);
        assert!(svc.list(&bob).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_legacy_merge_then_full_replace() {
        let (svc, _) = service();
        let owner = owner(&svc, "u1");
        let created = svc
            .create(&owner, payload(json!({ "data": { "nasa": "A" } })))
            .await
            .unwrap();

        let merged = svc
            .update(&owner, &created.id, payload(json!({ "weather": "B" })))
            .await
            .unwrap();
        assert_eq!(merged.data["nasa"], "A");
        assert_eq!(merged.data["weather"], "B");
        assert!(merged.data["metadata"]["updatedAt"].is_string());
        assert_eq!(merged.format, RecordFormat::Structured);
        assert!(merged.updated_at >= created.updated_at);

        let replaced = svc
            .update(&owner, &created.id, payload(json!({ "data": { "onlyThis": true } })))
            .await
            .unwrap();
        assert_eq!(replaced.data, json!({ "onlyThis": true }));
    }

    #[tokio::test]
    async fn test_update_marks_aggregated() {
        let (svc, _) = service();
        let owner = owner(&svc, "u1");
        let created = svc.create(&owner, payload(json!({ "news": [1] }))).await.unwrap();

        let updated = svc
            .update(
                &owner,
                &created.id,
                payload(json!({ "aggregatedData": { "summary": "ok" } })),
            )
            .await
            .unwrap();
        assert_eq!(updated.format, RecordFormat::Aggregated);
        assert_eq!(updated.data, json!({ "summary": "ok" }));
    }

    #[tokio::test]
    async fn test_update_validation_and_not_found() {
        let (svc, store) = service();
        let alice = owner(&svc, "alice");
        let bob = owner(&svc, "bob");
        let created = svc.create(&alice, payload(json!({ "data": { "a": 1 } }))).await.unwrap();

        let err = svc.update(&alice, &created.id, payload(json!({}))).await.unwrap_err();
        assert!(matches!(err, SkydeckError::Validation(ref m) if m == NO_UPDATE_MESSAGE));

        let err = svc
            .update(&bob, &created.id, payload(json!({ "data": { "b": 2 } })))
            .await
            .unwrap_err();
        assert!(matches!(err, SkydeckError::NotFound(ref m) if m == NOT_FOUND_MESSAGE));

        let err = svc
            .update(&alice, "garbage-id", payload(json!({ "data": { "b": 2 } })))
            .await
            .unwrap_err();
        assert!(matches!(err, SkydeckError::NotFound(_)));

        let untouched = store.find_by_id_and_owner(&created.id, "alice").await.unwrap().unwrap();
        assert_eq!(untouched.data, json!({ "a": 1 }));
    }

    #[tokio::test]
    async fn test_odd_timestamps_do_not_fail_writes() {
        let (svc, _) = service();
        let owner = owner(&svc, "u1");
        let parse = |body: Value| RecordPayload::from_slice(body.to_string().as_bytes()).unwrap();

        let before = Utc::now();
        let blank = svc
            .create(&owner, parse(json!({ "data": { "a": 1 }, "timestamp": "" })))
            .await
            .unwrap();
        assert!(blank.timestamp >= before);

        let millis = svc
            .create(&owner, parse(json!({ "nasa": "apod", "timestamp": 1_700_000_000_000i64 })))
            .await
            .unwrap();
        assert_eq!(millis.timestamp.timestamp_millis(), 1_700_000_000_000);

        let updated = svc
            .update(&owner, &blank.id, parse(json!({ "weather": "rain", "timestamp": "" })))
            .await
            .unwrap();
        assert_eq!(updated.data["weather"], "rain");

        let updated = svc
            .update(
                &owner,
                &millis.id,
                parse(json!({ "data": { "b": 2 }, "timestamp": 1_700_000_000_000i64 })),
            )
            .await
            .unwrap();
        assert_eq!(updated.data, json!({ "b": 2 }));
        assert_eq!(updated.timestamp, millis.timestamp);
    }

    /// Removes the record right after handing it out, like a concurrent delete
    struct DeletingStore {
        inner: MemoryRecordStore,
    }

    #[async_trait::async_trait]
    impl RecordStore for DeletingStore {
        async fn insert(&self, record: NewRecord) -> Result<Record> {
            self.inner.insert(record).await
        }

        async fn find_recent_by_owner(&self, owner_id: &str, limit: i64) -> Result<Vec<Record>> {
            self.inner.find_recent_by_owner(owner_id, limit).await
        }

        async fn find_by_id_and_owner(&self, id: &str, owner_id: &str) -> Result<Option<Record>> {
            let found = self.inner.find_by_id_and_owner(id, owner_id).await?;
            self.inner.delete_by_id_and_owner(id, owner_id).await?;
            Ok(found)
        }

        async fn update_by_id_and_owner(
            &self,
            id: &str,
            owner_id: &str,
            update: RecordUpdate,
        ) -> Result<Option<Record>> {
            self.inner.update_by_id_and_owner(id, owner_id, update).await
        }

        async fn delete_by_id_and_owner(&self, id: &str, owner_id: &str) -> Result<Option<Record>> {
            self.inner.delete_by_id_and_owner(id, owner_id).await
        }

        fn backend_name(&self) -> &'static str {
            "deleting"
        }
    }

    #[tokio::test]
    async fn test_update_racing_delete_is_not_found() {
        let store = Arc::new(DeletingStore {
            inner: MemoryRecordStore::new(),
        });
        let svc = RecordService::new(
            store.clone(),
            RecordServiceConfig {
                api_keys: ApiKeyValidator::new(Some(KEY.into())),
                list_limit: 20,
            },
        );
        let owner = owner(&svc, "u1");
        let created = svc.create(&owner, payload(json!({ "data": { "a": 1 } }))).await.unwrap();

        let err = svc
            .update(&owner, &created.id, payload(json!({ "data": { "b": 2 } })))
            .await
            .unwrap_err();
        assert!(matches!(err, SkydeckError::NotFound(ref m) if m == NOT_FOUND_MESSAGE));
        assert!(store.inner.is_empty());
    }

    #[tokio::test]
    async fn test_delete() {
        let (svc, store) = service();
        let alice = owner(&svc, "alice");
        let bob = owner(&svc, "bob");
        let created = svc.create(&alice, payload(json!({ "data": { "a": 1 } }))).await.unwrap();

        let err = svc.delete(&bob, &created.id).await.unwrap_err();
        assert!(matches!(err, SkydeckError::NotFound(_)));
        assert_eq!(store.len(), 1);

        let deleted = svc.delete(&alice, &created.id).await.unwrap();
        assert_eq!(deleted.deleted_id, created.id);
        assert_eq!(deleted.message, "Record deleted successfully");
        assert!(store.is_empty());

        let err = svc.delete(&alice, &created.id).await.unwrap_err();
        assert!(matches!(err, SkydeckError::NotFound(_)));
    }
}
