//! Saved dashboard records
//!
//! A record is a JSON snapshot of feed data owned by one user. Clients from
//! three eras send three payload shapes (unified `data`, `aggregatedData`,
//! legacy flat `nasa`/`weather`/`news`); they are resolved into a single
//! `PayloadShape` at the boundary and normalized into one persisted form.
//!
//! ```text
//! route ─► RecordService::authorize ─► Owner
//!                 │
//!                 ├─► RecordPayload::resolve ─► PayloadShape
//!                 ├─► normalizer (pure)
//!                 └─► RecordStore (MongoDB | memory)
//! ```

pub mod model;
pub mod mongo_store;
pub mod normalizer;
pub mod payload;
pub mod service;
pub mod store;

pub use model::{DeletedRecord, NewRecord, Record, RecordFormat, RecordUpdate, RecordView};
pub use mongo_store::MongoRecordStore;
pub use normalizer::{has_content, is_non_empty, normalize_for_create, normalize_for_update};
pub use payload::{LegacyField, LegacyFields, PayloadShape, RecordPayload, ResolvedPayload};
pub use service::{Owner, RecordService, RecordServiceConfig};
pub use store::{MemoryRecordStore, RecordStore};
