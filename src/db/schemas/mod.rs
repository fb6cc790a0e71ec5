//! Database schemas for Skydeck
//!
//! Defines the MongoDB document structures.

mod metadata;
mod record;

pub use metadata::Metadata;
pub use record::{RecordDoc, RECORD_COLLECTION};
