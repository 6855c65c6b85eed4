//! Domain model for the CRM collections and the auth session.
//!
//! # Responsibility
//! - Define typed records stored in each collection and their drafts/patches.
//! - Provide the serde boundary between typed records and stored documents.
//!
//! # Invariants
//! - Every stored record has a stable `RecordId`, `created_at`, `updated_at`.
//! - Deletion is a hard removal; there are no tombstones.
//! - JSON field names are camelCase; index names refer to those names.

pub mod changelog;
pub mod contract;
pub mod member;
pub mod relation;
pub mod session;
pub mod setting;
pub mod user;

use crate::db::schema::CollectionDef;
use serde::de::DeserializeOwned;
use serde::Serialize;
use uuid::Uuid;

/// Stable identifier for every stored record.
pub type RecordId = Uuid;

/// A record type stored in one collection.
///
/// `Draft` is the record without `id`/`createdAt`/`updatedAt`; the generic
/// repository stamps those on create.
pub trait Entity: Serialize + DeserializeOwned + Clone + Send + Sync + 'static {
    const COLLECTION: CollectionDef;
    type Draft: Serialize + Send + Sync;

    fn id(&self) -> RecordId;
}

/// String form of a unit enum as it appears in stored documents and indices.
pub(crate) fn enum_key<T: Serialize>(value: &T) -> String {
    match serde_json::to_value(value) {
        Ok(serde_json::Value::String(key)) => key,
        Ok(other) => other.to_string(),
        Err(_) => String::new(),
    }
}
