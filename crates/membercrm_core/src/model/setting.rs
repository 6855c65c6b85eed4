//! Application settings keyed by a unique name.

use super::{Entity, RecordId};
use crate::db::schema::{self, CollectionDef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Setting {
    pub id: RecordId,
    pub key: String,
    /// Opaque to core; interpreted by the UI.
    pub value: Value,
    pub updated_by: Option<RecordId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingDraft {
    pub key: String,
    pub value: Value,
    pub updated_by: Option<RecordId>,
}

impl Entity for Setting {
    const COLLECTION: CollectionDef = schema::SETTINGS;
    type Draft = SettingDraft;

    fn id(&self) -> RecordId {
        self.id
    }
}
