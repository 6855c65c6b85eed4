//! Field-level audit trail for members and contracts.

use super::{Entity, RecordId};
use crate::db::schema::{self, CollectionDef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeAction {
    Create,
    Update,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FieldChange {
    pub field: String,
    pub old_value: Value,
    pub new_value: Value,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangelogEntry {
    pub id: RecordId,
    /// Collection-level kind, e.g. `member` or `contract`.
    pub entity_type: String,
    pub entity_id: RecordId,
    pub action: ChangeAction,
    #[serde(default)]
    pub changes: Vec<FieldChange>,
    pub created_by: Option<RecordId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewChangelogEntry {
    pub entity_type: String,
    pub entity_id: RecordId,
    pub action: ChangeAction,
    pub changes: Vec<FieldChange>,
    pub created_by: Option<RecordId>,
}

impl Entity for ChangelogEntry {
    const COLLECTION: CollectionDef = schema::CHANGELOG;
    type Draft = NewChangelogEntry;

    fn id(&self) -> RecordId {
        self.id
    }
}
