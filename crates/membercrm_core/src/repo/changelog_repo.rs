//! Audit trail repository and field-diff helper.
//!
//! # Invariants
//! - Entries are append-only; nothing here updates an entry.
//! - Bookkeeping fields (`id`, `createdAt`, `updatedAt`) never show up in diffs.

use crate::model::changelog::{ChangeAction, ChangelogEntry, FieldChange, NewChangelogEntry};
use crate::model::RecordId;
use crate::repo::record_repo::{KeyRange, Repository};
use crate::repo::{RepoError, RepoResult};
use serde::Serialize;
use serde_json::Value;
use std::collections::BTreeSet;

const ENTITY_ID_INDEX: &str = "entityId";
const ENTITY_TYPE_INDEX: &str = "entityType";
const IGNORED_FIELDS: &[&str] = &["id", "createdAt", "updatedAt"];

#[derive(Clone)]
pub struct ChangelogRepository {
    records: Repository<ChangelogEntry>,
}

impl ChangelogRepository {
    pub fn new(records: Repository<ChangelogEntry>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &Repository<ChangelogEntry> {
        &self.records
    }

    pub async fn record(
        &self,
        entity_type: &str,
        entity_id: RecordId,
        action: ChangeAction,
        changes: Vec<FieldChange>,
        created_by: Option<RecordId>,
    ) -> RepoResult<ChangelogEntry> {
        if entity_type.trim().is_empty() {
            return Err(RepoError::validation("changelog entity type is required"));
        }
        self.records
            .create(&NewChangelogEntry {
                entity_type: entity_type.trim().to_string(),
                entity_id,
                action,
                changes,
                created_by,
            })
            .await
    }

    /// Diffs `before` against `after` and records an update entry.
    ///
    /// Returns `None` without writing when nothing changed.
    pub async fn record_update<T: Serialize>(
        &self,
        entity_type: &str,
        entity_id: RecordId,
        before: &T,
        after: &T,
        created_by: Option<RecordId>,
    ) -> RepoResult<Option<ChangelogEntry>> {
        let changes = diff_fields(&serde_json::to_value(before)?, &serde_json::to_value(after)?);
        if changes.is_empty() {
            return Ok(None);
        }
        self.record(entity_type, entity_id, ChangeAction::Update, changes, created_by)
            .await
            .map(Some)
    }

    /// Entries for one entity, newest first.
    pub async fn history(&self, entity_type: &str, entity_id: RecordId) -> RepoResult<Vec<ChangelogEntry>> {
        let mut entries: Vec<ChangelogEntry> = self
            .records
            .query(ENTITY_ID_INDEX, &KeyRange::only(entity_id.to_string()))
            .await?
            .into_iter()
            .filter(|entry| entry.entity_type == entity_type)
            .collect();
        entries.sort_by(|left, right| right.created_at.cmp(&left.created_at));
        Ok(entries)
    }

    /// Every entry for one entity type, oldest first.
    pub async fn entries_for_type(&self, entity_type: &str) -> RepoResult<Vec<ChangelogEntry>> {
        let mut entries = self
            .records
            .query(ENTITY_TYPE_INDEX, &KeyRange::only(entity_type))
            .await?;
        entries.sort_by(|left, right| left.created_at.cmp(&right.created_at));
        Ok(entries)
    }
}

/// Top-level field differences between two JSON objects.
///
/// Fields missing on one side are reported with `null` on that side.
/// Non-object inputs yield no changes.
pub fn diff_fields(before: &Value, after: &Value) -> Vec<FieldChange> {
    let (Some(before), Some(after)) = (before.as_object(), after.as_object()) else {
        return Vec::new();
    };
    let fields: BTreeSet<&String> = before.keys().chain(after.keys()).collect();
    fields
        .into_iter()
        .filter(|field| !IGNORED_FIELDS.contains(&field.as_str()))
        .filter_map(|field| {
            let old_value = before.get(field).cloned().unwrap_or(Value::Null);
            let new_value = after.get(field).cloned().unwrap_or(Value::Null);
            (old_value != new_value).then(|| FieldChange {
                field: field.clone(),
                old_value,
                new_value,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::diff_fields;
    use serde_json::json;

    #[test]
    fn diff_reports_changed_added_and_removed_fields() {
        let before = json!({"id": "1", "name": "Ana", "phone": "1", "notes": "x", "updatedAt": "a"});
        let after = json!({"id": "1", "name": "Ana", "phone": "2", "status": "active", "updatedAt": "b"});

        let changes = diff_fields(&before, &after);
        let fields: Vec<&str> = changes.iter().map(|change| change.field.as_str()).collect();
        assert_eq!(fields, vec!["notes", "phone", "status"]);
        assert_eq!(changes[0].new_value, json!(null));
        assert_eq!(changes[1].old_value, json!("1"));
        assert_eq!(changes[2].old_value, json!(null));
    }

    #[test]
    fn identical_records_have_no_diff() {
        let value = json!({"name": "Ana"});
        assert!(diff_fields(&value, &value).is_empty());
        assert!(diff_fields(&json!(1), &json!(2)).is_empty());
    }
}
