//! Key-value application settings.
//!
//! # Invariants
//! - At most one record per `key`; `set` updates in place.

use crate::model::setting::{Setting, SettingDraft};
use crate::model::RecordId;
use crate::repo::record_repo::Repository;
use crate::repo::{RepoError, RepoResult};
use serde::Serialize;
use serde_json::Value;

const KEY_INDEX: &str = "key";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ValuePatch<'a> {
    value: &'a Value,
    updated_by: Option<RecordId>,
}

#[derive(Clone)]
pub struct SettingsRepository {
    records: Repository<Setting>,
}

impl SettingsRepository {
    pub fn new(records: Repository<Setting>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &Repository<Setting> {
        &self.records
    }

    pub async fn get(&self, key: &str) -> RepoResult<Option<Setting>> {
        self.records.get_by_index(KEY_INDEX, key.trim()).await
    }

    pub async fn get_value(&self, key: &str) -> RepoResult<Option<Value>> {
        Ok(self.get(key).await?.map(|setting| setting.value))
    }

    /// Inserts or replaces the value stored under `key`.
    pub async fn set(&self, key: &str, value: Value, updated_by: Option<RecordId>) -> RepoResult<Setting> {
        let key = key.trim();
        if key.is_empty() {
            return Err(RepoError::validation("setting key is required"));
        }
        match self.get(key).await? {
            Some(existing) => {
                self.records
                    .update(
                        existing.id,
                        &ValuePatch {
                            value: &value,
                            updated_by,
                        },
                    )
                    .await
            }
            None => {
                self.records
                    .create(&SettingDraft {
                        key: key.to_string(),
                        value,
                        updated_by,
                    })
                    .await
            }
        }
    }

    /// Deletes the setting; returns whether it existed.
    pub async fn remove(&self, key: &str) -> RepoResult<bool> {
        match self.get(key).await? {
            Some(existing) => {
                self.records.delete(existing.id).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
