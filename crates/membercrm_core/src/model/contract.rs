//! Contracts between the organization and a member.

use super::{Entity, RecordId};
use crate::db::schema::{self, CollectionDef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    Draft,
    Active,
    Expired,
    Terminated,
}

/// File stored inline with its contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attachment {
    /// Unique within one contract; used as the removal key.
    pub name: String,
    pub content_type: Option<String>,
    /// Base64 payload.
    pub data: String,
    pub added_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: RecordId,
    /// Soft reference; the member may have been deleted since.
    pub member_id: RecordId,
    pub title: String,
    pub content: String,
    pub status: ContractStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub amount: f64,
    pub payment_method: Option<String>,
    pub bank_account: Option<String>,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    pub created_by: Option<RecordId>,
    pub updated_by: Option<RecordId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractDraft {
    pub member_id: RecordId,
    pub title: String,
    pub content: String,
    pub status: ContractStatus,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub amount: f64,
    pub payment_method: Option<String>,
    pub bank_account: Option<String>,
    pub attachments: Vec<Attachment>,
    pub created_by: Option<RecordId>,
    pub updated_by: Option<RecordId>,
}

impl Entity for Contract {
    const COLLECTION: CollectionDef = schema::CONTRACTS;
    type Draft = ContractDraft;

    fn id(&self) -> RecordId {
        self.id
    }
}

/// Input for `ContractRepository::create_contract`; `status` defaults to `Draft`.
#[derive(Debug, Clone, PartialEq)]
pub struct NewContract {
    pub member_id: RecordId,
    pub title: String,
    pub content: String,
    pub status: Option<ContractStatus>,
    pub start_date: DateTime<Utc>,
    pub end_date: Option<DateTime<Utc>>,
    pub amount: f64,
    pub payment_method: Option<String>,
    pub bank_account: Option<String>,
    pub created_by: Option<RecordId>,
}

impl NewContract {
    pub fn new(member_id: RecordId, title: impl Into<String>, start_date: DateTime<Utc>) -> Self {
        Self {
            member_id,
            title: title.into(),
            content: String::new(),
            status: None,
            start_date,
            end_date: None,
            amount: 0.0,
            payment_method: None,
            bank_account: None,
            created_by: None,
        }
    }
}

/// Content-level partial update. Nested options clear optional fields.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContractPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub end_date: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bank_account: Option<Option<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<RecordId>,
}
