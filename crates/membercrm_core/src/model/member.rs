//! Member records and their derived display state.
//!
//! # Invariants
//! - `id_number` is stored trimmed and upper-cased; unique across members.
//! - Display state is derived by `member_state`, never stored.

use super::{Entity, RecordId};
use crate::db::schema::{self, CollectionDef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberType {
    Regular,
    Premium,
    Corporate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberStatus {
    /// Registered but awaiting review.
    Pending,
    Active,
    Inactive,
    Suspended,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    pub id: RecordId,
    pub name: String,
    pub phone: String,
    pub id_number: String,
    pub member_type: MemberType,
    pub status: MemberStatus,
    pub expiry_date: Option<DateTime<Utc>>,
    #[serde(default)]
    pub notes: String,
    pub created_by: Option<RecordId>,
    pub updated_by: Option<RecordId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberDraft {
    pub name: String,
    pub phone: String,
    pub id_number: String,
    pub member_type: MemberType,
    pub status: MemberStatus,
    pub expiry_date: Option<DateTime<Utc>>,
    pub notes: String,
    pub created_by: Option<RecordId>,
    pub updated_by: Option<RecordId>,
}

impl Entity for Member {
    const COLLECTION: CollectionDef = schema::MEMBERS;
    type Draft = MemberDraft;

    fn id(&self) -> RecordId {
        self.id
    }
}

/// Input for `MemberRepository::create_member`.
///
/// `status` defaults to `Active` when omitted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewMember {
    pub name: String,
    pub phone: String,
    pub id_number: String,
    pub member_type: MemberType,
    pub status: Option<MemberStatus>,
    pub expiry_date: Option<DateTime<Utc>>,
    pub notes: String,
    pub created_by: Option<RecordId>,
}

impl NewMember {
    pub fn new(
        name: impl Into<String>,
        phone: impl Into<String>,
        id_number: impl Into<String>,
        member_type: MemberType,
    ) -> Self {
        Self {
            name: name.into(),
            phone: phone.into(),
            id_number: id_number.into(),
            member_type,
            status: None,
            expiry_date: None,
            notes: String::new(),
            created_by: None,
        }
    }
}

/// Partial update. `expiry_date: Some(None)` clears the expiry.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MemberPatch {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub member_type: Option<MemberType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status: Option<MemberStatus>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<Option<DateTime<Utc>>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub updated_by: Option<RecordId>,
}

/// State shown to operators, derived from status and expiry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MemberState {
    /// Awaiting review (`pending`).
    Review,
    /// Active with a future expiry date.
    Active,
    /// Active without any expiry date.
    Enabled,
    /// Inactive, suspended, or past its expiry date.
    Disabled,
}

pub fn member_state(member: &Member, now: DateTime<Utc>) -> MemberState {
    match member.status {
        MemberStatus::Pending => MemberState::Review,
        MemberStatus::Inactive | MemberStatus::Suspended => MemberState::Disabled,
        MemberStatus::Active => match member.expiry_date {
            Some(expiry) if expiry < now => MemberState::Disabled,
            Some(_) => MemberState::Active,
            None => MemberState::Enabled,
        },
    }
}
