//! Directed member-to-member relations.
//!
//! One record per edge. The reverse view ("who points at this member") is
//! answered by the `relatedMemberId` index instead of a mirrored record.

use super::{Entity, RecordId};
use crate::db::schema::{self, CollectionDef};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Relation {
    pub id: RecordId,
    pub member_id: RecordId,
    pub related_member_id: RecordId,
    /// Free-form label such as `spouse` or `guarantor`.
    pub relation_type: String,
    #[serde(default)]
    pub notes: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Relation {
    /// The endpoint that is not `member`, if `member` is on this edge.
    pub fn other_end(&self, member: RecordId) -> Option<RecordId> {
        if self.member_id == member {
            Some(self.related_member_id)
        } else if self.related_member_id == member {
            Some(self.member_id)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewRelation {
    pub member_id: RecordId,
    pub related_member_id: RecordId,
    pub relation_type: String,
    pub notes: String,
}

impl Entity for Relation {
    const COLLECTION: CollectionDef = schema::RELATIONS;
    type Draft = NewRelation;

    fn id(&self) -> RecordId {
        self.id
    }
}
