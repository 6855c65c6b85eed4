//! Member relations repository.
//!
//! # Invariants
//! - One record per directed edge; no mirrored reverse record is written.
//! - Self-edges and duplicate edges of the same type are rejected.

use crate::model::relation::{NewRelation, Relation};
use crate::model::RecordId;
use crate::repo::record_repo::{KeyRange, Repository};
use crate::repo::{RepoError, RepoResult};
use std::collections::BTreeMap;

const MEMBER_INDEX: &str = "memberId";
const RELATED_MEMBER_INDEX: &str = "relatedMemberId";

#[derive(Clone)]
pub struct RelationRepository {
    records: Repository<Relation>,
}

impl RelationRepository {
    pub fn new(records: Repository<Relation>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &Repository<Relation> {
        &self.records
    }

    pub async fn create_relation(&self, input: &NewRelation) -> RepoResult<Relation> {
        if input.member_id == input.related_member_id {
            return Err(RepoError::validation("a member cannot be related to itself"));
        }
        let relation_type = input.relation_type.trim();
        if relation_type.is_empty() {
            return Err(RepoError::validation("relation type is required"));
        }
        let duplicate = self
            .find_outgoing(input.member_id)
            .await?
            .into_iter()
            .any(|edge| {
                edge.related_member_id == input.related_member_id
                    && edge.relation_type == relation_type
            });
        if duplicate {
            return Err(RepoError::DuplicateKey {
                collection: self.records.collection(),
                index: MEMBER_INDEX,
                key: format!(
                    "{}->{} ({relation_type})",
                    input.member_id, input.related_member_id
                ),
            });
        }

        self.records
            .create(&NewRelation {
                relation_type: relation_type.to_string(),
                ..input.clone()
            })
            .await
    }

    /// Edges starting at `member_id`.
    pub async fn find_outgoing(&self, member_id: RecordId) -> RepoResult<Vec<Relation>> {
        self.records
            .query(MEMBER_INDEX, &KeyRange::only(member_id.to_string()))
            .await
    }

    /// Edges pointing at `member_id`.
    pub async fn find_incoming(&self, member_id: RecordId) -> RepoResult<Vec<Relation>> {
        self.records
            .query(RELATED_MEMBER_INDEX, &KeyRange::only(member_id.to_string()))
            .await
    }

    /// Every edge touching `member_id`, in either direction, without repeats.
    pub async fn relations_for_member(&self, member_id: RecordId) -> RepoResult<Vec<Relation>> {
        let mut edges: BTreeMap<RecordId, Relation> = BTreeMap::new();
        for edge in self.find_outgoing(member_id).await? {
            edges.insert(edge.id, edge);
        }
        for edge in self.find_incoming(member_id).await? {
            edges.insert(edge.id, edge);
        }
        Ok(edges.into_values().collect())
    }

    /// Removes every edge touching `member_id` in one transaction.
    pub async fn delete_relations_for_member(&self, member_id: RecordId) -> RepoResult<usize> {
        let ids: Vec<RecordId> = self
            .relations_for_member(member_id)
            .await?
            .into_iter()
            .map(|edge| edge.id)
            .collect();
        self.records.bulk_delete(&ids).await?;
        Ok(ids.len())
    }

    pub async fn delete(&self, id: RecordId) -> RepoResult<()> {
        self.records.delete(id).await
    }
}
