//! Members repository.
//!
//! # Responsibility
//! - Normalize and enforce uniqueness of `id_number`.
//! - Provide type/status lookups, expiry scans and free-text search.
//!
//! # Invariants
//! - Stored `id_number` values are trimmed and upper-cased.
//! - Expiry queries scan the full collection; there is no date index.

use crate::model::enum_key;
use crate::model::member::{
    Member, MemberDraft, MemberPatch, MemberStatus, MemberType, NewMember,
};
use crate::model::RecordId;
use crate::repo::record_repo::{KeyRange, Repository};
use crate::repo::{contains_folded, days_from, RepoError, RepoResult};
use chrono::{DateTime, Utc};

const ID_NUMBER_INDEX: &str = "idNumber";
const TYPE_INDEX: &str = "memberType";
const STATUS_INDEX: &str = "status";

#[derive(Clone)]
pub struct MemberRepository {
    records: Repository<Member>,
}

impl MemberRepository {
    pub fn new(records: Repository<Member>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &Repository<Member> {
        &self.records
    }

    pub async fn get_by_id(&self, id: RecordId) -> RepoResult<Option<Member>> {
        self.records.get_by_id(id).await
    }

    pub async fn get_all(&self) -> RepoResult<Vec<Member>> {
        self.records.get_all().await
    }

    pub async fn delete(&self, id: RecordId) -> RepoResult<()> {
        self.records.delete(id).await
    }

    /// Case-insensitive lookup by national/registration id number.
    pub async fn find_by_id_number(&self, id_number: &str) -> RepoResult<Option<Member>> {
        self.records
            .get_by_index(ID_NUMBER_INDEX, &normalize_id_number(id_number))
            .await
    }

    pub async fn find_by_type(&self, member_type: MemberType) -> RepoResult<Vec<Member>> {
        self.records
            .query(TYPE_INDEX, &KeyRange::only(enum_key(&member_type)))
            .await
    }

    pub async fn find_by_status(&self, status: MemberStatus) -> RepoResult<Vec<Member>> {
        self.records
            .query(STATUS_INDEX, &KeyRange::only(enum_key(&status)))
            .await
    }

    pub async fn create_member(&self, input: &NewMember) -> RepoResult<Member> {
        let id_number = normalize_id_number(&input.id_number);
        if id_number.is_empty() {
            return Err(RepoError::validation("member id number is required"));
        }
        let name = input.name.trim();
        if name.is_empty() {
            return Err(RepoError::validation("member name is required"));
        }
        self.ensure_id_number_free(&id_number, None).await?;

        self.records
            .create(&MemberDraft {
                name: name.to_string(),
                phone: input.phone.trim().to_string(),
                id_number,
                member_type: input.member_type,
                status: input.status.unwrap_or(MemberStatus::Active),
                expiry_date: input.expiry_date,
                notes: input.notes.clone(),
                created_by: input.created_by,
                updated_by: input.created_by,
            })
            .await
    }

    /// General patch; a changed id number is normalized and must stay unique.
    pub async fn update_member(&self, id: RecordId, patch: &MemberPatch) -> RepoResult<Member> {
        let mut patch = patch.clone();
        if let Some(id_number) = patch.id_number.as_deref() {
            let id_number = normalize_id_number(id_number);
            if id_number.is_empty() {
                return Err(RepoError::validation("member id number is required"));
            }
            self.ensure_id_number_free(&id_number, Some(id)).await?;
            patch.id_number = Some(id_number);
        }
        if let Some(name) = patch.name.as_deref() {
            let name = name.trim();
            if name.is_empty() {
                return Err(RepoError::validation("member name is required"));
            }
            patch.name = Some(name.to_string());
        }
        if let Some(phone) = patch.phone.as_deref() {
            patch.phone = Some(phone.trim().to_string());
        }
        self.records.update(id, &patch).await
    }

    pub async fn update_status(&self, id: RecordId, status: MemberStatus) -> RepoResult<Member> {
        self.records
            .update(
                id,
                &MemberPatch {
                    status: Some(status),
                    ..MemberPatch::default()
                },
            )
            .await
    }

    pub async fn update_type(&self, id: RecordId, member_type: MemberType) -> RepoResult<Member> {
        self.records
            .update(
                id,
                &MemberPatch {
                    member_type: Some(member_type),
                    ..MemberPatch::default()
                },
            )
            .await
    }

    /// `None` removes the expiry date.
    pub async fn update_expiry_date(
        &self,
        id: RecordId,
        expiry_date: Option<DateTime<Utc>>,
    ) -> RepoResult<Member> {
        self.records
            .update(
                id,
                &MemberPatch {
                    expiry_date: Some(expiry_date),
                    ..MemberPatch::default()
                },
            )
            .await
    }

    /// Members whose expiry falls within `[now, now + days_threshold]`.
    pub async fn get_expiring_members(&self, days_threshold: i64) -> RepoResult<Vec<Member>> {
        let now = self.records.now();
        let horizon = days_from(now, days_threshold);
        let members = self.records.get_all().await?;
        Ok(members
            .into_iter()
            .filter(|member| {
                member
                    .expiry_date
                    .is_some_and(|expiry| expiry >= now && expiry <= horizon)
            })
            .collect())
    }

    /// Members whose expiry date is already in the past.
    pub async fn get_expired_members(&self) -> RepoResult<Vec<Member>> {
        let now = self.records.now();
        let members = self.records.get_all().await?;
        Ok(members
            .into_iter()
            .filter(|member| member.expiry_date.is_some_and(|expiry| expiry < now))
            .collect())
    }

    /// Case-insensitive substring match over name, id number and phone.
    ///
    /// A blank query returns every member.
    pub async fn search_members(&self, query: &str) -> RepoResult<Vec<Member>> {
        let needle = query.trim().to_lowercase();
        let members = self.records.get_all().await?;
        if needle.is_empty() {
            return Ok(members);
        }
        Ok(members
            .into_iter()
            .filter(|member| {
                contains_folded(&member.name, &needle)
                    || contains_folded(&member.id_number, &needle)
                    || contains_folded(&member.phone, &needle)
            })
            .collect())
    }

    async fn ensure_id_number_free(&self, id_number: &str, owner: Option<RecordId>) -> RepoResult<()> {
        match self.records.get_by_index(ID_NUMBER_INDEX, id_number).await? {
            Some(existing) if Some(existing.id) != owner => Err(RepoError::DuplicateKey {
                collection: self.records.collection(),
                index: ID_NUMBER_INDEX,
                key: id_number.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

pub fn normalize_id_number(id_number: &str) -> String {
    id_number.trim().to_uppercase()
}
