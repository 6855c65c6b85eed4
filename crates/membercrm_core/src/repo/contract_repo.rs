//! Contracts repository.
//!
//! # Responsibility
//! - Create contracts with defaults and date/amount checks.
//! - Maintain the inline attachment list.
//! - Provide member/status lookups, expiry scans and search.
//!
//! # Invariants
//! - `end_date`, when set, is not earlier than `start_date`.
//! - Attachment names are unique within one contract.
//! - Attachment edits rewrite the whole list (read-modify-write, last write wins).

use crate::model::contract::{
    Attachment, Contract, ContractDraft, ContractPatch, ContractStatus, NewContract,
};
use crate::model::enum_key;
use crate::model::RecordId;
use crate::repo::record_repo::{KeyRange, Repository};
use crate::repo::{contains_folded, days_from, RepoError, RepoResult};
use chrono::{DateTime, Utc};
use serde::Serialize;

const MEMBER_INDEX: &str = "memberId";
const STATUS_INDEX: &str = "status";

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct AttachmentsPatch<'a> {
    attachments: &'a [Attachment],
    #[serde(skip_serializing_if = "Option::is_none")]
    updated_by: Option<RecordId>,
}

#[derive(Clone)]
pub struct ContractRepository {
    records: Repository<Contract>,
}

impl ContractRepository {
    pub fn new(records: Repository<Contract>) -> Self {
        Self { records }
    }

    pub fn records(&self) -> &Repository<Contract> {
        &self.records
    }

    pub async fn get_by_id(&self, id: RecordId) -> RepoResult<Option<Contract>> {
        self.records.get_by_id(id).await
    }

    pub async fn get_all(&self) -> RepoResult<Vec<Contract>> {
        self.records.get_all().await
    }

    pub async fn delete(&self, id: RecordId) -> RepoResult<()> {
        self.records.delete(id).await
    }

    pub async fn find_by_member_id(&self, member_id: RecordId) -> RepoResult<Vec<Contract>> {
        self.records
            .query(MEMBER_INDEX, &KeyRange::only(member_id.to_string()))
            .await
    }

    pub async fn find_by_status(&self, status: ContractStatus) -> RepoResult<Vec<Contract>> {
        self.records
            .query(STATUS_INDEX, &KeyRange::only(enum_key(&status)))
            .await
    }

    /// Persists a contract; status defaults to `Draft`.
    pub async fn create_contract(&self, input: &NewContract) -> RepoResult<Contract> {
        let title = input.title.trim();
        if title.is_empty() {
            return Err(RepoError::validation("contract title is required"));
        }
        validate_terms(input.start_date, input.end_date, input.amount)?;

        self.records
            .create(&ContractDraft {
                member_id: input.member_id,
                title: title.to_string(),
                content: input.content.clone(),
                status: input.status.unwrap_or(ContractStatus::Draft),
                start_date: input.start_date,
                end_date: input.end_date,
                amount: input.amount,
                payment_method: input.payment_method.clone(),
                bank_account: input.bank_account.clone(),
                attachments: Vec::new(),
                created_by: input.created_by,
                updated_by: input.created_by,
            })
            .await
    }

    pub async fn update_status(&self, id: RecordId, status: ContractStatus) -> RepoResult<Contract> {
        #[derive(Serialize)]
        struct StatusPatch {
            status: ContractStatus,
        }
        self.records.update(id, &StatusPatch { status }).await
    }

    /// Partial content edit; dates and amount are re-validated on the merged view.
    pub async fn update_content(&self, id: RecordId, patch: &ContractPatch) -> RepoResult<Contract> {
        if let Some(title) = patch.title.as_deref() {
            if title.trim().is_empty() {
                return Err(RepoError::validation("contract title is required"));
            }
        }
        let current = self.require(id).await?;
        validate_terms(
            patch.start_date.unwrap_or(current.start_date),
            patch.end_date.unwrap_or(current.end_date),
            patch.amount.unwrap_or(current.amount),
        )?;
        self.records.update(id, patch).await
    }

    /// Appends `attachment`; a same-named attachment is rejected.
    pub async fn add_attachment(
        &self,
        id: RecordId,
        attachment: Attachment,
        updated_by: Option<RecordId>,
    ) -> RepoResult<Contract> {
        let contract = self.require(id).await?;
        if contract
            .attachments
            .iter()
            .any(|existing| existing.name == attachment.name)
        {
            return Err(RepoError::DuplicateKey {
                collection: self.records.collection(),
                index: "attachments.name",
                key: attachment.name,
            });
        }
        let mut attachments = contract.attachments;
        attachments.push(attachment);
        self.records
            .update(
                id,
                &AttachmentsPatch {
                    attachments: &attachments,
                    updated_by,
                },
            )
            .await
    }

    /// Removes the attachment named `name`; unknown names leave the list as is.
    pub async fn remove_attachment(
        &self,
        id: RecordId,
        name: &str,
        updated_by: Option<RecordId>,
    ) -> RepoResult<Contract> {
        let contract = self.require(id).await?;
        let attachments: Vec<Attachment> = contract
            .attachments
            .into_iter()
            .filter(|attachment| attachment.name != name)
            .collect();
        self.records
            .update(
                id,
                &AttachmentsPatch {
                    attachments: &attachments,
                    updated_by,
                },
            )
            .await
    }

    /// Non-terminated contracts ending within `[now, now + days_threshold]`.
    pub async fn get_expiring_contracts(&self, days_threshold: i64) -> RepoResult<Vec<Contract>> {
        let now = self.records.now();
        let horizon = days_from(now, days_threshold);
        let contracts = self.records.get_all().await?;
        Ok(contracts
            .into_iter()
            .filter(|contract| contract.status != ContractStatus::Terminated)
            .filter(|contract| {
                contract
                    .end_date
                    .is_some_and(|end| end >= now && end <= horizon)
            })
            .collect())
    }

    /// Non-terminated contracts whose end date has passed.
    pub async fn get_expired_contracts(&self) -> RepoResult<Vec<Contract>> {
        let now = self.records.now();
        let contracts = self.records.get_all().await?;
        Ok(contracts
            .into_iter()
            .filter(|contract| contract.status != ContractStatus::Terminated)
            .filter(|contract| contract.end_date.is_some_and(|end| end < now))
            .collect())
    }

    /// Case-insensitive substring match over title, content and payment method.
    pub async fn search_contracts(&self, query: &str) -> RepoResult<Vec<Contract>> {
        let needle = query.trim().to_lowercase();
        let contracts = self.records.get_all().await?;
        if needle.is_empty() {
            return Ok(contracts);
        }
        Ok(contracts
            .into_iter()
            .filter(|contract| {
                contains_folded(&contract.title, &needle)
                    || contains_folded(&contract.content, &needle)
                    || contract
                        .payment_method
                        .as_deref()
                        .is_some_and(|method| contains_folded(method, &needle))
            })
            .collect())
    }

    async fn require(&self, id: RecordId) -> RepoResult<Contract> {
        self.records
            .get_by_id(id)
            .await?
            .ok_or(RepoError::NotFound {
                collection: self.records.collection(),
                id,
            })
    }
}

fn validate_terms(
    start_date: DateTime<Utc>,
    end_date: Option<DateTime<Utc>>,
    amount: f64,
) -> RepoResult<()> {
    if end_date.is_some_and(|end| end < start_date) {
        return Err(RepoError::validation(
            "contract end date must not be earlier than its start date",
        ));
    }
    if !amount.is_finite() || amount < 0.0 {
        return Err(RepoError::validation(
            "contract amount must be a non-negative number",
        ));
    }
    Ok(())
}
