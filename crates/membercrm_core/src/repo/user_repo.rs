//! User accounts repository.
//!
//! # Responsibility
//! - Normalize emails and keep them unique.
//! - Hash plaintext passwords before anything is persisted.
//!
//! # Invariants
//! - Stored emails are trimmed and lowercased.
//! - `DuplicateKey` is raised before any write is attempted.
//! - Plaintext passwords never leave this module except as Argon2 hashes.

use crate::model::enum_key;
use crate::model::user::{NewUser, User, UserDraft, UserPatch, UserRole, UserStatus};
use crate::model::RecordId;
use crate::repo::record_repo::{KeyRange, Repository};
use crate::repo::{RepoError, RepoResult};
use crate::security::password::{hash_password_off_thread, verify_password_off_thread};
use log::{info, warn};
use once_cell::sync::Lazy;
use regex::Regex;

const EMAIL_INDEX: &str = "email";
const STATUS_INDEX: &str = "status";

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email regex"));

/// Profile fields editable through `update_profile`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileUpdate {
    pub email: Option<String>,
    pub name: Option<String>,
    pub role: Option<UserRole>,
}

#[derive(Clone)]
pub struct UserRepository {
    records: Repository<User>,
}

impl UserRepository {
    pub fn new(records: Repository<User>) -> Self {
        Self { records }
    }

    /// Underlying generic repository for operations without extra invariants.
    pub fn records(&self) -> &Repository<User> {
        &self.records
    }

    pub async fn get_by_id(&self, id: RecordId) -> RepoResult<Option<User>> {
        self.records.get_by_id(id).await
    }

    pub async fn get_all(&self) -> RepoResult<Vec<User>> {
        self.records.get_all().await
    }

    pub async fn delete(&self, id: RecordId) -> RepoResult<()> {
        self.records.delete(id).await
    }

    /// Case-insensitive lookup.
    pub async fn find_by_email(&self, email: &str) -> RepoResult<Option<User>> {
        self.records
            .get_by_index(EMAIL_INDEX, &normalize_email(email))
            .await
    }

    /// Validates, checks email uniqueness, hashes the password and persists.
    pub async fn create_user(&self, input: &NewUser) -> RepoResult<User> {
        let email = normalize_email(&input.email);
        validate_email(&email)?;
        let name = input.name.trim();
        if name.is_empty() {
            return Err(RepoError::validation("user name is required"));
        }
        if input.password.is_empty() {
            return Err(RepoError::validation("password is required"));
        }
        self.ensure_email_free(&email, None).await?;

        let password_hash = hash_password_off_thread(&input.password).await?;
        let user = self
            .records
            .create(&UserDraft {
                email,
                password_hash,
                name: name.to_string(),
                role: input.role,
                status: input.status,
            })
            .await?;
        info!(
            "event=user_create module=repo status=ok user_id={} role={}",
            user.id,
            enum_key(&user.role)
        );
        Ok(user)
    }

    /// Compares `password` against the stored hash.
    ///
    /// A corrupt stored hash counts as a mismatch and is logged.
    pub async fn verify_password(&self, user: &User, password: &str) -> bool {
        match verify_password_off_thread(password, &user.password_hash).await {
            Ok(matches) => matches,
            Err(err) => {
                warn!(
                    "event=password_verify module=repo status=error user_id={} error={err}",
                    user.id
                );
                false
            }
        }
    }

    pub async fn update_password(&self, id: RecordId, new_password: &str) -> RepoResult<User> {
        if new_password.is_empty() {
            return Err(RepoError::validation("password is required"));
        }
        let password_hash = hash_password_off_thread(new_password).await?;
        self.records
            .update(
                id,
                &UserPatch {
                    password_hash: Some(password_hash),
                    ..UserPatch::default()
                },
            )
            .await
    }

    pub async fn update_status(&self, id: RecordId, status: UserStatus) -> RepoResult<User> {
        self.records
            .update(
                id,
                &UserPatch {
                    status: Some(status),
                    ..UserPatch::default()
                },
            )
            .await
    }

    /// Updates name/email/role; a changed email must stay unique.
    pub async fn update_profile(&self, id: RecordId, update: &ProfileUpdate) -> RepoResult<User> {
        let mut patch = UserPatch {
            role: update.role,
            ..UserPatch::default()
        };
        if let Some(email) = update.email.as_deref() {
            let email = normalize_email(email);
            validate_email(&email)?;
            self.ensure_email_free(&email, Some(id)).await?;
            patch.email = Some(email);
        }
        if let Some(name) = update.name.as_deref() {
            let name = name.trim();
            if name.is_empty() {
                return Err(RepoError::validation("user name is required"));
            }
            patch.name = Some(name.to_string());
        }
        self.records.update(id, &patch).await
    }

    pub async fn get_active_users(&self) -> RepoResult<Vec<User>> {
        self.records
            .query(STATUS_INDEX, &KeyRange::only(enum_key(&UserStatus::Active)))
            .await
    }

    async fn ensure_email_free(&self, email: &str, owner: Option<RecordId>) -> RepoResult<()> {
        match self.records.get_by_index(EMAIL_INDEX, email).await? {
            Some(existing) if Some(existing.id) != owner => Err(RepoError::DuplicateKey {
                collection: self.records.collection(),
                index: EMAIL_INDEX,
                key: email.to_string(),
            }),
            _ => Ok(()),
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

fn validate_email(email: &str) -> RepoResult<()> {
    if EMAIL_RE.is_match(email) {
        Ok(())
    } else {
        Err(RepoError::Validation(format!("invalid email address `{email}`")))
    }
}
