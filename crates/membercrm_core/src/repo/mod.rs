//! Repository layer: generic collection access and domain repositories.
//!
//! # Responsibility
//! - `Repository<E>` gives typed CRUD, index queries and transactional bulk
//!   writes over one collection.
//! - Domain repositories add normalization and uniqueness checks on top.
//!
//! # Invariants
//! - Domain repositories check uniqueness before delegating, so a
//!   `DuplicateKey` never follows a partial write.
//! - Read paths reject undecodable documents instead of masking them.

pub mod changelog_repo;
pub mod contract_repo;
pub mod member_repo;
pub mod record_repo;
pub mod relation_repo;
pub mod settings_repo;
pub mod user_repo;

use crate::db::DbError;
use chrono::{DateTime, TimeDelta, Utc};
use crate::model::RecordId;
use crate::security::password::PasswordError;

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error shared by the generic and domain layers.
#[derive(Debug, thiserror::Error)]
pub enum RepoError {
    #[error("{collection} record not found: {id}")]
    NotFound {
        collection: &'static str,
        id: RecordId,
    },
    #[error("duplicate {index} `{key}` in {collection}")]
    DuplicateKey {
        collection: &'static str,
        index: &'static str,
        key: String,
    },
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("unknown index `{index}` on {collection}")]
    UnknownIndex {
        collection: &'static str,
        index: String,
    },
    #[error("index `{index}` on {collection} is not unique")]
    IndexNotUnique {
        collection: &'static str,
        index: &'static str,
    },
    /// Uniqueness enforced by the engine itself (e.g. inside a bulk write).
    #[error("constraint violated in {collection}: {message}")]
    Constraint {
        collection: &'static str,
        message: String,
    },
    #[error("invalid persisted {collection} data: {message}")]
    InvalidData {
        collection: &'static str,
        message: String,
    },
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Db(#[from] DbError),
}

impl RepoError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for RepoError {
    fn from(value: serde_json::Error) -> Self {
        Self::Db(DbError::Serialization(value))
    }
}

/// `now + days`, clamped to the representable range instead of overflowing.
pub(crate) fn days_from(now: DateTime<Utc>, days: i64) -> DateTime<Utc> {
    TimeDelta::try_days(days)
        .and_then(|delta| now.checked_add_signed(delta))
        .unwrap_or(if days < 0 {
            DateTime::<Utc>::MIN_UTC
        } else {
            DateTime::<Utc>::MAX_UTC
        })
}

/// Case-insensitive substring match used by the search helpers.
pub(crate) fn contains_folded(haystack: &str, folded_needle: &str) -> bool {
    haystack.to_lowercase().contains(folded_needle)
}
