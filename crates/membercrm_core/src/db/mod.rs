//! Versioned embedded store: connection lifecycle, schema and bulk transfer.
//!
//! # Responsibility
//! - Open and configure the SQLite file (or in-memory database) backing all
//!   collections.
//! - Apply schema migrations in deterministic order.
//! - Export and import raw collection contents for backup/restore.
//!
//! # Invariants
//! - Migration version is tracked via `PRAGMA user_version`.
//! - No collection is read or written before migrations succeed.
//! - One physical connection per `Database`; calls are serialized through it.

mod handle;
pub mod migrations;
mod open;
pub mod schema;
mod transfer;

pub use handle::{Database, StoreConfig, StoreLocation};
pub use open::{open_db, open_db_in_memory};
pub use transfer::ExportPayload;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    /// The engine could not open the target. Fatal for the caller; never retried.
    #[error("failed to open database `{target}`: {source}")]
    Open {
        target: String,
        #[source]
        source: rusqlite::Error,
    },
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
    #[error("database schema version {db_version} is newer than supported {latest_supported}")]
    UnsupportedSchemaVersion {
        db_version: u32,
        latest_supported: u32,
    },
    /// The handle was closed explicitly; call `connect()` again first.
    #[error("database handle is closed")]
    Closed,
    #[error("unknown collection `{0}`")]
    UnknownCollection(String),
    #[error("invalid record in `{collection}`: {message}")]
    InvalidRecord { collection: String, message: String },
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
}
