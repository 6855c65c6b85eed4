//! Cached, closable handle over the embedded database.
//!
//! # Responsibility
//! - Own the single SQLite connection for one store.
//! - Open it lazily or through `connect()`, release it through `close()`.
//! - Serialize all access through an async mutex (every call is a
//!   suspension point for the caller).
//!
//! # Invariants
//! - After `close()`, calls fail with `DbError::Closed` until `connect()`.
//! - In-flight calls finish; only calls issued after `close()` are refused.

use super::migrations::current_user_version;
use super::open::{open_db, open_db_in_memory};
use super::{DbError, DbResult};
use log::info;
use rusqlite::Connection;
use serde::Deserialize;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::sync::Mutex;

/// Where the store lives.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case", tag = "kind", content = "path")]
pub enum StoreLocation {
    File(PathBuf),
    /// Private database that disappears when the handle is closed.
    InMemory,
}

/// Store configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoreConfig {
    pub location: StoreLocation,
}

impl StoreConfig {
    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            location: StoreLocation::File(path.into()),
        }
    }

    pub fn in_memory() -> Self {
        Self {
            location: StoreLocation::InMemory,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::file("membercrm.sqlite3")
    }
}

enum HandleState {
    Unopened,
    Open(Connection),
    Closed,
}

struct DatabaseInner {
    config: StoreConfig,
    state: Mutex<HandleState>,
}

/// Shared handle to one store. Clones refer to the same connection.
#[derive(Clone)]
pub struct Database {
    inner: Arc<DatabaseInner>,
}

impl Database {
    /// Creates an unopened handle; the first call (or `connect()`) opens it.
    pub fn new(config: StoreConfig) -> Self {
        Self {
            inner: Arc::new(DatabaseInner {
                config,
                state: Mutex::new(HandleState::Unopened),
            }),
        }
    }

    pub fn config(&self) -> &StoreConfig {
        &self.inner.config
    }

    /// Opens the store if needed. Idempotent while open.
    pub async fn connect(&self) -> DbResult<()> {
        let mut state = self.inner.state.lock().await;
        if matches!(*state, HandleState::Open(_)) {
            return Ok(());
        }
        *state = HandleState::Open(self.open_connection()?);
        Ok(())
    }

    /// Drops the connection. Later calls fail with `Closed` until `connect()`.
    pub async fn close(&self) {
        let mut state = self.inner.state.lock().await;
        if matches!(*state, HandleState::Open(_)) {
            info!("event=db_close module=db status=ok");
        }
        *state = HandleState::Closed;
    }

    pub async fn is_open(&self) -> bool {
        matches!(*self.inner.state.lock().await, HandleState::Open(_))
    }

    /// Schema version currently applied to the open database.
    pub async fn schema_version(&self) -> DbResult<u32> {
        self.with_connection(|conn| current_user_version(conn)).await
    }

    /// Runs `op` against the live connection.
    ///
    /// Opens lazily when the handle was never opened. This is the only path
    /// through which repositories touch SQLite.
    pub async fn with_connection<T, E>(
        &self,
        op: impl FnOnce(&mut Connection) -> Result<T, E>,
    ) -> Result<T, E>
    where
        E: From<DbError>,
    {
        let mut state = self.inner.state.lock().await;
        if matches!(*state, HandleState::Unopened) {
            *state = HandleState::Open(self.open_connection().map_err(E::from)?);
        }
        match &mut *state {
            HandleState::Open(conn) => op(conn),
            HandleState::Closed => Err(E::from(DbError::Closed)),
            HandleState::Unopened => Err(E::from(DbError::Closed)),
        }
    }

    fn open_connection(&self) -> DbResult<Connection> {
        match &self.inner.config.location {
            StoreLocation::File(path) => open_db(path),
            StoreLocation::InMemory => open_db_in_memory(),
        }
    }
}
