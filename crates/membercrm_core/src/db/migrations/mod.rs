//! Ordered schema migrations tracked through `PRAGMA user_version`.
//!
//! # Invariants
//! - Steps are listed in strictly increasing version order.
//! - All pending steps run in one transaction; a failing step leaves the
//!   database at its previous version.
//! - A database stamped with a newer version than this binary knows is
//!   refused, never downgraded.
//! - Tables and indices created here match `db::schema::COLLECTIONS`.

use crate::db::{DbError, DbResult};
use log::{debug, info};
use rusqlite::Connection;

struct Step {
    version: u32,
    name: &'static str,
    sql: &'static str,
}

const STEPS: &[Step] = &[
    Step {
        version: 1,
        name: "init_collections",
        sql: include_str!("0001_init.sql"),
    },
    Step {
        version: 2,
        name: "users_status_index",
        sql: include_str!("0002_users_status.sql"),
    },
];

/// Version range covered by one `apply_migrations` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MigrationOutcome {
    pub from_version: u32,
    pub to_version: u32,
}

impl MigrationOutcome {
    pub fn is_noop(&self) -> bool {
        self.from_version == self.to_version
    }
}

/// Newest schema version this binary can produce.
pub fn latest_version() -> u32 {
    STEPS.last().map_or(0, |step| step.version)
}

/// Brings `conn` up to `latest_version()`.
pub fn apply_migrations(conn: &mut Connection) -> DbResult<MigrationOutcome> {
    let from_version = current_user_version(conn)?;
    let latest = latest_version();
    if from_version > latest {
        return Err(DbError::UnsupportedSchemaVersion {
            db_version: from_version,
            latest_supported: latest,
        });
    }

    let pending: Vec<&Step> = STEPS
        .iter()
        .filter(|step| step.version > from_version)
        .collect();
    if !pending.is_empty() {
        let tx = conn.transaction()?;
        for step in pending {
            tx.execute_batch(step.sql)?;
            tx.pragma_update(None, "user_version", step.version)?;
            debug!(
                "event=db_migrate_step module=db status=ok version={} name={}",
                step.version, step.name
            );
        }
        tx.commit()?;
        info!("event=db_migrate module=db status=ok from_version={from_version} to_version={latest}");
    }

    Ok(MigrationOutcome {
        from_version,
        to_version: latest,
    })
}

/// Schema version recorded in the database header.
pub fn current_user_version(conn: &Connection) -> DbResult<u32> {
    Ok(conn.query_row("PRAGMA user_version;", [], |row| row.get(0))?)
}
