//! Raw export/import of whole collections for backup and restore.
//!
//! # Invariants
//! - Export reads every declared collection, records ordered by id.
//! - Import replaces one collection per transaction; a failure rolls back
//!   that collection only. Earlier collections stay imported.
//! - Payload collection names are all checked before the first write.

use super::schema::{self, CollectionDef, COLLECTIONS};
use super::{Database, DbError, DbResult};
use log::{error, info};
use rusqlite::{params, Connection};
use serde_json::Value;
use std::collections::BTreeMap;

/// Collection name to raw records.
pub type ExportPayload = BTreeMap<String, Vec<Value>>;

impl Database {
    /// Reads every record of every declared collection.
    pub async fn export_all(&self) -> DbResult<ExportPayload> {
        self.with_connection(|conn| {
            let mut payload = ExportPayload::new();
            for def in COLLECTIONS {
                payload.insert(def.name.to_string(), read_collection(conn, def)?);
            }
            info!(
                "event=db_export module=db status=ok collections={} records={}",
                payload.len(),
                payload.values().map(Vec::len).sum::<usize>()
            );
            Ok::<_, DbError>(payload)
        })
        .await
    }

    /// Clears and refills each collection named in `payload`.
    ///
    /// Collections absent from the payload are left untouched.
    pub async fn import_all(&self, payload: &ExportPayload) -> DbResult<()> {
        let mut targets = Vec::with_capacity(payload.len());
        for (name, records) in payload {
            let def = schema::collection(name)
                .ok_or_else(|| DbError::UnknownCollection(name.clone()))?;
            targets.push((def, records));
        }

        self.with_connection(|conn| {
            for (def, records) in targets {
                if let Err(err) = replace_collection(conn, def, records) {
                    error!(
                        "event=db_import module=db status=error collection={} error={err}",
                        def.name
                    );
                    return Err(err);
                }
                info!(
                    "event=db_import module=db status=ok collection={} records={}",
                    def.name,
                    records.len()
                );
            }
            Ok::<_, DbError>(())
        })
        .await
    }
}

fn read_collection(conn: &Connection, def: &CollectionDef) -> DbResult<Vec<Value>> {
    let mut stmt = conn.prepare(&format!("SELECT doc FROM {} ORDER BY id;", def.name))?;
    let mut rows = stmt.query([])?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let doc: String = row.get(0)?;
        records.push(serde_json::from_str(&doc)?);
    }
    Ok(records)
}

fn replace_collection(conn: &mut Connection, def: &CollectionDef, records: &[Value]) -> DbResult<()> {
    let tx = conn.transaction()?;
    tx.execute(&format!("DELETE FROM {};", def.name), [])?;
    {
        let mut insert = tx.prepare(&format!("INSERT INTO {} (id, doc) VALUES (?1, ?2);", def.name))?;
        for record in records {
            let id = record
                .get("id")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .ok_or_else(|| DbError::InvalidRecord {
                    collection: def.name.to_string(),
                    message: "record has no string `id`".to_string(),
                })?;
            insert.execute(params![id, serde_json::to_string(record)?])?;
        }
    }
    tx.commit()?;
    Ok(())
}
