//! Generic typed repository over one collection.
//!
//! # Responsibility
//! - Stamp identity and timestamps on create, merge patches on update.
//! - Translate index queries into SQL over the declared expression indices.
//! - Run bulk writes inside one transaction per call.
//!
//! # Invariants
//! - `id` and `createdAt` never change after create.
//! - Every write sets `updatedAt` from the repository clock.
//! - Bulk writes are all-or-nothing.
//! - Index names are validated against `db::schema` before reaching SQL.

use crate::clock::Clock;
use crate::db::schema::{CollectionDef, IndexDef};
use crate::db::Database;
use crate::model::{Entity, RecordId};
use crate::repo::{RepoError, RepoResult};
use chrono::{DateTime, Utc};
use log::{debug, warn};
use rusqlite::{params, params_from_iter, Connection, ErrorCode};
use serde::Serialize;
use serde_json::{Map, Value};
use std::marker::PhantomData;
use std::ops::Bound;
use std::sync::Arc;
use uuid::Uuid;

const ID_FIELD: &str = "id";
const CREATED_AT_FIELD: &str = "createdAt";
const UPDATED_AT_FIELD: &str = "updatedAt";

/// Key selection for `Repository::query`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyRange {
    /// Exact match.
    Only(String),
    /// Range; records without the indexed field never match.
    Bounded {
        lower: Bound<String>,
        upper: Bound<String>,
    },
}

impl KeyRange {
    pub fn only(key: impl Into<String>) -> Self {
        Self::Only(key.into())
    }

    /// Inclusive on both ends.
    pub fn between(lower: impl Into<String>, upper: impl Into<String>) -> Self {
        Self::Bounded {
            lower: Bound::Included(lower.into()),
            upper: Bound::Included(upper.into()),
        }
    }

    pub fn at_least(lower: impl Into<String>) -> Self {
        Self::Bounded {
            lower: Bound::Included(lower.into()),
            upper: Bound::Unbounded,
        }
    }

    pub fn at_most(upper: impl Into<String>) -> Self {
        Self::Bounded {
            lower: Bound::Unbounded,
            upper: Bound::Included(upper.into()),
        }
    }

    fn to_sql(&self, expr: &str) -> (String, Vec<String>) {
        match self {
            Self::Only(key) => (format!("{expr} = ?"), vec![key.clone()]),
            Self::Bounded { lower, upper } => {
                let mut clauses = vec![format!("{expr} IS NOT NULL")];
                let mut binds = Vec::new();
                match lower {
                    Bound::Included(key) => {
                        clauses.push(format!("{expr} >= ?"));
                        binds.push(key.clone());
                    }
                    Bound::Excluded(key) => {
                        clauses.push(format!("{expr} > ?"));
                        binds.push(key.clone());
                    }
                    Bound::Unbounded => {}
                }
                match upper {
                    Bound::Included(key) => {
                        clauses.push(format!("{expr} <= ?"));
                        binds.push(key.clone());
                    }
                    Bound::Excluded(key) => {
                        clauses.push(format!("{expr} < ?"));
                        binds.push(key.clone());
                    }
                    Bound::Unbounded => {}
                }
                (clauses.join(" AND "), binds)
            }
        }
    }
}

/// Typed CRUD over the collection `E::COLLECTION`.
pub struct Repository<E: Entity> {
    db: Database,
    clock: Arc<dyn Clock>,
    _entity: PhantomData<fn() -> E>,
}

impl<E: Entity> Clone for Repository<E> {
    fn clone(&self) -> Self {
        Self {
            db: self.db.clone(),
            clock: Arc::clone(&self.clock),
            _entity: PhantomData,
        }
    }
}

impl<E: Entity> Repository<E> {
    pub fn new(db: Database, clock: Arc<dyn Clock>) -> Self {
        Self {
            db,
            clock,
            _entity: PhantomData,
        }
    }

    pub fn collection(&self) -> &'static str {
        E::COLLECTION.name
    }

    /// Current instant according to the repository clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Persists a new record with a fresh id and `createdAt == updatedAt`.
    pub async fn create(&self, draft: &E::Draft) -> RepoResult<E> {
        let record = build_new::<E>(draft, Uuid::new_v4(), self.clock.now())?;
        let doc = serde_json::to_string(&record)?;
        self.db
            .with_connection(|conn| insert_doc::<E>(conn, record.id(), &doc))
            .await?;
        debug!(
            "event=record_create module=repo status=ok collection={} id={}",
            self.collection(),
            record.id()
        );
        Ok(record)
    }

    pub async fn get_by_id(&self, id: RecordId) -> RepoResult<Option<E>> {
        self.db.with_connection(|conn| load::<E>(conn, id)).await
    }

    /// All records ordered by id.
    pub async fn get_all(&self) -> RepoResult<Vec<E>> {
        let sql = format!("SELECT doc FROM {} ORDER BY id;", self.collection());
        self.db
            .with_connection(|conn| select_docs::<E>(conn, &sql, Vec::new()))
            .await
    }

    pub async fn count(&self) -> RepoResult<u64> {
        let sql = format!("SELECT COUNT(*) FROM {};", self.collection());
        self.db
            .with_connection(|conn| {
                let count: i64 = conn.query_row(&sql, [], |row| row.get(0))?;
                Ok::<_, RepoError>(u64::try_from(count).unwrap_or(0))
            })
            .await
    }

    /// Records whose indexed field matches `range`, ordered by key then id.
    pub async fn query(&self, index: &str, range: &KeyRange) -> RepoResult<Vec<E>> {
        let def = self.index_def(index)?;
        let expr = CollectionDef::index_expr(def);
        let (clause, binds) = range.to_sql(&expr);
        let sql = format!(
            "SELECT doc FROM {} WHERE {clause} ORDER BY {expr}, id;",
            self.collection()
        );
        self.db
            .with_connection(|conn| select_docs::<E>(conn, &sql, binds))
            .await
    }

    /// Single-record lookup through a unique index.
    pub async fn get_by_index(&self, index: &str, key: &str) -> RepoResult<Option<E>> {
        let def = self.index_def(index)?;
        if !def.unique {
            return Err(RepoError::IndexNotUnique {
                collection: self.collection(),
                index: def.name,
            });
        }
        let sql = format!(
            "SELECT doc FROM {} WHERE {} = ?1 LIMIT 1;",
            self.collection(),
            CollectionDef::index_expr(def)
        );
        let mut found = self
            .db
            .with_connection(|conn| select_docs::<E>(conn, &sql, vec![key.to_string()]))
            .await?;
        Ok(found.pop())
    }

    /// Merges `patch` over the stored record and bumps `updatedAt`.
    ///
    /// `patch` must serialize to a JSON object; `id`, `createdAt` and
    /// `updatedAt` keys in it are ignored.
    pub async fn update<P>(&self, id: RecordId, patch: &P) -> RepoResult<E>
    where
        P: Serialize + ?Sized,
    {
        let now = self.clock.now();
        let updated = self
            .db
            .with_connection(|conn| {
                let tx = conn.transaction()?;
                let updated = update_in_tx::<E, P>(&tx, id, patch, now)?;
                tx.commit()?;
                Ok::<_, RepoError>(updated)
            })
            .await?;
        debug!(
            "event=record_update module=repo status=ok collection={} id={id}",
            self.collection()
        );
        Ok(updated)
    }

    /// Removes the record; absent ids are not an error.
    pub async fn delete(&self, id: RecordId) -> RepoResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?1;", self.collection());
        let removed = self
            .db
            .with_connection(|conn| Ok::<_, RepoError>(conn.execute(&sql, [id.to_string()])?))
            .await?;
        debug!(
            "event=record_delete module=repo status=ok collection={} id={id} removed={removed}",
            self.collection()
        );
        Ok(())
    }

    /// Inserts every draft or none of them.
    pub async fn bulk_create(&self, drafts: &[E::Draft]) -> RepoResult<Vec<E>> {
        let now = self.clock.now();
        let mut staged = Vec::with_capacity(drafts.len());
        for draft in drafts {
            let record = build_new::<E>(draft, Uuid::new_v4(), now)?;
            let doc = serde_json::to_string(&record)?;
            staged.push((record, doc));
        }

        let result = self
            .db
            .with_connection(|conn| {
                let tx = conn.transaction()?;
                for (record, doc) in &staged {
                    insert_doc::<E>(&tx, record.id(), doc)?;
                }
                tx.commit()?;
                Ok::<_, RepoError>(())
            })
            .await;
        self.log_bulk("bulk_create", drafts.len(), &result);
        result?;

        Ok(staged.into_iter().map(|(record, _)| record).collect())
    }

    /// Applies every patch or none; any missing id aborts the whole batch.
    pub async fn bulk_update<P>(&self, updates: &[(RecordId, P)]) -> RepoResult<Vec<E>>
    where
        P: Serialize,
    {
        let now = self.clock.now();
        let result = self
            .db
            .with_connection(|conn| {
                let tx = conn.transaction()?;
                let mut updated = Vec::with_capacity(updates.len());
                for (id, patch) in updates {
                    updated.push(update_in_tx::<E, P>(&tx, *id, patch, now)?);
                }
                tx.commit()?;
                Ok::<_, RepoError>(updated)
            })
            .await;
        self.log_bulk("bulk_update", updates.len(), &result);
        result
    }

    /// Deletes every id in one transaction.
    pub async fn bulk_delete(&self, ids: &[RecordId]) -> RepoResult<()> {
        let sql = format!("DELETE FROM {} WHERE id = ?1;", self.collection());
        let result = self
            .db
            .with_connection(|conn| {
                let tx = conn.transaction()?;
                {
                    let mut stmt = tx.prepare(&sql)?;
                    for id in ids {
                        stmt.execute([id.to_string()])?;
                    }
                }
                tx.commit()?;
                Ok::<_, RepoError>(())
            })
            .await;
        self.log_bulk("bulk_delete", ids.len(), &result);
        result
    }

    fn index_def(&self, index: &str) -> RepoResult<&'static IndexDef> {
        E::COLLECTION
            .index(index)
            .ok_or_else(|| RepoError::UnknownIndex {
                collection: self.collection(),
                index: index.to_string(),
            })
    }

    fn log_bulk<T>(&self, event: &str, size: usize, result: &RepoResult<T>) {
        match result {
            Ok(_) => debug!(
                "event={event} module=repo status=ok collection={} size={size}",
                self.collection()
            ),
            Err(err) => warn!(
                "event={event} module=repo status=rolled_back collection={} size={size} error={err}",
                self.collection()
            ),
        }
    }
}

fn build_new<E: Entity>(draft: &E::Draft, id: RecordId, now: DateTime<Utc>) -> RepoResult<E> {
    let mut doc = into_object(serde_json::to_value(draft)?, "draft")?;
    let stamp = serde_json::to_value(now)?;
    doc.insert(ID_FIELD.to_string(), Value::String(id.to_string()));
    doc.insert(CREATED_AT_FIELD.to_string(), stamp.clone());
    doc.insert(UPDATED_AT_FIELD.to_string(), stamp);
    decode_value::<E>(doc)
}

fn merge_patch<E: Entity, P: Serialize + ?Sized>(
    existing: &E,
    patch: &P,
    now: DateTime<Utc>,
) -> RepoResult<E> {
    let mut doc = into_object(serde_json::to_value(existing)?, "record")?;
    for (field, value) in into_object(serde_json::to_value(patch)?, "patch")? {
        if matches!(field.as_str(), ID_FIELD | CREATED_AT_FIELD | UPDATED_AT_FIELD) {
            continue;
        }
        doc.insert(field, value);
    }
    doc.insert(UPDATED_AT_FIELD.to_string(), serde_json::to_value(now)?);
    decode_value::<E>(doc)
}

fn into_object(value: Value, what: &str) -> RepoResult<Map<String, Value>> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(RepoError::Validation(format!(
            "{what} must be a JSON object, got {other}"
        ))),
    }
}

fn decode_value<E: Entity>(doc: Map<String, Value>) -> RepoResult<E> {
    serde_json::from_value(Value::Object(doc)).map_err(|err| {
        RepoError::Validation(format!("invalid {} record: {err}", E::COLLECTION.name))
    })
}

fn decode_doc<E: Entity>(doc: &str) -> RepoResult<E> {
    serde_json::from_str(doc).map_err(|err| RepoError::InvalidData {
        collection: E::COLLECTION.name,
        message: err.to_string(),
    })
}

fn load<E: Entity>(conn: &Connection, id: RecordId) -> RepoResult<Option<E>> {
    let sql = format!("SELECT doc FROM {} WHERE id = ?1;", E::COLLECTION.name);
    let mut found = select_docs::<E>(conn, &sql, vec![id.to_string()])?;
    Ok(found.pop())
}

fn select_docs<E: Entity>(conn: &Connection, sql: &str, binds: Vec<String>) -> RepoResult<Vec<E>> {
    let mut stmt = conn.prepare(sql)?;
    let mut rows = stmt.query(params_from_iter(binds))?;
    let mut records = Vec::new();
    while let Some(row) = rows.next()? {
        let doc: String = row.get(0)?;
        records.push(decode_doc::<E>(&doc)?);
    }
    Ok(records)
}

fn insert_doc<E: Entity>(conn: &Connection, id: RecordId, doc: &str) -> RepoResult<()> {
    let sql = format!("INSERT INTO {} (id, doc) VALUES (?1, ?2);", E::COLLECTION.name);
    conn.execute(&sql, params![id.to_string(), doc])
        .map_err(write_error::<E>)?;
    Ok(())
}

fn update_in_tx<E: Entity, P: Serialize + ?Sized>(
    conn: &Connection,
    id: RecordId,
    patch: &P,
    now: DateTime<Utc>,
) -> RepoResult<E> {
    let existing = load::<E>(conn, id)?.ok_or(RepoError::NotFound {
        collection: E::COLLECTION.name,
        id,
    })?;
    let updated = merge_patch(&existing, patch, now)?;
    let sql = format!("UPDATE {} SET doc = ?2 WHERE id = ?1;", E::COLLECTION.name);
    conn.execute(&sql, params![id.to_string(), serde_json::to_string(&updated)?])
        .map_err(write_error::<E>)?;
    Ok(updated)
}

fn write_error<E: Entity>(err: rusqlite::Error) -> RepoError {
    if let rusqlite::Error::SqliteFailure(failure, message) = &err {
        if failure.code == ErrorCode::ConstraintViolation {
            return RepoError::Constraint {
                collection: E::COLLECTION.name,
                message: message.clone().unwrap_or_else(|| failure.to_string()),
            };
        }
    }
    err.into()
}
