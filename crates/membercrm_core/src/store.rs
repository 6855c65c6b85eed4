//! Explicitly constructed store: one database handle plus every repository.
//!
//! # Responsibility
//! - Wire the domain repositories to a shared `Database` and `Clock`.
//! - Expose connection lifecycle and bulk export/import for the whole store.
//!
//! # Invariants
//! - All repositories of one `Store` share the same handle and clock.
//! - Clones are cheap and refer to the same connection.

use crate::clock::{Clock, SystemClock};
use crate::db::{Database, DbResult, ExportPayload, StoreConfig};
use crate::repo::changelog_repo::ChangelogRepository;
use crate::repo::contract_repo::ContractRepository;
use crate::repo::member_repo::MemberRepository;
use crate::repo::record_repo::Repository;
use crate::repo::relation_repo::RelationRepository;
use crate::repo::settings_repo::SettingsRepository;
use crate::repo::user_repo::UserRepository;
use std::sync::Arc;

#[derive(Clone)]
pub struct Store {
    db: Database,
    clock: Arc<dyn Clock>,
    users: UserRepository,
    members: MemberRepository,
    contracts: ContractRepository,
    relations: RelationRepository,
    changelog: ChangelogRepository,
    settings: SettingsRepository,
}

impl Store {
    /// Builds an unopened store; the first repository call opens it.
    pub fn new(config: StoreConfig, clock: Arc<dyn Clock>) -> Self {
        let db = Database::new(config);
        Self {
            users: UserRepository::new(Repository::new(db.clone(), Arc::clone(&clock))),
            members: MemberRepository::new(Repository::new(db.clone(), Arc::clone(&clock))),
            contracts: ContractRepository::new(Repository::new(db.clone(), Arc::clone(&clock))),
            relations: RelationRepository::new(Repository::new(db.clone(), Arc::clone(&clock))),
            changelog: ChangelogRepository::new(Repository::new(db.clone(), Arc::clone(&clock))),
            settings: SettingsRepository::new(Repository::new(db.clone(), Arc::clone(&clock))),
            db,
            clock,
        }
    }

    /// Builds the store on the wall clock and opens it eagerly, so open and
    /// migration failures surface here.
    pub async fn open(config: StoreConfig) -> DbResult<Self> {
        Self::open_with_clock(config, Arc::new(SystemClock)).await
    }

    pub async fn open_with_clock(config: StoreConfig, clock: Arc<dyn Clock>) -> DbResult<Self> {
        let store = Self::new(config, clock);
        store.db.connect().await?;
        Ok(store)
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub fn clock(&self) -> Arc<dyn Clock> {
        Arc::clone(&self.clock)
    }

    pub fn users(&self) -> &UserRepository {
        &self.users
    }

    pub fn members(&self) -> &MemberRepository {
        &self.members
    }

    pub fn contracts(&self) -> &ContractRepository {
        &self.contracts
    }

    pub fn relations(&self) -> &RelationRepository {
        &self.relations
    }

    pub fn changelog(&self) -> &ChangelogRepository {
        &self.changelog
    }

    pub fn settings(&self) -> &SettingsRepository {
        &self.settings
    }

    pub async fn connect(&self) -> DbResult<()> {
        self.db.connect().await
    }

    pub async fn close(&self) {
        self.db.close().await
    }

    pub async fn export_all(&self) -> DbResult<ExportPayload> {
        self.db.export_all().await
    }

    pub async fn import_all(&self, payload: &ExportPayload) -> DbResult<()> {
        self.db.import_all(payload).await
    }
}
