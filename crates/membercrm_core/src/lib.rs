//! Core persistence and session layer for MemberCRM.
//! This crate is the single source of truth for record invariants.

pub mod clock;
pub mod db;
pub mod logging;
pub mod model;
pub mod repo;
pub mod security;
pub mod service;
pub mod session;
pub mod store;

pub use clock::{Clock, ManualClock, SystemClock};
pub use db::{Database, DbError, DbResult, ExportPayload, StoreConfig, StoreLocation};
pub use logging::{default_log_level, init_logging, LogSettings, LoggingError};
pub use model::changelog::{ChangeAction, ChangelogEntry, FieldChange};
pub use model::contract::{Attachment, Contract, ContractPatch, ContractStatus, NewContract};
pub use model::member::{
    member_state, Member, MemberPatch, MemberState, MemberStatus, MemberType, NewMember,
};
pub use model::relation::{NewRelation, Relation};
pub use model::session::Session;
pub use model::setting::Setting;
pub use model::user::{NewUser, User, UserRole, UserStatus};
pub use model::{Entity, RecordId};
pub use repo::record_repo::{KeyRange, Repository};
pub use repo::{RepoError, RepoResult};
pub use security::strength::{strength_label, validate as validate_password, StrengthReport};
pub use service::auth_service::{
    AuthConfig, AuthError, AuthService, AuthServiceError, AuthServiceResult, AuthState,
    LoginOutcome,
};
pub use service::notifier::{LogOnlyNotifier, PasswordResetNotifier};
pub use session::{FileSessionSlot, MemorySessionSlot, SessionSlot, SlotError};
pub use store::Store;

/// Returns the core crate version.
pub fn core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
