//! Authentication and session lifecycle.
//!
//! # Responsibility
//! - Verify credentials against the users repository.
//! - Persist the current session in the session slot and expire it on time
//!   or on inactivity.
//! - Reset passwords to generated temporary ones.
//!
//! # Invariants
//! - Expected credential failures come back as `LoginOutcome::Failure` and
//!   leave the slot untouched.
//! - At most one activity-check task runs per service; it holds only a weak
//!   reference and is aborted when the service is dropped.
//! - Unreadable slot contents count as "no session" and are cleared.
//! - Tokens, passwords and hashes never reach the log.

use crate::clock::Clock;
use crate::model::session::Session;
use crate::model::user::{User, UserRole};
use crate::repo::user_repo::{normalize_email, UserRepository};
use crate::repo::RepoError;
use crate::security::password::{generate_session_token, generate_temporary_password, PasswordError};
use crate::security::strength;
use crate::service::notifier::{LogOnlyNotifier, NotifyError, PasswordResetNotifier};
use crate::session::{SessionSlot, SlotError, REMEMBER_ME_KEY, SESSION_KEY};
use crate::store::Store;
use chrono::{DateTime, Utc};
use log::{debug, info, warn};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;

const REMEMBER_ME_VALUE: &str = "true";
const CENTURY_DAYS: i64 = 36_525;

pub type AuthServiceResult<T> = Result<T, AuthServiceError>;

/// Expected credential failures, reported inside `LoginOutcome::Failure`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum AuthError {
    #[error("no user with this email")]
    UserNotFound,
    #[error("user account is not active")]
    Inactive,
    #[error("email or password is incorrect")]
    BadCredentials,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoginOutcome {
    Success(Session),
    Failure(AuthError),
}

impl LoginOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success(_))
    }

    pub fn session(&self) -> Option<&Session> {
        match self {
            Self::Success(session) => Some(session),
            Self::Failure(_) => None,
        }
    }
}

/// Unexpected failures raised by the service.
#[derive(Debug, thiserror::Error)]
pub enum AuthServiceError {
    #[error("no user registered with email `{0}`")]
    UserNotFound(String),
    #[error("validation failed: {0}")]
    Validation(String),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Slot(#[from] SlotError),
    #[error("password reset notification failed: {0}")]
    Notify(NotifyError),
    #[error(transparent)]
    Repo(RepoError),
}

impl From<RepoError> for AuthServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Password(err) => Self::Password(err),
            RepoError::Validation(message) => Self::Validation(message),
            other => Self::Repo(other),
        }
    }
}

/// Last state observed by the service.
///
/// `Expired` and `LoggedOut` answer every query like `Anonymous`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Anonymous,
    Authenticating,
    Authenticated,
    Expired,
    LoggedOut,
}

/// Session timing and reset parameters. Durations are whole seconds in JSON.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AuthConfig {
    #[serde(with = "duration_secs")]
    pub session_ttl: Duration,
    #[serde(with = "duration_secs")]
    pub inactivity_timeout: Duration,
    #[serde(with = "duration_secs")]
    pub activity_check_interval: Duration,
    pub temp_password_length: usize,
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            session_ttl: Duration::from_secs(24 * 60 * 60),
            inactivity_timeout: Duration::from_secs(30 * 60),
            activity_check_interval: Duration::from_secs(60),
            temp_password_length: 16,
        }
    }
}

mod duration_secs {
    use super::{Deserialize, Deserializer, Duration, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_secs())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_secs)
    }
}

struct AuthInner {
    users: UserRepository,
    slot: Arc<dyn SessionSlot>,
    notifier: Arc<dyn PasswordResetNotifier>,
    clock: Arc<dyn Clock>,
    config: AuthConfig,
    state: Mutex<AuthState>,
    activity_task: Mutex<Option<JoinHandle<()>>>,
}

impl Drop for AuthInner {
    fn drop(&mut self) {
        let task = self
            .activity_task
            .get_mut()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .take();
        if let Some(task) = task {
            task.abort();
        }
    }
}

/// Session state machine. Clones share one session and one activity task.
#[derive(Clone)]
pub struct AuthService {
    inner: Arc<AuthInner>,
}

impl AuthService {
    pub fn new(
        users: UserRepository,
        slot: Arc<dyn SessionSlot>,
        notifier: Arc<dyn PasswordResetNotifier>,
        clock: Arc<dyn Clock>,
        config: AuthConfig,
    ) -> Self {
        Self {
            inner: Arc::new(AuthInner {
                users,
                slot,
                notifier,
                clock,
                config,
                state: Mutex::new(AuthState::Anonymous),
                activity_task: Mutex::new(None),
            }),
        }
    }

    /// Service over `store`'s users and clock with default timing and a
    /// log-only reset notifier.
    pub fn for_store(store: &Store, slot: Arc<dyn SessionSlot>) -> Self {
        Self::new(
            store.users().clone(),
            slot,
            Arc::new(LogOnlyNotifier),
            store.clock(),
            AuthConfig::default(),
        )
    }

    pub fn config(&self) -> &AuthConfig {
        &self.inner.config
    }

    pub fn state(&self) -> AuthState {
        *lock(&self.inner.state)
    }

    /// Verifies credentials and opens a session.
    ///
    /// `remember_me` sessions have no absolute expiry; only inactivity ends
    /// them.
    pub async fn login(
        &self,
        email: &str,
        password: &str,
        remember_me: bool,
    ) -> AuthServiceResult<LoginOutcome> {
        let previous = self.replace_state(AuthState::Authenticating);
        let user = match self.inner.users.find_by_email(email).await {
            Ok(user) => user,
            Err(err) => {
                self.replace_state(previous);
                return Err(err.into());
            }
        };
        let user = match check_credentials(&self.inner.users, user, password).await {
            Ok(user) => user,
            Err(reason) => {
                self.replace_state(previous);
                info!(
                    "event=auth_login module=service status=rejected reason={}",
                    failure_code(reason)
                );
                return Ok(LoginOutcome::Failure(reason));
            }
        };

        let now = self.inner.clock.now();
        let session = Session {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
            role: user.role,
            token: generate_session_token(),
            expires_at: (!remember_me).then(|| {
                now.checked_add_signed(to_chrono(self.inner.config.session_ttl))
                    .unwrap_or(DateTime::<Utc>::MAX_UTC)
            }),
            last_activity_at: now,
        };
        if let Err(err) = self.persist_login(&session, remember_me) {
            self.replace_state(previous);
            return Err(err);
        }
        self.replace_state(AuthState::Authenticated);
        self.start_activity_check();
        info!(
            "event=auth_login module=service status=ok user_id={} remember_me={remember_me}",
            user.id
        );
        Ok(LoginOutcome::Success(session))
    }

    /// Clears the session and the remember-me flag and stops the check.
    pub fn logout(&self) -> AuthServiceResult<()> {
        self.stop_activity_check();
        self.clear_slot()?;
        self.replace_state(AuthState::LoggedOut);
        info!("event=auth_logout module=service status=ok");
        Ok(())
    }

    /// Current non-expired session, if any.
    ///
    /// An expired session is discarded on the way out.
    pub fn get_current_session(&self) -> AuthServiceResult<Option<Session>> {
        let Some(session) = self.read_session()? else {
            return Ok(None);
        };
        if session.is_expired(self.inner.clock.now()) {
            self.discard("expired")?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// Marks the session as active now; returns `false` when there is none.
    pub fn update_last_activity(&self) -> AuthServiceResult<bool> {
        let Some(mut session) = self.get_current_session()? else {
            return Ok(false);
        };
        session.last_activity_at = self.inner.clock.now();
        self.write_session(&session)?;
        Ok(true)
    }

    /// Evaluates the inactivity rule once.
    ///
    /// Returns the session that survived, or `None` when there is no session
    /// left (absent, expired, or idle past the timeout).
    pub fn check_inactivity(&self) -> AuthServiceResult<Option<Session>> {
        let Some(session) = self.get_current_session()? else {
            return Ok(None);
        };
        let idle = session.idle_for(self.inner.clock.now());
        if idle > to_chrono(self.inner.config.inactivity_timeout) {
            self.discard("inactive")?;
            return Ok(None);
        }
        Ok(Some(session))
    }

    /// Resumes a persisted session after a restart and re-arms the check.
    pub fn restore(&self) -> AuthServiceResult<Option<Session>> {
        let session = self.check_inactivity()?;
        if let Some(session) = &session {
            self.replace_state(AuthState::Authenticated);
            self.start_activity_check();
            info!(
                "event=auth_restore module=service status=ok user_id={}",
                session.id
            );
        }
        Ok(session)
    }

    /// Spawns the periodic inactivity check. No-op while one is running or
    /// outside a tokio runtime.
    pub fn start_activity_check(&self) {
        let mut task = lock(&self.inner.activity_task);
        if task.as_ref().is_some_and(|handle| !handle.is_finished()) {
            return;
        }
        let runtime = match tokio::runtime::Handle::try_current() {
            Ok(runtime) => runtime,
            Err(_) => {
                warn!("event=activity_check module=service status=skipped reason=no_runtime");
                return;
            }
        };

        let period = self
            .inner
            .config
            .activity_check_interval
            .max(Duration::from_millis(1));
        let service = Arc::downgrade(&self.inner);
        *task = Some(runtime.spawn(run_activity_check(service, period)));
        debug!(
            "event=activity_check module=service status=started period_secs={}",
            period.as_secs()
        );
    }

    pub fn stop_activity_check(&self) {
        if let Some(task) = lock(&self.inner.activity_task).take() {
            task.abort();
            debug!("event=activity_check module=service status=stopped");
        }
    }

    pub fn is_activity_check_running(&self) -> bool {
        lock(&self.inner.activity_task)
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Replaces the user's password with a generated one and notifies them.
    ///
    /// Unknown emails fail with `UserNotFound` before anything is written.
    pub async fn reset_password(&self, email: &str) -> AuthServiceResult<()> {
        let user = self
            .inner
            .users
            .find_by_email(email)
            .await?
            .ok_or_else(|| AuthServiceError::UserNotFound(normalize_email(email)))?;

        let temporary = generate_temporary_password(self.inner.config.temp_password_length);
        let report = strength::validate(&temporary);
        if !report.is_strong {
            return Err(AuthServiceError::Validation(report.feedback.join("; ")));
        }

        self.inner.users.update_password(user.id, &temporary).await?;
        self.inner
            .notifier
            .password_reset(&user, &temporary)
            .await
            .map_err(AuthServiceError::Notify)?;
        info!(
            "event=password_reset module=service status=ok user_id={}",
            user.id
        );
        Ok(())
    }

    pub fn is_authenticated(&self) -> bool {
        self.current_session_or_none().is_some()
    }

    pub fn has_role(&self, role: UserRole) -> bool {
        self.current_session_or_none()
            .is_some_and(|session| session.role == role)
    }

    pub fn is_admin(&self) -> bool {
        self.has_role(UserRole::Admin)
    }

    fn current_session_or_none(&self) -> Option<Session> {
        match self.get_current_session() {
            Ok(session) => session,
            Err(err) => {
                warn!("event=session_read module=service status=error error={err}");
                None
            }
        }
    }

    fn read_session(&self) -> AuthServiceResult<Option<Session>> {
        let raw = match self.inner.slot.get(SESSION_KEY) {
            Ok(Some(raw)) => raw,
            Ok(None) => return Ok(None),
            Err(SlotError::Serialization(err)) => {
                warn!("event=session_read module=service status=corrupt_slot error={err}");
                self.clear_slot()?;
                return Ok(None);
            }
            Err(err) => return Err(err.into()),
        };
        match serde_json::from_str::<Session>(&raw) {
            Ok(session) => Ok(Some(session)),
            Err(err) => {
                warn!("event=session_read module=service status=corrupt error={err}");
                self.clear_slot()?;
                Ok(None)
            }
        }
    }

    fn write_session(&self, session: &Session) -> AuthServiceResult<()> {
        let raw = serde_json::to_string(session).map_err(SlotError::from)?;
        self.inner.slot.set(SESSION_KEY, &raw)?;
        Ok(())
    }

    fn persist_login(&self, session: &Session, remember_me: bool) -> AuthServiceResult<()> {
        self.write_session(session)?;
        if remember_me {
            self.inner.slot.set(REMEMBER_ME_KEY, REMEMBER_ME_VALUE)?;
        } else {
            self.inner.slot.remove(REMEMBER_ME_KEY)?;
        }
        Ok(())
    }

    fn clear_slot(&self) -> AuthServiceResult<()> {
        self.inner.slot.remove(SESSION_KEY)?;
        self.inner.slot.remove(REMEMBER_ME_KEY)?;
        Ok(())
    }

    fn discard(&self, reason: &str) -> AuthServiceResult<()> {
        self.stop_activity_check();
        self.clear_slot()?;
        self.replace_state(AuthState::Expired);
        info!("event=session_discard module=service status=ok reason={reason}");
        Ok(())
    }

    fn replace_state(&self, next: AuthState) -> AuthState {
        std::mem::replace(&mut *lock(&self.inner.state), next)
    }
}

async fn run_activity_check(service: Weak<AuthInner>, period: Duration) {
    let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
    loop {
        ticker.tick().await;
        let Some(inner) = service.upgrade() else {
            break;
        };
        let service = AuthService { inner };
        match service.check_inactivity() {
            Ok(Some(_)) => {}
            Ok(None) => break,
            Err(err) => {
                warn!("event=activity_check module=service status=error error={err}");
            }
        }
    }
}

async fn check_credentials(
    users: &UserRepository,
    user: Option<User>,
    password: &str,
) -> Result<User, AuthError> {
    let user = user.ok_or(AuthError::UserNotFound)?;
    if !user.is_active() {
        return Err(AuthError::Inactive);
    }
    if !users.verify_password(&user, password).await {
        return Err(AuthError::BadCredentials);
    }
    Ok(user)
}

fn failure_code(reason: AuthError) -> &'static str {
    match reason {
        AuthError::UserNotFound => "user_not_found",
        AuthError::Inactive => "inactive",
        AuthError::BadCredentials => "bad_credentials",
    }
}

/// Out-of-range durations saturate at a century so date arithmetic never overflows.
fn to_chrono(duration: Duration) -> chrono::Duration {
    chrono::Duration::from_std(duration)
        .unwrap_or(chrono::Duration::days(CENTURY_DAYS))
        .min(chrono::Duration::days(CENTURY_DAYS))
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

#[cfg(test)]
mod tests {
    use super::{AuthConfig, AuthError, AuthServiceError};
    use crate::repo::RepoError;
    use std::time::Duration;

    #[test]
    fn config_defaults_and_json_seconds() {
        let config = AuthConfig::default();
        assert_eq!(config.session_ttl, Duration::from_secs(86_400));
        assert_eq!(config.inactivity_timeout, Duration::from_secs(1_800));
        assert_eq!(config.activity_check_interval, Duration::from_secs(60));
        assert_eq!(config.temp_password_length, 16);

        let parsed: AuthConfig =
            serde_json::from_str(r#"{"inactivityTimeout": 600}"#).unwrap();
        assert_eq!(parsed.inactivity_timeout, Duration::from_secs(600));
        assert_eq!(parsed.session_ttl, config.session_ttl);
    }

    #[test]
    fn repo_validation_maps_to_service_validation() {
        let err: AuthServiceError = RepoError::validation("password is required").into();
        assert!(matches!(err, AuthServiceError::Validation(_)));
    }

    #[test]
    fn auth_errors_read_like_user_messages() {
        assert_eq!(
            AuthError::BadCredentials.to_string(),
            "email or password is incorrect"
        );
    }
}
