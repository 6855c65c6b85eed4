//! Delivery seam for temporary passwords produced by a reset.

use crate::model::user::User;
use async_trait::async_trait;
use log::info;

/// Error raised by a notifier implementation.
pub type NotifyError = Box<dyn std::error::Error + Send + Sync>;

/// Hands a freshly generated temporary password to its owner.
///
/// Implementations own delivery (email, SMS, printed slip). The plaintext must
/// not be persisted or logged by them.
#[async_trait]
pub trait PasswordResetNotifier: Send + Sync {
    async fn password_reset(&self, user: &User, temporary_password: &str) -> Result<(), NotifyError>;
}

/// Records that a reset happened and drops the password.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogOnlyNotifier;

#[async_trait]
impl PasswordResetNotifier for LogOnlyNotifier {
    async fn password_reset(&self, user: &User, _temporary_password: &str) -> Result<(), NotifyError> {
        info!(
            "event=password_reset_notify module=service status=ok user_id={} channel=log",
            user.id
        );
        Ok(())
    }
}
