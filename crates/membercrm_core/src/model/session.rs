//! Authenticated session kept in the session slot, outside the store.

use super::user::UserRole;
use super::RecordId;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Serialized as JSON with epoch-millisecond timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    /// Id of the signed-in user.
    pub id: RecordId,
    pub email: String,
    pub name: String,
    pub role: UserRole,
    /// Opaque random token. Never logged.
    pub token: String,
    /// Absent for remember-me sessions.
    #[serde(default, with = "chrono::serde::ts_milliseconds_option")]
    pub expires_at: Option<DateTime<Utc>>,
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub last_activity_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }

    pub fn idle_for(&self, now: DateTime<Utc>) -> chrono::Duration {
        now - self.last_activity_at
    }
}

#[cfg(test)]
mod tests {
    use super::Session;
    use crate::model::user::UserRole;
    use chrono::{Duration, TimeZone, Utc};
    use uuid::Uuid;

    #[test]
    fn serializes_timestamps_as_epoch_millis() {
        let now = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let session = Session {
            id: Uuid::new_v4(),
            email: "ops@example.com".to_string(),
            name: "Ops".to_string(),
            role: UserRole::Admin,
            token: "t".to_string(),
            expires_at: Some(now + Duration::hours(24)),
            last_activity_at: now,
        };

        let value = serde_json::to_value(&session).unwrap();
        assert_eq!(value["lastActivityAt"], now.timestamp_millis());
        assert_eq!(value["role"], "admin");

        let decoded: Session = serde_json::from_value(value).unwrap();
        assert_eq!(decoded, session);
    }

    #[test]
    fn missing_expiry_means_no_time_based_expiry() {
        let json = r#"{"id":"6f1c2b9e-8a57-4c39-9a43-3b5f0c0d7e11","email":"a@b.c","name":"A","role":"user","token":"x","lastActivityAt":0}"#;
        let session: Session = serde_json::from_str(json).unwrap();
        assert!(session.expires_at.is_none());
        assert!(!session.is_expired(Utc::now()));
    }
}
