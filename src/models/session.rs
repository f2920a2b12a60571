use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::user::Role;

/// Represents a user session.
///
/// Stored as JSON in Redis under `session:{id}`. Sessions are only ever
/// created by the login path; everything else just reads them.
/// The cached `role` is for UI routing convenience only — privileged
/// operations re-verify the role against the database.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// The session identifier (also the Redis key suffix and cookie value).
    pub id: Uuid,
    /// The ID of the user this session belongs to.
    pub user_id: Uuid,
    /// The role at the time the session was issued.
    pub role: Role,
    /// The client IP observed at login, if known.
    pub ip_address: Option<String>,
    /// The client user agent observed at login, if known.
    pub user_agent: Option<String>,
    /// The timestamp when the session was created.
    pub created_at: DateTime<Utc>,
    /// The timestamp when the session expires.
    pub expires_at: DateTime<Utc>,
}

impl Session {
    /// Whether the session is expired at `now`.
    ///
    /// A session whose `expires_at` equals `now` is already expired; only a
    /// strictly-future expiry counts as valid.
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at <= now
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn session_expiring_at(expires_at: DateTime<Utc>) -> Session {
        Session {
            id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            role: Role::Customer,
            ip_address: None,
            user_agent: None,
            created_at: expires_at - Duration::days(7),
            expires_at,
        }
    }

    #[test]
    fn expiry_exactly_now_is_expired() {
        let now = Utc::now();
        assert!(session_expiring_at(now).is_expired(now));
    }

    #[test]
    fn future_expiry_is_valid() {
        let now = Utc::now();
        assert!(!session_expiring_at(now + Duration::seconds(1)).is_expired(now));
    }

    #[test]
    fn past_expiry_is_expired() {
        let now = Utc::now();
        assert!(session_expiring_at(now - Duration::seconds(1)).is_expired(now));
    }
}
