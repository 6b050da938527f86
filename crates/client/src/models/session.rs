//! Authenticated session model and lifecycle policy.
//!
//! A session is created at login and lives for a fixed window measured from
//! `login_time` — no sliding expiration, no refresh. Expiry is checked at
//! startup and opportunistically, never by a background timer.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use abshine_core::{Email, Role};

/// Fixed session lifetime, measured from login.
pub const SESSION_TTL_HOURS: i64 = 24;

/// The signed-in user's session record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSession {
    /// Display name from the profile record.
    pub name: String,
    /// Identity key.
    pub email: Email,
    /// Role from the profile record.
    pub role: Role,
    /// When this session was established.
    pub login_time: DateTime<Utc>,
}

impl UserSession {
    /// Create a session established at `login_time`.
    #[must_use]
    pub const fn new(name: String, email: Email, role: Role, login_time: DateTime<Utc>) -> Self {
        Self {
            name,
            email,
            role,
            login_time,
        }
    }

    /// Whether the session has outlived its TTL as of `now`.
    ///
    /// The boundary is strict: a session exactly [`SESSION_TTL_HOURS`] old is
    /// still valid.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now.signed_duration_since(self.login_time) > Duration::hours(SESSION_TTL_HOURS)
    }
}
