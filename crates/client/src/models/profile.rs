//! User profile record.

use serde::{Deserialize, Serialize};

use abshine_core::{Email, Role};

/// A user's profile record in the remote store, keyed by email.
///
/// Written at registration and read back at login. Records predating the
/// role field deserialize with the default role.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileRecord {
    /// Display name.
    pub name: String,
    /// Identity key; duplicated inside the record for listing screens.
    pub email: Email,
    /// Role granted to this user.
    #[serde(default)]
    pub role: Role,
}
