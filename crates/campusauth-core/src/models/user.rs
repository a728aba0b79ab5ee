use std::fmt;

use serde::{Deserialize, Serialize};

use super::{deserialize_opt_id, non_empty};

/// Role tag attached to an account.
///
/// The set is open: anything the server sends is kept verbatim, and only
/// `admin` and `student` carry meaning on the client.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    pub const ADMIN: &'static str = "admin";
    pub const STUDENT: &'static str = "student";

    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn admin() -> Self {
        Self::new(Self::ADMIN)
    }

    pub fn student() -> Self {
        Self::new(Self::STUDENT)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn is_admin(&self) -> bool {
        self.0 == Self::ADMIN
    }

    pub fn is_student(&self) -> bool {
        self.0 == Self::STUDENT
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(tag: &str) -> Self {
        Self::new(tag)
    }
}

/// User profile as returned by the API (login payload or profile fetch).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(
        rename = "userId",
        default,
        deserialize_with = "deserialize_opt_id",
        skip_serializing_if = "Option::is_none"
    )]
    pub user_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<Role>,
    /// Whatever else the server returned (avatar, courses, ...).
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

impl UserProfile {
    pub fn user_id(&self) -> Option<&str> {
        non_empty(self.user_id.as_deref())
    }

    pub fn role(&self) -> Option<&Role> {
        self.role.as_ref().filter(|r| !r.is_empty())
    }

    /// Display name, falling back to email.
    pub fn display_name(&self) -> &str {
        non_empty(self.name.as_deref())
            .or_else(|| non_empty(self.email.as_deref()))
            .unwrap_or("unknown user")
    }
}

/// The slice of a profile that is written to persistent storage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredUserData {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
}

impl From<&UserProfile> for StoredUserData {
    fn from(user: &UserProfile) -> Self {
        Self {
            name: user.name.clone().unwrap_or_default(),
            email: user.email.clone().unwrap_or_default(),
        }
    }
}

impl StoredUserData {
    /// Rebuild a partial profile from the stored blob plus restored id/role.
    pub fn into_profile(self, user_id: Option<String>, role: Option<Role>) -> UserProfile {
        UserProfile {
            user_id,
            name: Some(self.name),
            email: Some(self.email),
            role,
            extra: serde_json::Map::new(),
        }
    }
}
