//! The persisted user record and its client-facing projections.
//!
//! [`User`] is what the store holds. It is deliberately not `Serialize`:
//! responses go through [`UserProfile`], which has no password field, so a
//! hash can never end up in a response body by accident.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use super::role::Role;
use super::validation::{ValidationError, validate_fullname};

/// A registered account.
#[derive(Clone, PartialEq, Eq)]
pub struct User {
    /// Unique user identifier
    pub id: Uuid,
    /// Unique login key, stored trimmed and lowercased
    pub email: String,
    /// Argon2id PHC string
    pub password_hash: String,
    pub role: Role,
    pub fullname: String,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl fmt::Debug for User {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("User")
            .field("id", &self.id)
            .field("email", &self.email)
            .field("password_hash", &"<redacted>")
            .field("role", &self.role)
            .field("fullname", &self.fullname)
            .field("avatar_url", &self.avatar_url)
            .field("phone", &self.phone)
            .field("position", &self.position)
            .field("created_at", &self.created_at)
            .field("updated_at", &self.updated_at)
            .finish()
    }
}

impl User {
    /// Build a fresh `user`-role account around an already computed hash.
    pub fn new(
        email: &str,
        password_hash: String,
        fullname: &str,
        avatar_url: Option<String>,
        phone: Option<String>,
        position: Option<String>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::now_v7(),
            email: normalize_email(email),
            password_hash,
            role: Role::User,
            fullname: fullname.trim().to_string(),
            avatar_url,
            phone,
            position,
            created_at: now,
            updated_at: now,
        }
    }

    /// Apply only the fields present in `patch`. Timestamps are left to the
    /// caller.
    pub fn apply_patch(&mut self, patch: &UserPatch) {
        if let Some(fullname) = &patch.fullname {
            self.fullname = fullname.trim().to_string();
        }
        if let Some(avatar_url) = &patch.avatar_url {
            self.avatar_url = avatar_url.clone();
        }
        if let Some(phone) = &patch.phone {
            self.phone = phone.clone();
        }
        if let Some(position) = &patch.position {
            self.position = position.clone();
        }
    }
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Everything about a user that may be shown to a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub fullname: String,
    pub avatar_url: Option<String>,
    pub phone: Option<String>,
    pub position: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            fullname: user.fullname.clone(),
            avatar_url: user.avatar_url.clone(),
            phone: user.phone.clone(),
            position: user.position.clone(),
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

impl From<User> for UserProfile {
    fn from(user: User) -> Self {
        Self::from(&user)
    }
}

/// Self-service profile update.
///
/// Only these four fields are updatable. A missing key leaves the field
/// untouched; for the optional fields an explicit `null` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UserPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fullname: Option<String>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub avatar_url: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub phone: Option<Option<String>>,
    #[serde(
        default,
        deserialize_with = "present",
        skip_serializing_if = "Option::is_none"
    )]
    pub position: Option<Option<String>>,
}

impl UserPatch {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if let Some(ref fullname) = self.fullname {
            validate_fullname(fullname)?;
        }
        Ok(())
    }

    pub fn is_empty(&self) -> bool {
        self.fullname.is_none()
            && self.avatar_url.is_none()
            && self.phone.is_none()
            && self.position.is_none()
    }
}

/// Distinguishes a key that is present (possibly `null`) from one that is
/// absent, which `#[serde(default)]` maps to `None`.
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
