use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::role::Role;
use super::user::User;
use super::validation::{
    ValidationError, validate_email, validate_fullname, validate_password,
};
use crate::auth::IssuedToken;

/// Request to register a new account
#[derive(Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub fullname: String,
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub avatar_url: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub position: Option<String>,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fullname(&self.fullname)?;
        validate_email(&self.email)?;
        validate_password(&self.password)?;
        Ok(())
    }
}

impl fmt::Debug for RegisterRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RegisterRequest")
            .field("fullname", &self.fullname)
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .field("avatar_url", &self.avatar_url)
            .field("phone", &self.phone)
            .field("position", &self.position)
            .finish()
    }
}

/// Request to log in with email and password
#[derive(Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Request to replace the caller's password
#[derive(Clone, Serialize, Deserialize)]
pub struct PasswordChange {
    pub current_password: String,
    pub new_password: String,
}

impl PasswordChange {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_password(&self.new_password)
    }
}

impl fmt::Debug for PasswordChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PasswordChange").finish_non_exhaustive()
    }
}

/// Successful login response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthToken {
    pub access_token: String,
    /// Always `"bearer"`
    pub token_type: String,
    /// Seconds until the access token expires
    pub expires_in: u64,
}

impl From<IssuedToken> for AuthToken {
    fn from(token: IssuedToken) -> Self {
        Self {
            access_token: token.access_token,
            token_type: "bearer".to_string(),
            expires_in: token.expires_in,
        }
    }
}

/// Compact identity returned by `GET /me`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CurrentUser {
    pub id: Uuid,
    pub email: String,
    pub role: Role,
    pub fullname: String,
}

impl From<&User> for CurrentUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            role: user.role,
            fullname: user.fullname.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminGreeting {
    pub message: String,
}
