use thiserror::Error;

use crate::auth::{AuthCryptoError, TokenError};
use crate::domain::users::ValidationError;

/// Failures surfaced by account operations.
///
/// User-facing variants carry fixed English messages. `Unauthorized` in
/// particular never says whether the email or the password was wrong.
#[derive(Error, Debug)]
pub enum AccountError {
    #[error("Invalid email or password")]
    Unauthorized,

    #[error("Insufficient role for this resource")]
    Forbidden,

    #[error("Current password is incorrect")]
    InvalidCredential,

    #[error("Invalid access token")]
    InvalidToken,

    #[error("Access token expired")]
    ExpiredToken,

    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("credential hashing failed: {0}")]
    Crypto(#[from] AuthCryptoError),

    #[error("token signing failed: {0}")]
    Token(TokenError),
}

impl From<TokenError> for AccountError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidToken => Self::InvalidToken,
            TokenError::ExpiredToken => Self::ExpiredToken,
            other => Self::Token(other),
        }
    }
}

/// Errors raised by the persistence layer. These travel through the account
/// service untranslated.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("{0}")]
    Conflict(String),

    #[error("Record not found")]
    NotFound,

    #[error("unknown role '{0}' in stored record")]
    UnknownRole(String),

    #[cfg(feature = "database")]
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("internal store error: {0}")]
    Internal(String),
}

pub type Result<T> = std::result::Result<T, AccountError>;
