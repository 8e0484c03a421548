use std::fmt;
use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{
    Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode,
    errors::ErrorKind,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

use crate::domain::users::Role;

/// Payload embedded in every access token.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the user id
    pub sub: Uuid,
    /// Role of the subject at the time of issuance
    pub role: Role,
    /// Issued-at (unix seconds)
    pub iat: i64,
    /// Expiry (unix seconds)
    pub exp: i64,
    /// Unique token id
    pub jti: String,
}

/// A freshly signed token plus its lifetime in seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IssuedToken {
    pub access_token: String,
    pub expires_in: u64,
}

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("invalid token")]
    InvalidToken,
    #[error("token expired")]
    ExpiredToken,
    #[error("token signing key must not be empty")]
    EmptySigningKey,
    #[error("token lifetime out of range")]
    InvalidLifetime,
    #[error("failed to encode token: {0}")]
    Encode(String),
}

/// Issues and validates stateless HS256 access tokens.
///
/// The signing key is fixed at construction. Validation is purely
/// cryptographic plus an expiry check; there is no revocation lookup.
pub struct TokenIssuer {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    validation: Validation,
    ttl: Duration,
}

impl fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("ttl_secs", &self.ttl.num_seconds())
            .finish_non_exhaustive()
    }
}

impl TokenIssuer {
    pub fn new(
        signing_key: impl AsRef<[u8]>,
        ttl: StdDuration,
    ) -> Result<Self, TokenError> {
        let key = signing_key.as_ref();
        if key.is_empty() {
            return Err(TokenError::EmptySigningKey);
        }

        let ttl =
            Duration::from_std(ttl).map_err(|_| TokenError::InvalidLifetime)?;
        if ttl <= Duration::zero() {
            return Err(TokenError::InvalidLifetime);
        }

        let mut validation = Validation::new(Algorithm::HS256);
        validation.leeway = 0;
        validation.set_required_spec_claims(&["exp", "iat", "sub"]);

        Ok(Self {
            encoding_key: EncodingKey::from_secret(key),
            decoding_key: DecodingKey::from_secret(key),
            validation,
            ttl,
        })
    }

    /// Token lifetime in whole seconds.
    pub fn ttl_secs(&self) -> u64 {
        u64::try_from(self.ttl.num_seconds()).unwrap_or_default()
    }

    pub fn issue(
        &self,
        subject: Uuid,
        role: Role,
    ) -> Result<IssuedToken, TokenError> {
        self.issue_at(subject, role, Utc::now())
    }

    /// Sign a token as if issued at `now`.
    pub fn issue_at(
        &self,
        subject: Uuid,
        role: Role,
        now: DateTime<Utc>,
    ) -> Result<IssuedToken, TokenError> {
        let claims = Claims {
            sub: subject,
            role,
            iat: now.timestamp(),
            exp: (now + self.ttl).timestamp(),
            jti: Uuid::new_v4().to_string(),
        };

        let access_token =
            encode(&Header::new(Algorithm::HS256), &claims, &self.encoding_key)
                .map_err(|err| TokenError::Encode(err.to_string()))?;

        Ok(IssuedToken {
            access_token,
            expires_in: self.ttl_secs(),
        })
    }

    pub fn decode(&self, token: &str) -> Result<Claims, TokenError> {
        decode::<Claims>(token, &self.decoding_key, &self.validation)
            .map(|data| data.claims)
            .map_err(|err| match err.kind() {
                ErrorKind::ExpiredSignature => TokenError::ExpiredToken,
                _ => TokenError::InvalidToken,
            })
    }
}
