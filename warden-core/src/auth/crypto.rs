use std::fmt;

use argon2::{
    Algorithm, Argon2, Params, ParamsBuilder, Version,
    password_hash::{
        Error as PasswordHashError, PasswordHash, PasswordHasher,
        PasswordVerifier, Salt, SaltString,
    },
};
use rand::{TryRngCore, rngs::OsRng};
use thiserror::Error;
use zeroize::Zeroizing;

/// Password hashing helper shared by every account operation.
///
/// Passwords are hashed with Argon2id using a random per-hash salt and a
/// server-side pepper appended to the password material. The pepper never
/// leaves this type and is wiped from memory on drop.
pub struct AuthCrypto {
    argon2: Argon2<'static>,
    password_pepper: Zeroizing<Vec<u8>>,
    #[cfg(test)]
    derivations: std::sync::atomic::AtomicUsize,
}

#[derive(Debug, Error)]
pub enum AuthCryptoError {
    #[error("password pepper must not be empty")]
    EmptyPasswordPepper,
    #[error("invalid Argon2 parameters: {0}")]
    InvalidArgon2Params(String),
    #[error("password hashing error: {0}")]
    PasswordHash(String),
    #[error("hashing worker failed: {0}")]
    Worker(String),
}

impl From<PasswordHashError> for AuthCryptoError {
    fn from(err: PasswordHashError) -> Self {
        AuthCryptoError::PasswordHash(err.to_string())
    }
}

impl fmt::Debug for AuthCrypto {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthCrypto")
            .field("params", self.argon2.params())
            .field("password_pepper", &"<redacted>")
            .finish()
    }
}

impl AuthCrypto {
    /// ~64 MiB memory and 3 iterations.
    const DEFAULT_MEMORY_KIB: u32 = 64 * 1024;
    const DEFAULT_ITERATIONS: u32 = 3;
    const DEFAULT_PARALLELISM: u32 = 1;
    const SALT_LENGTH: usize = Salt::RECOMMENDED_LENGTH;

    /// Build a helper with default Argon2id parameters.
    pub fn new(password_pepper: impl AsRef<[u8]>) -> Result<Self, AuthCryptoError> {
        Self::with_params(
            password_pepper,
            ParamsBuilder::new()
                .m_cost(Self::DEFAULT_MEMORY_KIB)
                .t_cost(Self::DEFAULT_ITERATIONS)
                .p_cost(Self::DEFAULT_PARALLELISM)
                .output_len(32)
                .build()
                .map_err(|err| {
                    AuthCryptoError::InvalidArgon2Params(err.to_string())
                })?,
        )
    }

    /// Build a helper with caller-specified Argon2 parameters (useful for
    /// integration tests or constrained environments).
    pub fn with_params(
        password_pepper: impl AsRef<[u8]>,
        params: Params,
    ) -> Result<Self, AuthCryptoError> {
        let pepper = password_pepper.as_ref();
        if pepper.is_empty() {
            return Err(AuthCryptoError::EmptyPasswordPepper);
        }

        let argon2 =
            Argon2::new(Algorithm::Argon2id, Version::default(), params);

        Ok(Self {
            argon2,
            password_pepper: Zeroizing::new(pepper.to_vec()),
            #[cfg(test)]
            derivations: std::sync::atomic::AtomicUsize::new(0),
        })
    }

    /// Argon2 derivations run so far, hashes and verifications alike.
    #[cfg(test)]
    pub(crate) fn derivations(&self) -> usize {
        self.derivations.load(std::sync::atomic::Ordering::SeqCst)
    }

    fn count_derivation(&self) {
        #[cfg(test)]
        self.derivations
            .fetch_add(1, std::sync::atomic::Ordering::SeqCst);
    }

    /// Hash a password with a fresh random salt. The resulting PHC string
    /// embeds the salt and parameters and is what gets stored.
    pub fn hash_password(
        &self,
        password: &str,
    ) -> Result<String, AuthCryptoError> {
        let material = self.peppered(password);

        let mut salt_bytes = [0u8; Self::SALT_LENGTH];
        OsRng
            .try_fill_bytes(&mut salt_bytes)
            .map_err(|err| AuthCryptoError::PasswordHash(err.to_string()))?;
        let salt = SaltString::encode_b64(&salt_bytes)
            .map_err(AuthCryptoError::from)?;
        self.count_derivation();
        let hash = self.argon2.hash_password(&material, &salt)?.to_string();
        Ok(hash)
    }

    /// Verify a password against a stored PHC string.
    ///
    /// The digest comparison is constant-time. A stored hash that does not
    /// parse is an error rather than `false`: it means the record is corrupt,
    /// not that the caller typed the wrong password.
    pub fn verify_password(
        &self,
        password: &str,
        password_hash: &str,
    ) -> Result<bool, AuthCryptoError> {
        let parsed = PasswordHash::new(password_hash)?;
        let material = self.peppered(password);

        self.count_derivation();
        match self.argon2.verify_password(&material, &parsed) {
            Ok(()) => Ok(true),
            Err(PasswordHashError::Password) => Ok(false),
            Err(err) => Err(err.into()),
        }
    }

    fn peppered(&self, password: &str) -> Zeroizing<Vec<u8>> {
        let mut material = Zeroizing::new(Vec::with_capacity(
            password.len() + self.password_pepper.len(),
        ));
        material.extend_from_slice(password.as_bytes());
        material.extend_from_slice(&self.password_pepper);
        material
    }
}
