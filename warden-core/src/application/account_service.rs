use std::fmt;
use std::sync::Arc;

use tracing::{info, warn};
use uuid::Uuid;

use crate::auth::{AuthCrypto, AuthCryptoError, Claims, TokenIssuer};
use crate::database::ports::users::UserStore;
use crate::domain::users::{
    AdminGreeting, AuthToken, CurrentUser, LoginRequest, PasswordChange,
    RegisterRequest, Role, User, UserPatch, user::normalize_email,
};
use crate::error::{AccountError, Result, StoreError};

/// Roles allowed through the admin-only endpoint.
pub const ADMIN_ROLES: &[Role] = &[Role::Admin, Role::Superadmin];

/// Account operations. Each call runs inside its own unit of work, so a
/// failure at any step leaves persisted state as it was.
pub struct AccountService {
    store: Arc<dyn UserStore>,
    crypto: Arc<AuthCrypto>,
    tokens: Arc<TokenIssuer>,
}

impl fmt::Debug for AccountService {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AccountService")
            .field("crypto", &self.crypto)
            .field("tokens", &self.tokens)
            .finish_non_exhaustive()
    }
}

impl AccountService {
    pub fn new(
        store: Arc<dyn UserStore>,
        crypto: Arc<AuthCrypto>,
        tokens: Arc<TokenIssuer>,
    ) -> Self {
        Self {
            store,
            crypto,
            tokens,
        }
    }

    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    /// Create a `user`-role account and return it as stored.
    pub async fn register(&self, request: RegisterRequest) -> Result<User> {
        request.validate()?;

        let RegisterRequest {
            fullname,
            email,
            password,
            avatar_url,
            phone,
            position,
        } = request;

        let password_hash = self.hash_password(password).await?;
        let user = User::new(
            &email,
            password_hash,
            &fullname,
            avatar_url,
            phone,
            position,
        );

        let mut uow = self.store.begin().await?;
        let created = uow.create(&user).await?;
        uow.commit().await?;

        info!(user_id = %created.id, "registered account");
        Ok(created)
    }

    /// Exchange email and password for an access token.
    ///
    /// Unknown email and wrong password produce the same error. An unknown
    /// email still pays for one Argon2 derivation so the two cases also take
    /// comparable time.
    pub async fn login(&self, request: LoginRequest) -> Result<AuthToken> {
        let LoginRequest { email, password } = request;
        let email = normalize_email(&email);

        let user = {
            let mut uow = self.store.begin().await?;
            uow.get_by_email(&email).await?
        };

        let Some(user) = user else {
            self.hash_password(password).await?;
            warn!("login rejected");
            return Err(AccountError::Unauthorized);
        };

        if !self.verify_password(password, user.password_hash.clone()).await? {
            warn!(user_id = %user.id, "login rejected");
            return Err(AccountError::Unauthorized);
        }

        let token = self.tokens.issue(user.id, user.role)?;
        info!(user_id = %user.id, "issued access token");
        Ok(token.into())
    }

    /// Decode a bearer token and load the user it names.
    pub async fn authenticate(&self, token: &str) -> Result<User> {
        let Claims { sub, .. } = self.tokens.decode(token)?;

        let mut uow = self.store.begin().await?;
        uow.get(sub).await?.ok_or(AccountError::InvalidToken)
    }

    pub fn current_user(&self, user: &User) -> CurrentUser {
        CurrentUser::from(user)
    }

    pub fn admin_greeting(&self, user: &User) -> AdminGreeting {
        AdminGreeting {
            message: format!("Hello, {}. You have access!", user.fullname),
        }
    }

    /// Apply a partial profile update to the caller's own record.
    pub async fn update_profile(
        &self,
        user_id: Uuid,
        patch: UserPatch,
    ) -> Result<User> {
        patch.validate()?;

        let mut uow = self.store.begin().await?;
        if patch.is_empty() {
            return uow.get(user_id).await?.ok_or(AccountError::Unauthorized);
        }

        let updated = uow
            .update_profile(user_id, &patch)
            .await
            .map_err(missing_account)?;
        uow.commit().await?;

        info!(user_id = %updated.id, "updated profile");
        Ok(updated)
    }

    /// Replace the caller's password after checking the current one.
    ///
    /// Both Argon2 runs happen before the write transaction opens, and the
    /// write touches only the hash column.
    pub async fn change_password(
        &self,
        user_id: Uuid,
        request: PasswordChange,
    ) -> Result<()> {
        request.validate()?;
        let PasswordChange {
            current_password,
            new_password,
        } = request;

        let user = {
            let mut uow = self.store.begin().await?;
            uow.get(user_id).await?.ok_or(AccountError::Unauthorized)?
        };

        if !self
            .verify_password(current_password, user.password_hash)
            .await?
        {
            warn!(user_id = %user.id, "password change rejected");
            return Err(AccountError::InvalidCredential);
        }
        let password_hash = self.hash_password(new_password).await?;

        let mut uow = self.store.begin().await?;
        uow.set_password_hash(user.id, &password_hash)
            .await
            .map_err(missing_account)?;
        uow.commit().await?;

        info!(user_id = %user.id, "changed password");
        Ok(())
    }

    async fn hash_password(&self, password: String) -> Result<String> {
        let crypto = Arc::clone(&self.crypto);
        let hash = tokio::task::spawn_blocking(move || {
            crypto.hash_password(&password)
        })
        .await
        .map_err(|err| AuthCryptoError::Worker(err.to_string()))??;
        Ok(hash)
    }

    async fn verify_password(
        &self,
        password: String,
        password_hash: String,
    ) -> Result<bool> {
        let crypto = Arc::clone(&self.crypto);
        let verified = tokio::task::spawn_blocking(move || {
            crypto.verify_password(&password, &password_hash)
        })
        .await
        .map_err(|err| AuthCryptoError::Worker(err.to_string()))??;
        Ok(verified)
    }
}

/// The caller's account disappeared between authentication and the write.
fn missing_account(err: StoreError) -> AccountError {
    match err {
        StoreError::NotFound => AccountError::Unauthorized,
        other => other.into(),
    }
}
