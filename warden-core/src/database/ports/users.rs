use async_trait::async_trait;
use uuid::Uuid;

use crate::domain::users::{Role, User, UserPatch};
use crate::error::StoreError;

/// Entry point to user persistence. Every request opens its own unit of work.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn begin(&self) -> Result<Box<dyn UserUnitOfWork>, StoreError>;
}

/// A scoped transaction over user records.
///
/// Writes become visible to other units of work only after [`commit`].
/// Dropping the unit of work without committing discards its writes, so an
/// early return on any error path leaves the store untouched.
///
/// [`commit`]: UserUnitOfWork::commit
#[async_trait]
pub trait UserUnitOfWork: Send {
    async fn get(&mut self, id: Uuid) -> Result<Option<User>, StoreError>;

    /// Look up by normalized (trimmed, lowercased) email.
    async fn get_by_email(
        &mut self,
        email: &str,
    ) -> Result<Option<User>, StoreError>;

    /// Insert a new record and return it as stored. Duplicate emails fail
    /// with [`StoreError::Conflict`].
    async fn create(&mut self, user: &User) -> Result<User, StoreError>;

    /// Write only the fields present in `patch` and return the refreshed
    /// row. Columns the patch does not name are never rewritten, so a
    /// concurrent password change survives a profile update and vice versa.
    async fn update_profile(
        &mut self,
        id: Uuid,
        patch: &UserPatch,
    ) -> Result<User, StoreError>;

    async fn set_password_hash(
        &mut self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), StoreError>;

    async fn set_role(&mut self, id: Uuid, role: Role) -> Result<(), StoreError>;

    async fn commit(self: Box<Self>) -> Result<(), StoreError>;
}
