use std::collections::{HashMap, hash_map::Entry};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use crate::database::ports::users::{UserStore, UserUnitOfWork};
use crate::domain::users::{Role, User, UserPatch};
use crate::error::StoreError;

const DUPLICATE_EMAIL: &str = "Email already registered";

/// Process-local user store.
///
/// Used when no database is configured and throughout the test suites. Each
/// unit of work stages its writes and replays them against the committed
/// rows under the write lock at commit time. Field edits are replayed as
/// edits, not as row snapshots, so two units of work touching different
/// columns of the same user both land.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserStore {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
}

impl InMemoryUserStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.read().is_empty()
    }
}

#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn begin(&self) -> Result<Box<dyn UserUnitOfWork>, StoreError> {
        Ok(Box::new(InMemoryUnitOfWork {
            users: Arc::clone(&self.users),
            writes: Vec::new(),
        }))
    }
}

#[derive(Debug, Clone)]
enum StagedWrite {
    Create(User),
    Profile {
        id: Uuid,
        patch: UserPatch,
        at: DateTime<Utc>,
    },
    PasswordHash {
        id: Uuid,
        password_hash: String,
        at: DateTime<Utc>,
    },
    Role {
        id: Uuid,
        role: Role,
        at: DateTime<Utc>,
    },
}

impl StagedWrite {
    fn id(&self) -> Uuid {
        match self {
            Self::Create(user) => user.id,
            Self::Profile { id, .. }
            | Self::PasswordHash { id, .. }
            | Self::Role { id, .. } => *id,
        }
    }

    /// Apply a field edit to `user`. Creates are handled by the caller.
    fn edit(&self, user: &mut User) {
        match self {
            Self::Create(_) => {}
            Self::Profile { patch, at, .. } => {
                user.apply_patch(patch);
                user.updated_at = *at;
            }
            Self::PasswordHash {
                password_hash, at, ..
            } => {
                user.password_hash.clone_from(password_hash);
                user.updated_at = *at;
            }
            Self::Role { role, at, .. } => {
                user.role = *role;
                user.updated_at = *at;
            }
        }
    }
}

#[derive(Debug)]
struct InMemoryUnitOfWork {
    users: Arc<RwLock<HashMap<Uuid, User>>>,
    writes: Vec<StagedWrite>,
}

impl InMemoryUnitOfWork {
    fn staged_creates(&self) -> impl Iterator<Item = &User> {
        self.writes.iter().filter_map(|write| match write {
            StagedWrite::Create(user) => Some(user),
            _ => None,
        })
    }

    /// The row as this unit of work sees it: committed state (or a staged
    /// create) with this unit's own edits replayed on top.
    fn project(&self, id: Uuid) -> Option<User> {
        let mut user = self
            .staged_creates()
            .find(|user| user.id == id)
            .cloned()
            .or_else(|| self.users.read().get(&id).cloned())?;
        for write in self.writes.iter().filter(|write| write.id() == id) {
            write.edit(&mut user);
        }
        Some(user)
    }

    fn email_taken(&self, email: &str, except: Uuid) -> bool {
        self.staged_creates()
            .any(|user| user.id != except && user.email == email)
            || self
                .users
                .read()
                .values()
                .any(|user| user.id != except && user.email == email)
    }

    fn stage_edit(&mut self, write: StagedWrite) -> Result<User, StoreError> {
        let id = write.id();
        if self.project(id).is_none() {
            return Err(StoreError::NotFound);
        }
        self.writes.push(write);
        self.project(id).ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl UserUnitOfWork for InMemoryUnitOfWork {
    async fn get(&mut self, id: Uuid) -> Result<Option<User>, StoreError> {
        Ok(self.project(id))
    }

    async fn get_by_email(
        &mut self,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        let id = self
            .staged_creates()
            .find(|user| user.email == email)
            .map(|user| user.id)
            .or_else(|| {
                self.users
                    .read()
                    .values()
                    .find(|user| user.email == email)
                    .map(|user| user.id)
            });
        Ok(id.and_then(|id| self.project(id)))
    }

    async fn create(&mut self, user: &User) -> Result<User, StoreError> {
        if self.project(user.id).is_some() {
            return Err(StoreError::Conflict("User already exists".to_string()));
        }
        if self.email_taken(&user.email, user.id) {
            return Err(StoreError::Conflict(DUPLICATE_EMAIL.to_string()));
        }
        self.writes.push(StagedWrite::Create(user.clone()));
        Ok(user.clone())
    }

    async fn update_profile(
        &mut self,
        id: Uuid,
        patch: &UserPatch,
    ) -> Result<User, StoreError> {
        self.stage_edit(StagedWrite::Profile {
            id,
            patch: patch.clone(),
            at: Utc::now(),
        })
    }

    async fn set_password_hash(
        &mut self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        self.stage_edit(StagedWrite::PasswordHash {
            id,
            password_hash: password_hash.to_string(),
            at: Utc::now(),
        })
        .map(drop)
    }

    async fn set_role(&mut self, id: Uuid, role: Role) -> Result<(), StoreError> {
        self.stage_edit(StagedWrite::Role {
            id,
            role,
            at: Utc::now(),
        })
        .map(drop)
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        let Self { users, writes } = *self;
        let mut committed = users.write();
        let mut touched: HashMap<Uuid, User> = HashMap::new();

        for write in writes {
            let edit = match write {
                StagedWrite::Create(user) => {
                    // Another unit of work may have claimed the id or email
                    // since staging.
                    if committed.contains_key(&user.id) {
                        return Err(StoreError::Conflict(
                            "User already exists".to_string(),
                        ));
                    }
                    if committed.values().chain(touched.values()).any(|other| {
                        other.id != user.id && other.email == user.email
                    }) {
                        return Err(StoreError::Conflict(
                            DUPLICATE_EMAIL.to_string(),
                        ));
                    }
                    touched.insert(user.id, user);
                    continue;
                }
                edit => edit,
            };

            let id = edit.id();
            let user = match touched.entry(id) {
                Entry::Occupied(entry) => entry.into_mut(),
                Entry::Vacant(entry) => entry.insert(
                    committed.get(&id).cloned().ok_or(StoreError::NotFound)?,
                ),
            };
            edit.edit(user);
        }

        committed.extend(touched);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(email: &str) -> User {
        User::new(email, "$argon2id$stub".to_string(), "Mem", None, None, None)
    }

    #[tokio::test]
    async fn writes_are_invisible_until_commit() {
        let store = InMemoryUserStore::new();
        let alice = user("alice@example.com");

        let mut uow = store.begin().await.unwrap();
        uow.create(&alice).await.unwrap();
        assert!(uow.get(alice.id).await.unwrap().is_some());
        assert!(store.is_empty());

        uow.commit().await.unwrap();
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn dropping_without_commit_rolls_back() {
        let store = InMemoryUserStore::new();
        {
            let mut uow = store.begin().await.unwrap();
            uow.create(&user("dropped@example.com")).await.unwrap();
        }
        assert!(store.is_empty());

        let mut uow = store.begin().await.unwrap();
        assert!(
            uow.get_by_email("dropped@example.com")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn rejects_duplicate_email() {
        let store = InMemoryUserStore::new();
        let mut uow = store.begin().await.unwrap();
        uow.create(&user("dup@example.com")).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        assert!(matches!(
            uow.create(&user("dup@example.com")).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn concurrent_registrations_conflict_at_commit() {
        let store = InMemoryUserStore::new();
        let mut first = store.begin().await.unwrap();
        let mut second = store.begin().await.unwrap();

        first.create(&user("race@example.com")).await.unwrap();
        second.create(&user("race@example.com")).await.unwrap();

        first.commit().await.unwrap();
        assert!(matches!(
            second.commit().await,
            Err(StoreError::Conflict(_))
        ));
        assert_eq!(store.len(), 1);
    }

    fn rename(fullname: &str) -> UserPatch {
        UserPatch {
            fullname: Some(fullname.to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn edits_require_existing_record() {
        let store = InMemoryUserStore::new();
        let mut uow = store.begin().await.unwrap();
        let ghost = Uuid::now_v7();
        assert!(matches!(
            uow.update_profile(ghost, &rename("Ghost")).await,
            Err(StoreError::NotFound)
        ));
        assert!(matches!(
            uow.set_password_hash(ghost, "$argon2id$other").await,
            Err(StoreError::NotFound)
        ));
    }

    #[tokio::test]
    async fn profile_update_is_visible_inside_and_after_commit() {
        let store = InMemoryUserStore::new();
        let alice = user("alice@example.com");

        let mut uow = store.begin().await.unwrap();
        uow.create(&alice).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        let projected = uow
            .update_profile(alice.id, &rename("Alice Updated"))
            .await
            .unwrap();
        assert_eq!(projected.fullname, "Alice Updated");
        assert_eq!(projected.password_hash, alice.password_hash);
        uow.commit().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        let stored = uow.get(alice.id).await.unwrap().unwrap();
        assert_eq!(stored.fullname, "Alice Updated");
        assert_eq!(stored.updated_at, projected.updated_at);
    }

    #[tokio::test]
    async fn overlapping_edits_to_different_columns_both_land() {
        let store = InMemoryUserStore::new();
        let alice = user("alice@example.com");
        let mut uow = store.begin().await.unwrap();
        uow.create(&alice).await.unwrap();
        uow.commit().await.unwrap();

        let mut profile = store.begin().await.unwrap();
        let mut password = store.begin().await.unwrap();
        profile.update_profile(alice.id, &rename("B")).await.unwrap();
        password
            .set_password_hash(alice.id, "$argon2id$rotated")
            .await
            .unwrap();

        password.commit().await.unwrap();
        profile.commit().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        let stored = uow.get(alice.id).await.unwrap().unwrap();
        assert_eq!(stored.fullname, "B");
        assert_eq!(stored.password_hash, "$argon2id$rotated");
    }

    #[tokio::test]
    async fn uncommitted_edits_are_discarded() {
        let store = InMemoryUserStore::new();
        let alice = user("alice@example.com");
        let mut uow = store.begin().await.unwrap();
        uow.create(&alice).await.unwrap();
        uow.commit().await.unwrap();

        {
            let mut uow = store.begin().await.unwrap();
            uow.set_role(alice.id, Role::Admin).await.unwrap();
        }

        let mut uow = store.begin().await.unwrap();
        let stored = uow.get(alice.id).await.unwrap().unwrap();
        assert_eq!(stored.role, Role::User);
    }
}
