use std::fmt;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, QueryBuilder, Transaction};
use uuid::Uuid;

use crate::database::ports::users::{UserStore, UserUnitOfWork};
use crate::domain::users::{Role, User, UserPatch};
use crate::error::StoreError;

const USER_COLUMNS: &str = "id, email, password_hash, role, fullname, \
     avatar_url, phone, position, created_at, updated_at";

/// PostgreSQL-backed implementation of the `UserStore` port.
#[derive(Clone, Debug)]
pub struct PostgresUserStore {
    pool: PgPool,
}

impl PostgresUserStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserStore for PostgresUserStore {
    async fn begin(&self) -> Result<Box<dyn UserUnitOfWork>, StoreError> {
        let tx = self.pool.begin().await?;
        Ok(Box::new(PostgresUserUnitOfWork { tx }))
    }
}

/// One database transaction. Rolled back by sqlx if dropped uncommitted.
pub struct PostgresUserUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

impl fmt::Debug for PostgresUserUnitOfWork {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresUserUnitOfWork").finish_non_exhaustive()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: Uuid,
    email: String,
    password_hash: String,
    role: String,
    fullname: String,
    avatar_url: Option<String>,
    phone: Option<String>,
    position: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = StoreError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let role = row
            .role
            .parse::<Role>()
            .map_err(|err| StoreError::UnknownRole(err.0))?;

        Ok(User {
            id: row.id,
            email: row.email,
            password_hash: row.password_hash,
            role,
            fullname: row.fullname,
            avatar_url: row.avatar_url,
            phone: row.phone,
            position: row.position,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

fn map_write_error(err: sqlx::Error) -> StoreError {
    if let Some(db_err) = err.as_database_error()
        && db_err.constraint() == Some("users_email_key")
    {
        return StoreError::Conflict("Email already registered".to_string());
    }
    StoreError::Database(err)
}

#[async_trait]
impl UserUnitOfWork for PostgresUserUnitOfWork {
    async fn get(&mut self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(id)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn get_by_email(
        &mut self,
        email: &str,
    ) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        sqlx::query_as::<_, UserRow>(&sql)
            .bind(email)
            .fetch_optional(&mut *self.tx)
            .await?
            .map(User::try_from)
            .transpose()
    }

    async fn create(&mut self, user: &User) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users ({USER_COLUMNS}) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10) \
             RETURNING {USER_COLUMNS}"
        );
        let row = sqlx::query_as::<_, UserRow>(&sql)
            .bind(user.id)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(user.role.as_str())
            .bind(&user.fullname)
            .bind(&user.avatar_url)
            .bind(&user.phone)
            .bind(&user.position)
            .bind(user.created_at)
            .bind(user.updated_at)
            .fetch_one(&mut *self.tx)
            .await
            .map_err(map_write_error)?;

        row.try_into()
    }

    async fn update_profile(
        &mut self,
        id: Uuid,
        patch: &UserPatch,
    ) -> Result<User, StoreError> {
        let mut query =
            QueryBuilder::<Postgres>::new("UPDATE users SET updated_at = ");
        query.push_bind(Utc::now());
        if let Some(fullname) = &patch.fullname {
            query.push(", fullname = ").push_bind(fullname.trim());
        }
        if let Some(avatar_url) = &patch.avatar_url {
            query.push(", avatar_url = ").push_bind(avatar_url.as_deref());
        }
        if let Some(phone) = &patch.phone {
            query.push(", phone = ").push_bind(phone.as_deref());
        }
        if let Some(position) = &patch.position {
            query.push(", position = ").push_bind(position.as_deref());
        }
        query.push(" WHERE id = ").push_bind(id);
        query.push(format!(" RETURNING {USER_COLUMNS}"));

        let row = query
            .build_query_as::<UserRow>()
            .fetch_optional(&mut *self.tx)
            .await
            .map_err(map_write_error)?
            .ok_or(StoreError::NotFound)?;

        row.try_into()
    }

    async fn set_password_hash(
        &mut self,
        id: Uuid,
        password_hash: &str,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users SET password_hash = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(password_hash)
        .bind(Utc::now())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn set_role(&mut self, id: Uuid, role: Role) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE users SET role = $2, updated_at = $3 WHERE id = $1",
        )
        .bind(id)
        .bind(role.as_str())
        .bind(Utc::now())
        .execute(&mut *self.tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    async fn commit(self: Box<Self>) -> Result<(), StoreError> {
        self.tx.commit().await?;
        Ok(())
    }
}

#[cfg(all(test, feature = "pg-tests"))]
mod tests {
    use super::*;

    fn user(email: &str) -> User {
        User::new(email, "$argon2id$stub".to_string(), "Pg", None, None, None)
    }

    #[sqlx::test(migrator = "crate::MIGRATOR")]
    async fn create_then_read_back(pool: PgPool) {
        let store = PostgresUserStore::new(pool);
        let alice = user("alice@example.com");

        let mut uow = store.begin().await.unwrap();
        let created = uow.create(&alice).await.unwrap();
        uow.commit().await.unwrap();
        assert_eq!(created.id, alice.id);

        let mut uow = store.begin().await.unwrap();
        let fetched = uow.get_by_email("alice@example.com").await.unwrap().unwrap();
        assert_eq!(fetched.id, alice.id);
        assert_eq!(fetched.role, Role::User);
    }

    #[sqlx::test(migrator = "crate::MIGRATOR")]
    async fn duplicate_email_is_a_conflict(pool: PgPool) {
        let store = PostgresUserStore::new(pool);

        let mut uow = store.begin().await.unwrap();
        uow.create(&user("dup@example.com")).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        assert!(matches!(
            uow.create(&user("dup@example.com")).await,
            Err(StoreError::Conflict(_))
        ));
    }

    #[sqlx::test(migrator = "crate::MIGRATOR")]
    async fn uncommitted_writes_roll_back(pool: PgPool) {
        let store = PostgresUserStore::new(pool);
        let ghost = user("ghost@example.com");
        {
            let mut uow = store.begin().await.unwrap();
            uow.create(&ghost).await.unwrap();
        }

        let mut uow = store.begin().await.unwrap();
        assert!(uow.get(ghost.id).await.unwrap().is_none());
    }

    #[sqlx::test(migrator = "crate::MIGRATOR")]
    async fn unknown_role_is_rejected_on_read(pool: PgPool) {
        sqlx::query("ALTER TABLE users DROP CONSTRAINT users_role_check")
            .execute(&pool)
            .await
            .unwrap();
        let store = PostgresUserStore::new(pool.clone());
        let odd = user("odd@example.com");
        let mut uow = store.begin().await.unwrap();
        uow.create(&odd).await.unwrap();
        uow.commit().await.unwrap();

        sqlx::query("UPDATE users SET role = 'owner' WHERE id = $1")
            .bind(odd.id)
            .execute(&pool)
            .await
            .unwrap();

        let mut uow = store.begin().await.unwrap();
        assert!(matches!(
            uow.get(odd.id).await,
            Err(StoreError::UnknownRole(role)) if role == "owner"
        ));
    }

    #[sqlx::test(migrator = "crate::MIGRATOR")]
    async fn profile_update_leaves_password_hash_alone(pool: PgPool) {
        let store = PostgresUserStore::new(pool);
        let alice = user("alice@example.com");
        let mut uow = store.begin().await.unwrap();
        uow.create(&alice).await.unwrap();
        uow.commit().await.unwrap();

        let mut uow = store.begin().await.unwrap();
        uow.set_password_hash(alice.id, "$argon2id$rotated")
            .await
            .unwrap();
        uow.commit().await.unwrap();

        let patch = UserPatch {
            fullname: Some("Renamed".to_string()),
            phone: Some(None),
            ..Default::default()
        };
        let mut uow = store.begin().await.unwrap();
        let updated = uow.update_profile(alice.id, &patch).await.unwrap();
        uow.commit().await.unwrap();

        assert_eq!(updated.fullname, "Renamed");
        assert_eq!(updated.phone, None);
        assert_eq!(updated.password_hash, "$argon2id$rotated");
        assert_eq!(updated.role, Role::User);
    }
}
