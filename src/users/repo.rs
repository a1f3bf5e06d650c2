use async_trait::async_trait;
use uuid::Uuid;

use crate::db::{unique_violation, PgStore, StoreError};
use crate::users::repo_types::{NewUser, User, UserChanges};

const USER_COLUMNS: &str = "id, email, password_hash, first_name, last_name, is_active, \
                            is_staff, is_superuser, date_joined, last_login";

#[async_trait]
pub trait UserRepo: Send + Sync {
    /// Insert a user. A taken email fails with [`StoreError::Duplicate`].
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, StoreError>;
    async fn record_login(&self, id: Uuid) -> Result<(), StoreError>;
    /// All users, oldest account first.
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;
}

#[async_trait]
impl UserRepo for PgStore {
    async fn insert_user(&self, user: NewUser) -> Result<User, StoreError> {
        let sql = format!(
            "INSERT INTO users (email, password_hash, first_name, last_name) \
             VALUES ($1, $2, $3, $4) RETURNING {USER_COLUMNS}"
        );
        sqlx::query_as::<_, User>(&sql)
            .bind(&user.email)
            .bind(&user.password_hash)
            .bind(&user.first_name)
            .bind(&user.last_name)
            .fetch_one(&self.pool)
            .await
            .map_err(unique_violation("user", "email"))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE email = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users WHERE id = $1");
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, StoreError> {
        let sql = format!(
            "UPDATE users SET \
                first_name    = COALESCE($2, first_name), \
                last_name     = COALESCE($3, last_name), \
                password_hash = COALESCE($4, password_hash), \
                is_active     = COALESCE($5, is_active), \
                is_staff      = COALESCE($6, is_staff), \
                is_superuser  = COALESCE($7, is_superuser) \
             WHERE id = $1 RETURNING {USER_COLUMNS}"
        );
        let user = sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .bind(changes.first_name)
            .bind(changes.last_name)
            .bind(changes.password_hash)
            .bind(changes.is_active)
            .bind(changes.is_staff)
            .bind(changes.is_superuser)
            .fetch_optional(&self.pool)
            .await?;
        Ok(user)
    }

    async fn record_login(&self, id: Uuid) -> Result<(), StoreError> {
        sqlx::query("UPDATE users SET last_login = now() WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let sql = format!("SELECT {USER_COLUMNS} FROM users ORDER BY date_joined ASC, id ASC");
        let users = sqlx::query_as::<_, User>(&sql).fetch_all(&self.pool).await?;
        Ok(users)
    }
}
