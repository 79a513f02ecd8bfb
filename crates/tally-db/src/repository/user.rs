//! # User Repository
//!
//! Back-office accounts. Password hashing happens in the server; this
//! repository only ever stores and returns the opaque hash, and never
//! puts it on a read model.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::{clean, new_id, role};
use tally_core::access::{NewUserInput, SessionUser, User, UserUpdateInput};
use tally_core::PermissionSet;

const USER_SELECT: &str = "SELECT u.id, u.username, u.full_name, u.role_id, r.name AS role_name, \
                           u.created_at FROM users u LEFT JOIN roles r ON r.id = u.role_id";

#[derive(Debug, sqlx::FromRow)]
struct UserRow {
    id: String,
    username: String,
    full_name: Option<String>,
    role_id: Option<String>,
    role_name: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<UserRow> for User {
    fn from(row: UserRow) -> Self {
        User {
            id: row.id,
            username: row.username,
            full_name: row.full_name,
            role_id: row.role_id,
            role_name: row.role_name,
            created_at: row.created_at,
        }
    }
}

/// Stored login material for one username.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct StoredCredentials {
    pub id: String,
    pub password_hash: String,
}

#[derive(Debug, Clone)]
pub struct UserRepository {
    pool: SqlitePool,
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        UserRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<User>> {
        let rows: Vec<UserRow> =
            sqlx::query_as(&format!("{USER_SELECT} ORDER BY u.username COLLATE NOCASE"))
                .fetch_all(&self.pool)
                .await?;

        Ok(rows.into_iter().map(User::from).collect())
    }

    pub async fn get(&self, id: &str) -> DbResult<User> {
        let row: Option<UserRow> = sqlx::query_as(&format!("{USER_SELECT} WHERE u.id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(User::from)
            .ok_or_else(|| DbError::not_found("User", id))
    }

    /// Creates a user. `password_hash` is the already-hashed password.
    pub async fn create(&self, input: &NewUserInput, password_hash: &str) -> DbResult<User> {
        input.validate()?;

        let role_id = clean(input.role_id.as_deref());
        if let Some(role_id) = role_id.as_deref() {
            self.ensure_role(role_id).await?;
        }

        let id = new_id();
        sqlx::query(
            r#"
            INSERT INTO users (id, username, password_hash, full_name, role_id, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6)
            "#,
        )
        .bind(&id)
        .bind(input.username.trim())
        .bind(password_hash)
        .bind(clean(input.full_name.as_deref()))
        .bind(&role_id)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        info!(id = %id, username = %input.username.trim(), role_id = ?role_id, "User created");
        self.get(&id).await
    }

    /// Applies a partial update.
    ///
    /// `role_id` of `Some("")` clears the role. `password_hash` replaces
    /// the stored hash when given.
    pub async fn update(
        &self,
        id: &str,
        input: &UserUpdateInput,
        password_hash: Option<&str>,
    ) -> DbResult<User> {
        input.validate()?;

        let existing = self.get(id).await?;

        let role_id = match input.role_id.as_deref() {
            None => existing.role_id,
            Some(value) => clean(Some(value)),
        };
        if let Some(role_id) = role_id.as_deref() {
            self.ensure_role(role_id).await?;
        }
        let full_name = match input.full_name.as_deref() {
            None => existing.full_name,
            Some(value) => clean(Some(value)),
        };

        sqlx::query(
            r#"
            UPDATE users SET
                full_name = ?2,
                role_id = ?3,
                password_hash = COALESCE(?4, password_hash)
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&full_name)
        .bind(&role_id)
        .bind(password_hash)
        .execute(&self.pool)
        .await?;

        debug!(id = %id, password_changed = password_hash.is_some(), "User updated");
        self.get(id).await
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM users WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("User", id));
        }

        info!(id = %id, "User deleted");
        Ok(())
    }

    /// Login material for an exact username, if such a user exists.
    pub async fn find_credentials(&self, username: &str) -> DbResult<Option<StoredCredentials>> {
        let found = sqlx::query_as::<_, StoredCredentials>(
            "SELECT id, password_hash FROM users WHERE username = ?1",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;

        Ok(found)
    }

    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await?;
        Ok(count)
    }

    /// The user as carried by a session, with permissions resolved from
    /// the store at call time.
    pub async fn session_user(&self, id: &str) -> DbResult<(SessionUser, PermissionSet)> {
        let user = self.get(id).await?;

        let mut conn = self.pool.acquire().await?;
        let permissions = role::resolve_permissions(&mut conn, user.role_id.as_deref()).await?;

        let session = SessionUser {
            id: user.id,
            username: user.username,
            full_name: user.full_name,
            role_id: user.role_id,
            permissions: permissions.to_claims(),
        };
        Ok((session, permissions))
    }

    async fn ensure_role(&self, role_id: &str) -> DbResult<()> {
        let exists: Option<i64> = sqlx::query_scalar("SELECT 1 FROM roles WHERE id = ?1")
            .bind(role_id)
            .fetch_optional(&self.pool)
            .await?;

        exists
            .map(|_| ())
            .ok_or_else(|| DbError::not_found("Role", role_id))
    }
}
