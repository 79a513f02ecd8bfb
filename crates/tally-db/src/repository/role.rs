//! # Role Repository
//!
//! Roles, the permission catalogue, and the join between them.
//!
//! ```text
//! roles ──< role_permissions >── permissions
//!   │
//!   └──< users (role_id, SET NULL on role delete)
//! ```
//!
//! A role's permission set is always replaced as a whole, inside the same
//! transaction as the role row itself.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::{begin_write, clean, new_id};
use tally_core::access::{Permission, Role, RoleInput};
use tally_core::{PermissionSet, ValidationError};

#[derive(Debug, sqlx::FromRow)]
struct RoleRow {
    id: String,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl RoleRow {
    fn into_role(self, permissions: Vec<String>) -> Role {
        Role {
            id: self.id,
            name: self.name,
            description: self.description,
            permissions,
            created_at: self.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct PermissionRow {
    id: String,
    code: String,
    description: Option<String>,
    module: Option<String>,
}

impl From<PermissionRow> for Permission {
    fn from(row: PermissionRow) -> Self {
        Permission {
            id: row.id,
            code: row.code,
            description: row.description,
            module: row.module,
        }
    }
}

#[derive(Debug, Clone)]
pub struct RoleRepository {
    pool: SqlitePool,
}

impl RoleRepository {
    pub fn new(pool: SqlitePool) -> Self {
        RoleRepository { pool }
    }

    /// The permission catalogue, grouped by module.
    pub async fn list_permissions(&self) -> DbResult<Vec<Permission>> {
        let rows: Vec<PermissionRow> = sqlx::query_as(
            "SELECT id, code, description, module FROM permissions ORDER BY module, code",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Permission::from).collect())
    }

    /// Lists roles with their permission codes.
    pub async fn list(&self) -> DbResult<Vec<Role>> {
        let mut conn = self.pool.acquire().await?;

        let rows: Vec<RoleRow> = sqlx::query_as(
            "SELECT id, name, description, created_at FROM roles ORDER BY name COLLATE NOCASE",
        )
        .fetch_all(&mut *conn)
        .await?;

        let pairs: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT rp.role_id, p.code
            FROM role_permissions rp
            JOIN permissions p ON p.id = rp.permission_id
            ORDER BY p.code
            "#,
        )
        .fetch_all(&mut *conn)
        .await?;

        let mut codes: HashMap<String, Vec<String>> = HashMap::new();
        for (role_id, code) in pairs {
            codes.entry(role_id).or_default().push(code);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let permissions = codes.remove(&row.id).unwrap_or_default();
                row.into_role(permissions)
            })
            .collect())
    }

    pub async fn get(&self, id: &str) -> DbResult<Role> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Creates a role with its permission set.
    pub async fn create(&self, input: &RoleInput) -> DbResult<Role> {
        input.validate()?;

        let id = new_id();
        let mut tx = begin_write(&self.pool).await?;

        sqlx::query("INSERT INTO roles (id, name, description, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&id)
            .bind(input.name.trim())
            .bind(clean(input.description.as_deref()))
            .bind(Utc::now())
            .execute(&mut *tx)
            .await?;

        replace_permissions(&mut tx, &id, &input.unique_permissions()).await?;
        let role = fetch(&mut tx, &id).await?;
        tx.commit().await?;

        info!(id = %id, name = %role.name, permissions = role.permissions.len(), "Role created");
        Ok(role)
    }

    /// Replaces name, description and the full permission set.
    pub async fn update(&self, id: &str, input: &RoleInput) -> DbResult<Role> {
        input.validate()?;

        let mut tx = begin_write(&self.pool).await?;

        let result = sqlx::query("UPDATE roles SET name = ?2, description = ?3 WHERE id = ?1")
            .bind(id)
            .bind(input.name.trim())
            .bind(clean(input.description.as_deref()))
            .execute(&mut *tx)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Role", id));
        }

        replace_permissions(&mut tx, id, &input.unique_permissions()).await?;
        let role = fetch(&mut tx, id).await?;
        tx.commit().await?;

        info!(id = %id, name = %role.name, permissions = role.permissions.len(), "Role updated");
        Ok(role)
    }

    /// Deletes a role. Users holding it are left without a role.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM roles WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Role", id));
        }

        info!(id = %id, "Role deleted");
        Ok(())
    }

    pub async fn find_by_name(&self, name: &str) -> DbResult<Option<Role>> {
        let mut conn = self.pool.acquire().await?;

        let id: Option<String> = sqlx::query_scalar("SELECT id FROM roles WHERE name = ?1")
            .bind(name)
            .fetch_optional(&mut *conn)
            .await?;

        match id {
            Some(id) => Ok(Some(fetch(&mut conn, &id).await?)),
            None => Ok(None),
        }
    }

    /// Effective permissions of a role; no role means no permissions.
    pub async fn resolve(&self, role_id: Option<&str>) -> DbResult<PermissionSet> {
        let mut conn = self.pool.acquire().await?;
        resolve_permissions(&mut conn, role_id).await
    }
}

// =============================================================================
// Connection-level helpers
// =============================================================================

async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Role> {
    let row: Option<RoleRow> =
        sqlx::query_as("SELECT id, name, description, created_at FROM roles WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    let row = row.ok_or_else(|| DbError::not_found("Role", id))?;
    let codes = permission_codes(conn, id).await?;
    Ok(row.into_role(codes))
}

async fn permission_codes(conn: &mut SqliteConnection, role_id: &str) -> DbResult<Vec<String>> {
    let codes = sqlx::query_scalar::<_, String>(
        r#"
        SELECT p.code
        FROM role_permissions rp
        JOIN permissions p ON p.id = rp.permission_id
        WHERE rp.role_id = ?1
        ORDER BY p.code
        "#,
    )
    .bind(role_id)
    .fetch_all(&mut *conn)
    .await?;

    Ok(codes)
}

/// Resolves a role id into the set embedded in session tokens.
///
/// A role named `Admin` resolves to the wildcard whatever its join rows say.
pub(crate) async fn resolve_permissions(
    conn: &mut SqliteConnection,
    role_id: Option<&str>,
) -> DbResult<PermissionSet> {
    let Some(role_id) = role_id else {
        return Ok(PermissionSet::none());
    };

    let name: Option<String> = sqlx::query_scalar("SELECT name FROM roles WHERE id = ?1")
        .bind(role_id)
        .fetch_optional(&mut *conn)
        .await?;

    let codes = match name.as_deref() {
        Some(_) => permission_codes(conn, role_id).await?,
        None => Vec::new(),
    };

    Ok(PermissionSet::for_role(name.as_deref(), codes))
}

async fn replace_permissions(
    conn: &mut SqliteConnection,
    role_id: &str,
    codes: &[String],
) -> DbResult<()> {
    sqlx::query("DELETE FROM role_permissions WHERE role_id = ?1")
        .bind(role_id)
        .execute(&mut *conn)
        .await?;

    for code in codes {
        let permission_id: String =
            sqlx::query_scalar::<_, String>("SELECT id FROM permissions WHERE code = ?1")
                .bind(code)
                .fetch_optional(&mut *conn)
                .await?
                .ok_or_else(|| ValidationError::InvalidFormat {
                    field: "permissions".to_string(),
                    reason: format!("unknown permission code '{code}'"),
                })?;

        sqlx::query("INSERT INTO role_permissions (role_id, permission_id) VALUES (?1, ?2)")
            .bind(role_id)
            .bind(&permission_id)
            .execute(&mut *conn)
            .await?;
    }

    debug!(role_id = %role_id, count = codes.len(), "Role permissions replaced");
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::database;
    use tally_core::CoreError;

    fn clerk(permissions: &[&str]) -> RoleInput {
        RoleInput {
            name: "Clerk".to_string(),
            description: Some("Front desk".to_string()),
            permissions: permissions.iter().map(|p| p.to_string()).collect(),
        }
    }

    #[tokio::test]
    async fn test_seeded_catalogue_and_admin() {
        let db = database().await;
        let repo = db.roles();

        let codes: Vec<String> = repo
            .list_permissions()
            .await
            .unwrap()
            .into_iter()
            .map(|p| p.code)
            .collect();
        assert!(codes.contains(&"system.restore".to_string()));
        assert!(codes.contains(&"sales.create".to_string()));

        let admin = repo.find_by_name("Admin").await.unwrap().unwrap();
        assert_eq!(repo.resolve(Some(&admin.id)).await.unwrap(), PermissionSet::All);
        assert_eq!(repo.resolve(None).await.unwrap(), PermissionSet::none());
    }

    #[tokio::test]
    async fn test_create_and_replace_permissions() {
        let db = database().await;
        let repo = db.roles();

        let role = repo
            .create(&clerk(&["products.view", "sales.create", "products.view"]))
            .await
            .unwrap();
        assert_eq!(role.permissions, vec!["products.view", "sales.create"]);

        let updated = repo.update(&role.id, &clerk(&["customers.view"])).await.unwrap();
        assert_eq!(updated.permissions, vec!["customers.view"]);

        let resolved = repo.resolve(Some(&role.id)).await.unwrap();
        assert!(resolved.allows("customers.view"));
        assert!(!resolved.allows("products.view"));
    }

    #[tokio::test]
    async fn test_unknown_code_rolls_back() {
        let db = database().await;
        let repo = db.roles();
        let role = repo.create(&clerk(&["products.view"])).await.unwrap();

        let err = repo
            .update(&role.id, &clerk(&["products.view", "warp.drive"]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
        assert_eq!(repo.get(&role.id).await.unwrap().permissions, vec!["products.view"]);
    }

    #[tokio::test]
    async fn test_duplicate_name_is_unique_violation() {
        let db = database().await;
        let repo = db.roles();
        repo.create(&clerk(&[])).await.unwrap();
        assert!(matches!(
            repo.create(&clerk(&[])).await,
            Err(DbError::UniqueViolation { .. })
        ));
    }
}
