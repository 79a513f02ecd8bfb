//! # Supplier Repository

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::{clean, new_id};
use tally_core::{Supplier, SupplierInput};

#[derive(Debug, sqlx::FromRow)]
struct SupplierRow {
    id: String,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<SupplierRow> for Supplier {
    fn from(row: SupplierRow) -> Self {
        Supplier {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SupplierRepository {
    pool: SqlitePool,
}

impl SupplierRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SupplierRepository { pool }
    }

    pub async fn list(&self) -> DbResult<Vec<Supplier>> {
        let rows: Vec<SupplierRow> = sqlx::query_as(
            "SELECT id, name, email, phone, address, created_at FROM suppliers ORDER BY name COLLATE NOCASE",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Supplier::from).collect())
    }

    pub async fn get(&self, id: &str) -> DbResult<Supplier> {
        let row: Option<SupplierRow> = sqlx::query_as(
            "SELECT id, name, email, phone, address, created_at FROM suppliers WHERE id = ?1",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Supplier::from)
            .ok_or_else(|| DbError::not_found("Supplier", id))
    }

    pub async fn create(&self, input: &SupplierInput) -> DbResult<Supplier> {
        input.validate()?;

        let id = new_id();
        debug!(id = %id, name = %input.name, "Inserting supplier");

        sqlx::query(
            "INSERT INTO suppliers (id, name, email, phone, address, created_at) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        )
        .bind(&id)
        .bind(input.name.trim())
        .bind(clean(input.email.as_deref()))
        .bind(clean(input.phone.as_deref()))
        .bind(input.address.as_deref())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        self.get(&id).await
    }

    pub async fn update(&self, id: &str, input: &SupplierInput) -> DbResult<Supplier> {
        input.validate()?;

        let result = sqlx::query(
            "UPDATE suppliers SET name = ?2, email = ?3, phone = ?4, address = ?5 WHERE id = ?1",
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(clean(input.email.as_deref()))
        .bind(clean(input.phone.as_deref()))
        .bind(input.address.as_deref())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }

        self.get(id).await
    }

    /// Deletes a supplier. Refused while purchases still reference it.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM suppliers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Supplier", id));
        }

        info!(id = %id, "Supplier deleted");
        Ok(())
    }
}
