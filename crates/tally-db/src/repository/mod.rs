//! # Repository Module
//!
//! One repository per aggregate. Each wraps a clone of the pool and owns
//! every SQL statement for its tables.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  axum handler                                                           │
//! │       │  db.invoices().create(draft)                                   │
//! │       ▼                                                                 │
//! │  InvoiceRepository                                                     │
//! │  ├── begin_write(&pool)          ← one atomic unit (BEGIN IMMEDIATE)   │
//! │  ├── helpers(&mut *tx, ..)       ← share the same connection           │
//! │  └── tx.commit()                 ← dropped tx rolls back               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite                                                                 │
//! │                                                                         │
//! │  Rows are read into private `*Row` structs (sqlx::FromRow) and         │
//! │  converted into tally-core types at the boundary.                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Catalogue and stock
//! - [`CustomerRepository`](customer::CustomerRepository) - Customers with aggregates
//! - [`SupplierRepository`](supplier::SupplierRepository) - Suppliers
//! - [`ExpenseRepository`](expense::ExpenseRepository) - Expenses and categories
//! - [`InvoiceRepository`](invoice::InvoiceRepository) - Invoices, quotations, pay/convert
//! - [`PurchaseRepository`](purchase::PurchaseRepository) - Purchases with stock increments
//! - [`UserRepository`](user::UserRepository) - Users and credential lookup
//! - [`RoleRepository`](role::RoleRepository) - Roles and the permission catalogue
//! - [`ImportRepository`](import::ImportRepository) - All-or-nothing CSV commits
//! - [`BackupRepository`](backup::BackupRepository) - Snapshot export and restore

pub mod backup;
pub mod customer;
pub mod expense;
pub mod import;
pub mod invoice;
pub mod product;
pub mod purchase;
pub mod role;
pub mod supplier;
pub mod user;

use sqlx::{Sqlite, SqlitePool, Transaction};
use uuid::Uuid;

use crate::error::DbResult;

/// Opening statement of every write unit. A deferred unit that reads
/// before writing gets SQLITE_BUSY on upgrade without waiting on
/// `busy_timeout`; taking the write lock at BEGIN does wait.
pub(crate) const BEGIN_WRITE: &str = "BEGIN IMMEDIATE";

/// Starts a write transaction on a pooled connection.
pub(crate) async fn begin_write(pool: &SqlitePool) -> DbResult<Transaction<'static, Sqlite>> {
    Ok(pool.begin_with(BEGIN_WRITE).await?)
}

/// Generates a new row id.
pub(crate) fn new_id() -> String {
    Uuid::new_v4().to_string()
}

/// Trims a string and maps blank to `None`.
pub(crate) fn clean(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

#[cfg(test)]
pub(crate) mod test_support {
    use crate::{Database, DbConfig};

    /// Fresh migrated in-memory database.
    pub async fn database() -> Database {
        Database::new(DbConfig::in_memory())
            .await
            .expect("in-memory database")
    }
}
