//! # Backup Repository
//!
//! Whole-database JSON snapshots.
//!
//! ## Snapshot Shape
//! ```text
//! {
//!   "products":       [ { "id": "...", "name": "...", "price_cents": 1000, ... }, ... ],
//!   "customers":      [ ... ],
//!   ...
//!   "users":          [ ... ]
//! }
//! ```
//! Keys are table names, rows are column → value maps exactly as stored.
//!
//! ## Restore
//! ```text
//! ┌──────────────────────────────────────────────────────────────────────┐
//! │  1. check every table and column name against the live schema        │
//! │  2. PRAGMA foreign_keys = OFF        (connection level, outside tx)  │
//! │  3. BEGIN                                                            │
//! │       for each table in the snapshot:                                │
//! │         DELETE FROM table                                            │
//! │         INSERT every row (columns from the first row's keys)         │
//! │     COMMIT                           (any failure: rollback)         │
//! │  4. PRAGMA foreign_keys = ON         (always, success or failure)    │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//! The pragma is a no-op inside a transaction, so it has to wrap it.
//! If it cannot be switched back on, the connection is closed instead of
//! being returned to the pool.

use std::collections::{BTreeMap, HashSet};

use serde_json::{Map, Number, Value};
use sqlx::sqlite::SqliteRow;
use sqlx::{Column, Connection, Row, SqliteConnection, SqlitePool, TypeInfo, ValueRef};
use tracing::{debug, error, info};

use crate::error::DbResult;
use crate::repository::BEGIN_WRITE;
use tally_core::ValidationError;

/// Tables carried by a snapshot, parents before children.
pub const BACKUP_TABLES: &[&str] = &[
    "products",
    "customers",
    "invoices",
    "invoice_items",
    "expense_categories",
    "expenses",
    "suppliers",
    "purchase_invoices",
    "purchase_items",
    "roles",
    "permissions",
    "role_permissions",
    "users",
];

/// One row as stored: column name → JSON value.
pub type SnapshotRow = Map<String, Value>;

/// A full snapshot, keyed by table name.
pub type Snapshot = BTreeMap<String, Vec<SnapshotRow>>;

/// What a restore replaced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RestoreSummary {
    pub tables: usize,
    pub rows: usize,
}

#[derive(Debug, Clone)]
pub struct BackupRepository {
    pool: SqlitePool,
}

impl BackupRepository {
    pub fn new(pool: SqlitePool) -> Self {
        BackupRepository { pool }
    }

    /// Reads every backup table in insertion order.
    pub async fn export(&self) -> DbResult<Snapshot> {
        let mut conn = self.pool.acquire().await?;
        let mut snapshot = Snapshot::new();

        for table in BACKUP_TABLES {
            let rows: Vec<SqliteRow> =
                sqlx::query(&format!("SELECT * FROM \"{table}\" ORDER BY rowid"))
                    .fetch_all(&mut *conn)
                    .await?;

            debug!(table = %table, rows = rows.len(), "Table exported");
            snapshot.insert(table.to_string(), rows.iter().map(row_to_json).collect());
        }

        let total: usize = snapshot.values().map(Vec::len).sum();
        info!(tables = snapshot.len(), rows = total, "Snapshot exported");
        Ok(snapshot)
    }

    /// Replaces the contents of every table present in `snapshot`.
    ///
    /// Tables absent from the snapshot are left alone; a table present
    /// with no rows is emptied.
    pub async fn restore(&self, snapshot: &Snapshot) -> DbResult<RestoreSummary> {
        let mut conn = self.pool.acquire().await?;
        validate(&mut conn, snapshot).await?;

        sqlx::query("PRAGMA foreign_keys = OFF")
            .execute(&mut *conn)
            .await?;

        let outcome = replace_all(&mut conn, snapshot).await;

        let reenabled = sqlx::query("PRAGMA foreign_keys = ON")
            .execute(&mut *conn)
            .await;
        if let Err(e) = &reenabled {
            error!(error = %e, "Could not re-enable foreign keys, discarding connection");
            conn.close_on_drop();
        }

        let summary = outcome?;
        reenabled?;

        info!(tables = summary.tables, rows = summary.rows, "Snapshot restored");
        Ok(summary)
    }
}

// =============================================================================
// Export helpers
// =============================================================================

/// Decodes a row by each value's storage class, not the declared type.
fn row_to_json(row: &SqliteRow) -> SnapshotRow {
    let mut map = Map::with_capacity(row.columns().len());
    for (idx, column) in row.columns().iter().enumerate() {
        map.insert(column.name().to_string(), cell_to_json(row, idx));
    }
    map
}

fn cell_to_json(row: &SqliteRow, idx: usize) -> Value {
    let storage = match row.try_get_raw(idx) {
        Ok(raw) if raw.is_null() => return Value::Null,
        Ok(raw) => raw.type_info().name().to_string(),
        Err(_) => return Value::Null,
    };

    match storage.as_str() {
        "INTEGER" => row
            .try_get_unchecked::<i64, _>(idx)
            .map(|v| Value::Number(Number::from(v)))
            .unwrap_or(Value::Null),
        "REAL" => row
            .try_get_unchecked::<f64, _>(idx)
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        "BLOB" => row
            .try_get_unchecked::<Vec<u8>, _>(idx)
            .map(|bytes| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
            .unwrap_or(Value::Null),
        _ => row
            .try_get_unchecked::<String, _>(idx)
            .map(Value::String)
            .unwrap_or(Value::Null),
    }
}

// =============================================================================
// Restore helpers
// =============================================================================

/// Rejects unknown tables and columns before anything is written.
async fn validate(conn: &mut SqliteConnection, snapshot: &Snapshot) -> DbResult<()> {
    for (table, rows) in snapshot {
        if !BACKUP_TABLES.contains(&table.as_str()) {
            return Err(ValidationError::NotAllowed {
                field: format!("backup table '{table}'"),
                allowed: BACKUP_TABLES.iter().map(|t| t.to_string()).collect(),
            }
            .into());
        }

        let Some(first) = rows.first() else {
            continue;
        };

        let known: HashSet<String> =
            sqlx::query_scalar::<_, String>("SELECT name FROM pragma_table_info(?1)")
                .bind(table)
                .fetch_all(&mut *conn)
                .await?
                .into_iter()
                .collect();

        if let Some(column) = first.keys().find(|c| !known.contains(c.as_str())) {
            return Err(ValidationError::InvalidFormat {
                field: table.clone(),
                reason: format!("unknown column '{column}'"),
            }
            .into());
        }
    }
    Ok(())
}

async fn replace_all(conn: &mut SqliteConnection, snapshot: &Snapshot) -> DbResult<RestoreSummary> {
    let mut tx = conn.begin_with(BEGIN_WRITE).await?;
    let mut summary = RestoreSummary { tables: 0, rows: 0 };

    for table in BACKUP_TABLES {
        let Some(rows) = snapshot.get(*table) else {
            continue;
        };

        let deleted = sqlx::query(&format!("DELETE FROM \"{table}\""))
            .execute(&mut *tx)
            .await?
            .rows_affected();

        if let Some(first) = rows.first() {
            let columns: Vec<&String> = first.keys().collect();
            let sql = insert_sql(table, &columns);

            for row in rows {
                let mut query = sqlx::query(&sql);
                for column in &columns {
                    query = match row.get(column.as_str()).unwrap_or(&Value::Null) {
                        Value::Null => query.bind(None::<String>),
                        Value::Bool(b) => query.bind(*b),
                        Value::Number(n) => match n.as_i64() {
                            Some(i) => query.bind(i),
                            None => query.bind(n.as_f64()),
                        },
                        Value::String(s) => query.bind(s.clone()),
                        other => query.bind(other.to_string()),
                    };
                }
                query.execute(&mut *tx).await?;
            }
        }

        debug!(table = %table, deleted, inserted = rows.len(), "Table restored");
        summary.tables += 1;
        summary.rows += rows.len();
    }

    tx.commit().await?;
    Ok(summary)
}

fn insert_sql(table: &str, columns: &[&String]) -> String {
    let names = columns
        .iter()
        .map(|c| format!("\"{c}\""))
        .collect::<Vec<_>>()
        .join(", ");
    let params = (1..=columns.len())
        .map(|i| format!("?{i}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("INSERT INTO \"{table}\" ({names}) VALUES ({params})")
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::test_support::database;
    use tally_core::document::InvoiceInput;
    use tally_core::{CoreError, CustomerInput, ProductInput};

    async fn populate(db: &crate::Database) {
        let customer = db
            .customers()
            .create(&CustomerInput {
                name: "Jane".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let product = db
            .products()
            .create(&ProductInput {
                name: "Widget".to_string(),
                price: Some(tally_core::Money::from_cents(1250)),
                quantity: Some(4),
                ..Default::default()
            })
            .await
            .unwrap();
        let draft = serde_json::from_value::<InvoiceInput>(serde_json::json!({
            "customer": {"id": customer.id},
            "discountType": "percentage",
            "discountValue": 12.5,
            "items": [{"productId": product.id, "quantity": 2}]
        }))
        .unwrap()
        .into_draft()
        .unwrap();
        db.invoices().create(draft).await.unwrap();
    }

    #[tokio::test]
    async fn test_export_covers_every_table() {
        let db = database().await;
        populate(&db).await;

        let snapshot = db.backups().export().await.unwrap();
        assert_eq!(snapshot.len(), BACKUP_TABLES.len());
        assert_eq!(snapshot["products"].len(), 1);
        assert_eq!(snapshot["products"][0]["price_cents"], 1250);
        assert_eq!(snapshot["invoices"][0]["discount_value"], 12.5);
        assert_eq!(snapshot["invoice_items"].len(), 1);
        assert!(!snapshot["permissions"].is_empty());
    }

    #[tokio::test]
    async fn test_round_trip_is_identical() {
        let db = database().await;
        populate(&db).await;

        let before = db.backups().export().await.unwrap();
        db.backups().restore(&before).await.unwrap();
        let after = db.backups().export().await.unwrap();

        assert_eq!(before, after);
    }

    #[tokio::test]
    async fn test_empty_table_clears_only_that_table() {
        let db = database().await;
        populate(&db).await;

        let mut snapshot = Snapshot::new();
        snapshot.insert("products".to_string(), Vec::new());
        let summary = db.backups().restore(&snapshot).await.unwrap();

        assert_eq!(summary, RestoreSummary { tables: 1, rows: 0 });
        assert_eq!(db.products().count().await.unwrap(), 0);
        assert_eq!(db.customers().list().await.unwrap().len(), 1);

        // Foreign keys are enforced again once the restore is done.
        let customer = &db.customers().list().await.unwrap()[0].customer;
        assert!(matches!(
            db.customers().delete(&customer.id).await,
            Err(DbError::ForeignKeyViolation { .. })
        ));
    }

    #[tokio::test]
    async fn test_unknown_names_rejected_before_writing() {
        let db = database().await;
        populate(&db).await;

        let mut snapshot = Snapshot::new();
        snapshot.insert("products".to_string(), Vec::new());
        snapshot.insert("sqlite_master".to_string(), Vec::new());
        let err = db.backups().restore(&snapshot).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::Validation(_))));
        assert_eq!(db.products().count().await.unwrap(), 1);

        let mut row = SnapshotRow::new();
        row.insert("id".to_string(), Value::String("p9".to_string()));
        row.insert("colour".to_string(), Value::String("red".to_string()));
        let mut snapshot = Snapshot::new();
        snapshot.insert("products".to_string(), vec![row]);
        assert!(db.backups().restore(&snapshot).await.is_err());
        assert_eq!(db.products().count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_failed_insert_rolls_back_deletes() {
        let db = database().await;
        populate(&db).await;

        let mut row = SnapshotRow::new();
        row.insert("id".to_string(), Value::String("p9".to_string()));
        let mut snapshot = Snapshot::new();
        // name is NOT NULL: the delete already ran when this insert fails
        snapshot.insert("products".to_string(), vec![row]);

        assert!(db.backups().restore(&snapshot).await.is_err());
        assert_eq!(db.products().count().await.unwrap(), 1);
    }
}
