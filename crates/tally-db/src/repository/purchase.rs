//! # Purchase Repository
//!
//! Purchase invoices and their items. Creating a purchase is the only
//! place where stock goes up:
//!
//! ```text
//! BEGIN
//!   INSERT purchase_invoices
//!   for each item:
//!     INSERT purchase_items
//!     UPDATE products SET quantity = quantity + qty, cost_cents = unit_cost
//! COMMIT
//! ```
//!
//! The increment is relative so concurrent purchases of one product do not
//! lose updates. Deleting a purchase leaves stock as it is.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::{begin_write, new_id, product};
use tally_core::document::{
    document_number, PricedLine, PurchaseDraft, PurchaseHeaderDraft, SupplierSelection,
    SupplierSnapshot,
};
use tally_core::{DocumentTotals, Money, PurchaseInvoice, PurchaseItem, PurchaseStatus};

const PURCHASE_COLUMNS: &str = "id, invoice_number, supplier_id, supplier_name, status, \
                                subtotal_cents, total_cents, notes, created_at, updated_at";

/// Number prefix for manually created purchases.
pub const PURCHASE_PREFIX: &str = "PUR";

#[derive(Debug, sqlx::FromRow)]
struct PurchaseRow {
    id: String,
    invoice_number: String,
    supplier_id: Option<String>,
    supplier_name: String,
    status: PurchaseStatus,
    subtotal_cents: i64,
    total_cents: i64,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PurchaseRow {
    fn into_purchase(self, items: Vec<PurchaseItem>) -> PurchaseInvoice {
        PurchaseInvoice {
            id: self.id,
            invoice_number: self.invoice_number,
            supplier: SupplierSnapshot {
                id: self.supplier_id,
                name: self.supplier_name,
            },
            status: self.status,
            subtotal: Money::from_cents(self.subtotal_cents),
            total: Money::from_cents(self.total_cents),
            notes: self.notes,
            items,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct ItemRow {
    id: String,
    purchase_invoice_id: String,
    product_id: Option<String>,
    product_name: String,
    quantity: i64,
    unit_cost_cents: i64,
    total_cents: i64,
}

impl From<ItemRow> for PurchaseItem {
    fn from(row: ItemRow) -> Self {
        PurchaseItem {
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            unit_cost: Money::from_cents(row.unit_cost_cents),
            total: Money::from_cents(row.total_cents),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PurchaseRepository {
    pool: SqlitePool,
}

impl PurchaseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        PurchaseRepository { pool }
    }

    /// Lists purchases with their items, newest first.
    pub async fn list(&self) -> DbResult<Vec<PurchaseInvoice>> {
        let mut conn = self.pool.acquire().await?;

        let rows: Vec<PurchaseRow> = sqlx::query_as(&format!(
            "SELECT {PURCHASE_COLUMNS} FROM purchase_invoices ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&mut *conn)
        .await?;

        let mut items = load_items(&mut conn, None).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let lines = items.remove(&row.id).unwrap_or_default();
                row.into_purchase(lines)
            })
            .collect())
    }

    pub async fn get(&self, id: &str) -> DbResult<PurchaseInvoice> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Records a purchase and receives its items into stock atomically.
    pub async fn create(&self, draft: PurchaseDraft) -> DbResult<PurchaseInvoice> {
        let mut tx = begin_write(&self.pool).await?;
        let id = insert_purchase(&mut tx, draft, PURCHASE_PREFIX, Utc::now()).await?;
        let purchase = fetch(&mut tx, &id).await?;
        tx.commit().await?;
        Ok(purchase)
    }

    /// Updates supplier, status and notes. Items and stock stay as created.
    pub async fn update_header(
        &self,
        id: &str,
        draft: PurchaseHeaderDraft,
    ) -> DbResult<PurchaseInvoice> {
        let mut tx = begin_write(&self.pool).await?;
        let existing = fetch(&mut tx, id).await?;

        let supplier = match draft.supplier {
            Some(selection) => snapshot_supplier(&mut tx, selection).await?,
            None => existing.supplier,
        };

        sqlx::query(
            r#"
            UPDATE purchase_invoices SET
                supplier_id = ?2, supplier_name = ?3, status = ?4, notes = ?5, updated_at = ?6
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&supplier.id)
        .bind(&supplier.name)
        .bind(draft.status.unwrap_or(existing.status))
        .bind(draft.notes.or(existing.notes))
        .bind(Utc::now())
        .execute(&mut *tx)
        .await?;

        let purchase = fetch(&mut tx, id).await?;
        tx.commit().await?;

        info!(id = %id, status = ?purchase.status, "Purchase updated");
        Ok(purchase)
    }

    /// Deletes a purchase and its items. Stock received at creation stays.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM purchase_invoices WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("PurchaseInvoice", id));
        }

        info!(id = %id, "Purchase deleted");
        Ok(())
    }
}

// =============================================================================
// Connection-level helpers
// =============================================================================

/// Inserts one purchase with its items and receives stock, on `conn`.
///
/// Shared by manual creation and CSV import; the caller owns the
/// transaction. `prefix` names the number used when the draft has none.
pub(crate) async fn insert_purchase(
    conn: &mut SqliteConnection,
    draft: PurchaseDraft,
    prefix: &str,
    now: DateTime<Utc>,
) -> DbResult<String> {
    let supplier = snapshot_supplier(conn, draft.supplier).await?;
    let lines = product::snapshot_lines(conn, draft.lines, true).await?;
    let totals = DocumentTotals::for_purchase(&lines)?;

    let id = new_id();
    let number = draft
        .invoice_number
        .unwrap_or_else(|| document_number(prefix, now));

    sqlx::query(&format!(
        "INSERT INTO purchase_invoices ({PURCHASE_COLUMNS}) \
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?9)"
    ))
    .bind(&id)
    .bind(&number)
    .bind(&supplier.id)
    .bind(&supplier.name)
    .bind(draft.status)
    .bind(totals.subtotal.cents())
    .bind(totals.total.cents())
    .bind(draft.notes.as_deref())
    .bind(now)
    .execute(&mut *conn)
    .await?;

    for (position, line) in lines.iter().enumerate() {
        insert_item(conn, &id, line, position).await?;

        if let Some(product_id) = line.product_id.as_deref() {
            debug!(product_id = %product_id, quantity = line.quantity, "Receiving stock");
            product::receive_stock(conn, product_id, line.quantity, line.unit_price, now).await?;
        }
    }

    info!(
        id = %id,
        number = %number,
        supplier = %supplier.name,
        total = %totals.total,
        items = lines.len(),
        "Purchase recorded"
    );
    Ok(id)
}

async fn insert_item(
    conn: &mut SqliteConnection,
    purchase_id: &str,
    line: &PricedLine,
    position: usize,
) -> DbResult<()> {
    sqlx::query(
        r#"
        INSERT INTO purchase_items (
            id, purchase_invoice_id, product_id, product_name, quantity,
            unit_cost_cents, total_cents, position
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
        "#,
    )
    .bind(new_id())
    .bind(purchase_id)
    .bind(line.product_id.as_deref())
    .bind(&line.product_name)
    .bind(line.quantity)
    .bind(line.unit_price.cents())
    .bind(line.total()?.cents())
    .bind(position as i64)
    .execute(&mut *conn)
    .await?;
    Ok(())
}

async fn snapshot_supplier(
    conn: &mut SqliteConnection,
    selection: SupplierSelection,
) -> DbResult<SupplierSnapshot> {
    match selection {
        SupplierSelection::Inline(snapshot) => Ok(snapshot),
        SupplierSelection::Live(id) => {
            let name = sqlx::query_scalar::<_, String>("SELECT name FROM suppliers WHERE id = ?1")
                .bind(&id)
                .fetch_optional(&mut *conn)
                .await?
                .ok_or_else(|| DbError::not_found("Supplier", &id))?;
            Ok(SupplierSnapshot { id: Some(id), name })
        }
    }
}

async fn load_items(
    conn: &mut SqliteConnection,
    purchase_id: Option<&str>,
) -> DbResult<HashMap<String, Vec<PurchaseItem>>> {
    let rows: Vec<ItemRow> = sqlx::query_as(
        r#"
        SELECT id, purchase_invoice_id, product_id, product_name, quantity,
               unit_cost_cents, total_cents
        FROM purchase_items
        WHERE (?1 IS NULL OR purchase_invoice_id = ?1)
        ORDER BY purchase_invoice_id, position
        "#,
    )
    .bind(purchase_id)
    .fetch_all(&mut *conn)
    .await?;

    let mut grouped: HashMap<String, Vec<PurchaseItem>> = HashMap::new();
    for row in rows {
        grouped
            .entry(row.purchase_invoice_id.clone())
            .or_default()
            .push(row.into());
    }
    Ok(grouped)
}

async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<PurchaseInvoice> {
    let row: Option<PurchaseRow> = sqlx::query_as(&format!(
        "SELECT {PURCHASE_COLUMNS} FROM purchase_invoices WHERE id = ?1"
    ))
    .bind(id)
    .fetch_optional(&mut *conn)
    .await?;

    let row = row.ok_or_else(|| DbError::not_found("PurchaseInvoice", id))?;
    let mut items = load_items(conn, Some(id)).await?;
    let lines = items.remove(id).unwrap_or_default();
    Ok(row.into_purchase(lines))
}

// =============================================================================
// Unit Tests
// =============================================================================
