//! # Invoice Repository
//!
//! Sales documents: invoices and quotations, their items, and the two
//! state transitions (quotation → invoice, unpaid → paid).
//!
//! ## Atomic Units
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  create    BEGIN                                                        │
//! │            ├── customer snapshot  (live row or inline fields)           │
//! │            ├── line snapshots     (live product name / price)           │
//! │            ├── DocumentTotals::compute                                  │
//! │            ├── INSERT invoices                                          │
//! │            └── INSERT invoice_items × n                                 │
//! │            COMMIT                                                       │
//! │                                                                         │
//! │  update    BEGIN ─ same as create, UPDATE header,                       │
//! │                    DELETE + re-INSERT every item ─ COMMIT               │
//! │                                                                         │
//! │  pay       BEGIN ─ check state ─ stock − qty per item ─ status=paid     │
//! │            COMMIT (any shortfall rolls everything back)                 │
//! │                                                                         │
//! │  convert   BEGIN ─ check quotation ─ type, status, new number ─ COMMIT  │
//! │                                                                         │
//! │  A Transaction dropped before commit rolls back and returns its         │
//! │  connection to the pool.                                                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Create and update never touch stock. Sales move stock only through
//! [`InvoiceRepository::pay`].

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::{begin_write, new_id, product};
use tally_core::document::{
    document_number, invoice_prefix, CustomerSelection, CustomerSnapshot, InvoiceDraft, PricedLine,
};
use tally_core::{
    CoreError, DiscountType, DocumentTotals, Invoice, InvoiceItem, InvoiceStatus, InvoiceType, Money,
};

const INVOICE_COLUMNS: &str = "id, invoice_number, type, status, customer_id, customer_name, \
                               customer_email, customer_phone, subtotal_cents, discount_type, \
                               discount_value, discount_cents, tax_cents, total_cents, notes, \
                               created_at, updated_at";

// =============================================================================
// Rows
// =============================================================================

#[derive(Debug, sqlx::FromRow)]
struct InvoiceRow {
    id: String,
    invoice_number: String,
    #[sqlx(rename = "type")]
    kind: InvoiceType,
    status: InvoiceStatus,
    customer_id: Option<String>,
    customer_name: String,
    customer_email: Option<String>,
    customer_phone: Option<String>,
    subtotal_cents: i64,
    discount_type: DiscountType,
    discount_value: f64,
    discount_cents: i64,
    tax_cents: i64,
    total_cents: i64,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl InvoiceRow {
    fn into_invoice(self, items: Vec<InvoiceItem>) -> Invoice {
        Invoice {
            id: self.id,
            invoice_number: self.invoice_number,
            kind: self.kind,
            status: self.status,
            customer: CustomerSnapshot {
                id: self.customer_id,
                name: self.customer_name,
                email: self.customer_email,
                phone: self.customer_phone,
            },
            subtotal: Money::from_cents(self.subtotal_cents),
            discount_type: self.discount_type,
            discount_value: self.discount_value,
            discount: Money::from_cents(self.discount_cents),
            tax: Money::from_cents(self.tax_cents),
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
    invoice_id: String,
    product_id: Option<String>,
    product_name: String,
    quantity: i64,
    unit_price_cents: i64,
    discount_cents: i64,
    total_cents: i64,
}

impl From<ItemRow> for InvoiceItem {
    fn from(row: ItemRow) -> Self {
        InvoiceItem {
            id: row.id,
            product_id: row.product_id,
            product_name: row.product_name,
            quantity: row.quantity,
            unit_price: Money::from_cents(row.unit_price_cents),
            discount: Money::from_cents(row.discount_cents),
            total: Money::from_cents(row.total_cents),
        }
    }
}

// =============================================================================
// Repository
// =============================================================================

#[derive(Debug, Clone)]
pub struct InvoiceRepository {
    pool: SqlitePool,
}

impl InvoiceRepository {
    pub fn new(pool: SqlitePool) -> Self {
        InvoiceRepository { pool }
    }

    /// Lists documents with their items, newest first, optionally of one type.
    pub async fn list(&self, kind: Option<InvoiceType>) -> DbResult<Vec<Invoice>> {
        let mut conn = self.pool.acquire().await?;

        let rows: Vec<InvoiceRow> = sqlx::query_as(&format!(
            "SELECT {INVOICE_COLUMNS} FROM invoices \
             WHERE (?1 IS NULL OR type = ?1) \
             ORDER BY created_at DESC, rowid DESC"
        ))
        .bind(kind)
        .fetch_all(&mut *conn)
        .await?;

        let items = load_items(&mut conn, ItemScope::All).await?;
        Ok(attach(rows, items))
    }

    pub async fn get(&self, id: &str) -> DbResult<Invoice> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Creates an invoice or quotation with its items in one atomic unit.
    ///
    /// Totals are derived from the lines; the number defaults to
    /// `INV-{millis}` or `QUO-{millis}`.
    pub async fn create(&self, draft: InvoiceDraft) -> DbResult<Invoice> {
        let now = Utc::now();
        let kind = draft.kind.unwrap_or_default();
        let status = draft.status.unwrap_or_default();
        let (discount_type, discount_value) = draft.discount_parts();

        let mut tx = begin_write(&self.pool).await?;

        let customer = snapshot_customer(&mut tx, draft.customer).await?;
        let lines = product::snapshot_lines(&mut tx, draft.lines, false).await?;
        let totals = DocumentTotals::compute(&lines, draft.discount, draft.tax)?;

        let id = new_id();
        let number = draft
            .invoice_number
            .unwrap_or_else(|| document_number(invoice_prefix(kind), now));

        sqlx::query(&format!(
            "INSERT INTO invoices ({INVOICE_COLUMNS}) \
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?16)"
        ))
        .bind(&id)
        .bind(&number)
        .bind(kind)
        .bind(status)
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(totals.subtotal.cents())
        .bind(discount_type)
        .bind(discount_value)
        .bind(totals.discount.cents())
        .bind(totals.tax.cents())
        .bind(totals.total.cents())
        .bind(draft.notes.as_deref())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        insert_items(&mut tx, &id, &lines).await?;
        let invoice = fetch(&mut tx, &id).await?;
        tx.commit().await?;

        info!(
            id = %id,
            number = %number,
            kind = ?kind,
            total = %totals.total,
            items = lines.len(),
            "Invoice created"
        );
        Ok(invoice)
    }

    /// Replaces header fields and every item of a document.
    ///
    /// The type may only change through [`InvoiceRepository::convert`];
    /// stock is never reconciled here, whatever the status becomes.
    pub async fn update(&self, id: &str, draft: InvoiceDraft) -> DbResult<Invoice> {
        let now = Utc::now();
        let (discount_type, discount_value) = draft.discount_parts();

        let mut tx = begin_write(&self.pool).await?;
        let existing = fetch(&mut tx, id).await?;

        if draft.kind.is_some_and(|k| k != existing.kind) {
            return Err(CoreError::InvalidDocumentState {
                id: id.to_string(),
                reason: "type can only change by converting a quotation".to_string(),
            }
            .into());
        }

        let customer = snapshot_customer(&mut tx, draft.customer).await?;
        let lines = product::snapshot_lines(&mut tx, draft.lines, false).await?;
        let totals = DocumentTotals::compute(&lines, draft.discount, draft.tax)?;

        sqlx::query(
            r#"
            UPDATE invoices SET
                invoice_number = ?2, status = ?3,
                customer_id = ?4, customer_name = ?5, customer_email = ?6, customer_phone = ?7,
                subtotal_cents = ?8, discount_type = ?9, discount_value = ?10,
                discount_cents = ?11, tax_cents = ?12, total_cents = ?13,
                notes = ?14, updated_at = ?15
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(draft.invoice_number.unwrap_or(existing.invoice_number))
        .bind(draft.status.unwrap_or(existing.status))
        .bind(&customer.id)
        .bind(&customer.name)
        .bind(&customer.email)
        .bind(&customer.phone)
        .bind(totals.subtotal.cents())
        .bind(discount_type)
        .bind(discount_value)
        .bind(totals.discount.cents())
        .bind(totals.tax.cents())
        .bind(totals.total.cents())
        .bind(draft.notes.as_deref())
        .bind(now)
        .execute(&mut *tx)
        .await?;

        sqlx::query("DELETE FROM invoice_items WHERE invoice_id = ?1")
            .bind(id)
            .execute(&mut *tx)
            .await?;
        insert_items(&mut tx, id, &lines).await?;

        let invoice = fetch(&mut tx, id).await?;
        tx.commit().await?;

        info!(id = %id, total = %totals.total, items = lines.len(), "Invoice updated");
        Ok(invoice)
    }

    /// Deletes a document; its items go with it.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM invoices WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Invoice", id));
        }

        info!(id = %id, "Invoice deleted");
        Ok(())
    }

    /// Marks an invoice paid and removes its items from stock.
    ///
    /// ## When This Fails
    /// - `InvalidDocumentState`: a quotation, or already paid / cancelled
    /// - `InsufficientStock`: `allow_negative_stock` is false and a line
    ///   wants more than is on hand
    ///
    /// Either way nothing is written.
    pub async fn pay(&self, id: &str, allow_negative_stock: bool) -> DbResult<Invoice> {
        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let invoice = fetch(&mut tx, id).await?;
        invoice.ensure_payable()?;

        for item in &invoice.items {
            if let Some(product_id) = item.product_id.as_deref() {
                debug!(product_id = %product_id, quantity = item.quantity, "Consuming stock");
                product::consume_stock(&mut tx, product_id, item.quantity, allow_negative_stock, now)
                    .await?;
            }
        }

        sqlx::query("UPDATE invoices SET status = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(InvoiceStatus::Paid)
            .bind(now)
            .execute(&mut *tx)
            .await?;

        let paid = fetch(&mut tx, id).await?;
        tx.commit().await?;

        info!(id = %id, number = %paid.invoice_number, "Invoice paid");
        Ok(paid)
    }

    /// Converts a quotation into a pending invoice with a fresh number.
    /// Same row, same items.
    pub async fn convert(&self, id: &str) -> DbResult<Invoice> {
        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        let quotation = fetch(&mut tx, id).await?;
        quotation.ensure_convertible()?;

        let number = document_number(invoice_prefix(InvoiceType::Invoice), now);
        sqlx::query(
            "UPDATE invoices SET type = ?2, status = ?3, invoice_number = ?4, updated_at = ?5 WHERE id = ?1",
        )
        .bind(id)
        .bind(InvoiceType::Invoice)
        .bind(InvoiceStatus::Pending)
        .bind(&number)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        let invoice = fetch(&mut tx, id).await?;
        tx.commit().await?;

        info!(
            id = %id,
            from = %quotation.invoice_number,
            to = %number,
            "Quotation converted"
        );
        Ok(invoice)
    }
}

// =============================================================================
// Connection-level helpers
// =============================================================================

enum ItemScope<'a> {
    All,
    Invoice(&'a str),
    Customer(&'a str),
}

async fn load_items(
    conn: &mut SqliteConnection,
    scope: ItemScope<'_>,
) -> DbResult<HashMap<String, Vec<InvoiceItem>>> {
    const SELECT: &str = "SELECT id, invoice_id, product_id, product_name, quantity, \
                          unit_price_cents, discount_cents, total_cents FROM invoice_items";

    let rows: Vec<ItemRow> = match scope {
        ItemScope::All => {
            sqlx::query_as(&format!("{SELECT} ORDER BY invoice_id, position"))
                .fetch_all(&mut *conn)
                .await?
        }
        ItemScope::Invoice(id) => {
            sqlx::query_as(&format!("{SELECT} WHERE invoice_id = ?1 ORDER BY position"))
                .bind(id)
                .fetch_all(&mut *conn)
                .await?
        }
        ItemScope::Customer(id) => {
            sqlx::query_as(&format!(
                "{SELECT} WHERE invoice_id IN (SELECT id FROM invoices WHERE customer_id = ?1) \
                 ORDER BY invoice_id, position"
            ))
            .bind(id)
            .fetch_all(&mut *conn)
            .await?
        }
    };

    let mut grouped: HashMap<String, Vec<InvoiceItem>> = HashMap::new();
    for row in rows {
        grouped
            .entry(row.invoice_id.clone())
            .or_default()
            .push(row.into());
    }
    Ok(grouped)
}

fn attach(rows: Vec<InvoiceRow>, mut items: HashMap<String, Vec<InvoiceItem>>) -> Vec<Invoice> {
    rows.into_iter()
        .map(|row| {
            let lines = items.remove(&row.id).unwrap_or_default();
            row.into_invoice(lines)
        })
        .collect()
}

async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Invoice> {
    let row: Option<InvoiceRow> =
        sqlx::query_as(&format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    let row = row.ok_or_else(|| DbError::not_found("Invoice", id))?;
    let mut items = load_items(conn, ItemScope::Invoice(id)).await?;
    let lines = items.remove(id).unwrap_or_default();
    Ok(row.into_invoice(lines))
}

/// A customer's invoices (type invoice only), newest first.
pub(crate) async fn list_for_customer(
    conn: &mut SqliteConnection,
    customer_id: &str,
) -> DbResult<Vec<Invoice>> {
    let rows: Vec<InvoiceRow> = sqlx::query_as(&format!(
        "SELECT {INVOICE_COLUMNS} FROM invoices \
         WHERE customer_id = ?1 AND type = 'invoice' \
         ORDER BY created_at DESC, rowid DESC"
    ))
    .bind(customer_id)
    .fetch_all(&mut *conn)
    .await?;

    let items = load_items(conn, ItemScope::Customer(customer_id)).await?;
    Ok(attach(rows, items))
}

/// Resolves the customer part of a document into a stored snapshot.
async fn snapshot_customer(
    conn: &mut SqliteConnection,
    selection: CustomerSelection,
) -> DbResult<CustomerSnapshot> {
    match selection {
        CustomerSelection::Inline(snapshot) => Ok(snapshot),
        CustomerSelection::Live(id) => {
            let row: Option<(String, Option<String>, Option<String>)> =
                sqlx::query_as("SELECT name, email, phone FROM customers WHERE id = ?1")
                    .bind(&id)
                    .fetch_optional(&mut *conn)
                    .await?;

            let (name, email, phone) = row.ok_or_else(|| DbError::not_found("Customer", &id))?;
            Ok(CustomerSnapshot {
                id: Some(id),
                name,
                email,
                phone,
            })
        }
    }
}

async fn insert_items(conn: &mut SqliteConnection, invoice_id: &str, lines: &[PricedLine]) -> DbResult<()> {
    for (position, line) in lines.iter().enumerate() {
        sqlx::query(
            r#"
            INSERT INTO invoice_items (
                id, invoice_id, product_id, product_name, quantity,
                unit_price_cents, discount_cents, total_cents, position
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(new_id())
        .bind(invoice_id)
        .bind(line.product_id.as_deref())
        .bind(&line.product_name)
        .bind(line.quantity)
        .bind(line.unit_price.cents())
        .bind(line.discount.cents())
        .bind(line.total()?.cents())
        .bind(position as i64)
        .execute(&mut *conn)
        .await?;
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::database;
    use tally_core::document::InvoiceInput;
    use tally_core::{CustomerInput, ProductInput};

    fn draft(json: serde_json::Value) -> InvoiceDraft {
        serde_json::from_value::<InvoiceInput>(json)
            .unwrap()
            .into_draft()
            .unwrap()
    }

    async fn widget(db: &crate::Database, quantity: i64) -> String {
        db.products()
            .create(&ProductInput {
                name: "Widget".to_string(),
                price: Some(Money::from_major(100)),
                cost_price: Some(Money::from_major(60)),
                quantity: Some(quantity),
                ..Default::default()
            })
            .await
            .unwrap()
            .id
    }

    #[tokio::test]
    async fn test_percentage_discount_scenario() {
        let db = database().await;
        let invoice = db
            .invoices()
            .create(draft(serde_json::json!({
                "customer": {"name": "Walk-in"},
                "discountType": "percentage",
                "discountValue": 10,
                "items": [
                    {"productName": "Desk", "unitPrice": 150},
                    {"productName": "Chair", "unitPrice": 50}
                ]
            })))
            .await
            .unwrap();

        assert_eq!(invoice.subtotal, Money::from_major(200));
        assert_eq!(invoice.discount, Money::from_major(20));
        assert_eq!(invoice.total, Money::from_major(180));
        assert_eq!(invoice.items.len(), 2);
        assert_eq!(invoice.items[0].product_name, "Desk");
        assert!(invoice.invoice_number.starts_with("INV-"));
        assert_eq!(invoice.status, InvoiceStatus::Draft);
    }

    #[tokio::test]
    async fn test_snapshots_are_independent_of_live_records() {
        let db = database().await;
        let product_id = widget(&db, 5).await;
        let customer = db
            .customers()
            .create(&CustomerInput {
                name: "Jane".to_string(),
                email: Some("jane@example.com".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();

        let invoice = db
            .invoices()
            .create(draft(serde_json::json!({
                "customer": {"id": customer.id},
                "items": [{"productId": product_id, "quantity": 2}]
            })))
            .await
            .unwrap();
        assert_eq!(invoice.customer.name, "Jane");
        assert_eq!(invoice.items[0].product_name, "Widget");
        assert_eq!(invoice.items[0].unit_price, Money::from_major(100));
        assert_eq!(invoice.total, Money::from_major(200));

        let renamed = CustomerInput {
            name: "Janet".to_string(),
            ..Default::default()
        };
        db.customers().update(&customer.id, &renamed).await.unwrap();

        let reread = db.invoices().get(&invoice.id).await.unwrap();
        assert_eq!(reread.customer.name, "Jane");
        assert_eq!(reread.customer.email.as_deref(), Some("jane@example.com"));
    }

    #[tokio::test]
    async fn test_unknown_product_rolls_back() {
        let db = database().await;
        let result = db
            .invoices()
            .create(draft(serde_json::json!({
                "items": [{"productName": "A", "unitPrice": 1}, {"productId": "missing"}]
            })))
            .await;

        assert!(matches!(result, Err(DbError::NotFound { .. })));
        assert!(db.invoices().list(None).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_update_replaces_items_and_keeps_type() {
        let db = database().await;
        let repo = db.invoices();
        let quotation = repo
            .create(draft(serde_json::json!({
                "type": "quotation",
                "items": [{"productName": "A", "unitPrice": 10}, {"productName": "B", "unitPrice": 5}]
            })))
            .await
            .unwrap();
        assert!(quotation.invoice_number.starts_with("QUO-"));

        let updated = repo
            .update(
                &quotation.id,
                draft(serde_json::json!({"items": [{"productName": "C", "unitPrice": 7, "quantity": 3}]})),
            )
            .await
            .unwrap();
        assert_eq!(updated.kind, InvoiceType::Quotation);
        assert_eq!(updated.invoice_number, quotation.invoice_number);
        assert_eq!(updated.items.len(), 1);
        assert_eq!(updated.total, Money::from_major(21));

        let err = repo
            .update(&quotation.id, draft(serde_json::json!({"type": "invoice", "items": []})))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InvalidDocumentState { .. })));
    }

    #[tokio::test]
    async fn test_convert_quotation() {
        let db = database().await;
        let repo = db.invoices();
        let quotation = repo
            .create(draft(serde_json::json!({
                "type": "quotation",
                "items": [{"productName": "A", "unitPrice": 10}]
            })))
            .await
            .unwrap();

        let invoice = repo.convert(&quotation.id).await.unwrap();
        assert_eq!(invoice.id, quotation.id);
        assert_eq!(invoice.kind, InvoiceType::Invoice);
        assert_eq!(invoice.status, InvoiceStatus::Pending);
        assert!(invoice.invoice_number.starts_with("INV-"));
        assert_eq!(invoice.items.len(), 1);

        assert!(matches!(
            repo.convert(&quotation.id).await,
            Err(DbError::Domain(CoreError::InvalidDocumentState { .. }))
        ));
    }

    #[tokio::test]
    async fn test_pay_decrements_stock_once() {
        let db = database().await;
        let product_id = widget(&db, 5).await;
        let repo = db.invoices();
        let invoice = repo
            .create(draft(serde_json::json!({
                "items": [{"productId": product_id, "quantity": 3}]
            })))
            .await
            .unwrap();

        let paid = repo.pay(&invoice.id, true).await.unwrap();
        assert_eq!(paid.status, InvoiceStatus::Paid);
        assert_eq!(db.products().get(&product_id).await.unwrap().quantity, 2);

        assert!(repo.pay(&invoice.id, true).await.is_err());
        assert_eq!(db.products().get(&product_id).await.unwrap().quantity, 2);
    }

    #[tokio::test]
    async fn test_pay_with_stock_floor_rolls_back() {
        let db = database().await;
        let plenty = widget(&db, 10).await;
        let scarce = widget(&db, 1).await;
        let repo = db.invoices();
        let invoice = repo
            .create(draft(serde_json::json!({
                "items": [
                    {"productId": plenty, "quantity": 4},
                    {"productId": scarce, "quantity": 2}
                ]
            })))
            .await
            .unwrap();

        let err = repo.pay(&invoice.id, false).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(CoreError::InsufficientStock { .. })));

        assert_eq!(db.products().get(&plenty).await.unwrap().quantity, 10);
        assert_eq!(db.products().get(&scarce).await.unwrap().quantity, 1);
        assert_eq!(repo.get(&invoice.id).await.unwrap().status, InvoiceStatus::Draft);
    }

    #[tokio::test]
    async fn test_delete_cascades_items_and_unblocks_customer() {
        let db = database().await;
        let customer = db
            .customers()
            .create(&CustomerInput {
                name: "Jane".to_string(),
                ..Default::default()
            })
            .await
            .unwrap();
        let invoice = db
            .invoices()
            .create(draft(serde_json::json!({
                "customer": {"id": customer.id},
                "items": [{"productName": "A", "unitPrice": 10}]
            })))
            .await
            .unwrap();

        assert!(matches!(
            db.customers().delete(&customer.id).await,
            Err(DbError::ForeignKeyViolation { .. })
        ));

        let detail = db.customers().detail(&customer.id).await.unwrap();
        assert_eq!(detail.purchase_history.len(), 1);
        let summary = db.customers().list().await.unwrap();
        assert_eq!(summary[0].invoice_count, 1);
        assert_eq!(summary[0].total_spent, Money::from_major(10));

        db.invoices().delete(&invoice.id).await.unwrap();
        let orphans: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM invoice_items")
            .fetch_one(db.pool())
            .await
            .unwrap();
        assert_eq!(orphans, 0);
        db.customers().delete(&customer.id).await.unwrap();
    }
}
