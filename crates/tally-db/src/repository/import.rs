//! # Import Repository
//!
//! Commits parsed CSV uploads. Parsing happens up front in
//! `tally_core::import`; by the time rows reach this module the whole
//! file has been read and validated.
//!
//! ```text
//! ┌───────────────────────────────────────────────────────────────┐
//! │  one file  ═══  one transaction                               │
//! │                                                               │
//! │  BEGIN                                                        │
//! │    row 1 ─► insert                                            │
//! │    row 2 ─► insert                                            │
//! │    row n ─► insert ✗  ──► drop(tx) ──► nothing committed      │
//! │  COMMIT                                                       │
//! └───────────────────────────────────────────────────────────────┘
//! ```
//!
//! Purchases go through the same insert path as manual creation, so every
//! grouped document also receives its stock.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{info, warn};

use crate::error::DbResult;
use crate::repository::{begin_write, customer, product, purchase};
use tally_core::document::PurchaseDraft;
use tally_core::import::{ImportKind, IMPORTED_PURCHASE_PREFIX};
use tally_core::{CustomerInput, ProductInput};

#[derive(Debug, Clone)]
pub struct ImportRepository {
    pool: SqlitePool,
}

impl ImportRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ImportRepository { pool }
    }

    /// Inserts every product, or none. Returns the number inserted.
    pub async fn products(&self, rows: Vec<ProductInput>) -> DbResult<usize> {
        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        for (idx, row) in rows.iter().enumerate() {
            if let Err(e) = product::insert_with(&mut tx, row, now).await {
                warn!(kind = %ImportKind::Products, row = idx + 1, error = %e, "Import aborted");
                return Err(e);
            }
        }

        tx.commit().await?;
        info!(kind = %ImportKind::Products, count = rows.len(), "Import committed");
        Ok(rows.len())
    }

    /// Inserts every customer, or none. Returns the number inserted.
    pub async fn customers(&self, rows: Vec<CustomerInput>) -> DbResult<usize> {
        let now = Utc::now();
        let mut tx = begin_write(&self.pool).await?;

        for (idx, row) in rows.iter().enumerate() {
            if let Err(e) = customer::insert_with(&mut tx, row, now).await {
                warn!(kind = %ImportKind::Customers, row = idx + 1, error = %e, "Import aborted");
                return Err(e);
            }
        }

        tx.commit().await?;
        info!(kind = %ImportKind::Customers, count = rows.len(), "Import committed");
        Ok(rows.len())
    }

    /// Inserts every grouped purchase with its stock effects, or none.
    /// Returns the number of documents created.
    pub async fn purchases(&self, drafts: Vec<PurchaseDraft>) -> DbResult<usize> {
        let now = Utc::now();
        let count = drafts.len();
        let mut tx = begin_write(&self.pool).await?;

        for draft in drafts {
            let number = draft.invoice_number.clone().unwrap_or_default();
            if let Err(e) = purchase::insert_purchase(&mut tx, draft, IMPORTED_PURCHASE_PREFIX, now).await {
                warn!(kind = %ImportKind::Purchases, number = %number, error = %e, "Import aborted");
                return Err(e);
            }
        }

        tx.commit().await?;
        info!(kind = %ImportKind::Purchases, count, "Import committed");
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::DbError;
    use crate::repository::test_support::database;
    use tally_core::import::{parse_customers, parse_products, parse_purchases};
    use tally_core::Money;

    #[tokio::test]
    async fn test_products_all_or_nothing() {
        let db = database().await;

        let csv = "name,sku,price\nFresh,SKU-2,1.50\n";
        let mut rows = parse_products(csv.as_bytes()).unwrap();
        rows.push(ProductInput::default());
        let err = db.imports().products(rows).await.unwrap_err();
        assert!(matches!(err, DbError::Domain(_)));
        assert_eq!(db.products().count().await.unwrap(), 0);

        let csv = "name,sku,price,quantity\nFresh,SKU-2,1.50,4\nOther,,2,\n";
        let rows = parse_products(csv.as_bytes()).unwrap();
        assert_eq!(db.imports().products(rows).await.unwrap(), 2);
        assert_eq!(db.products().count().await.unwrap(), 2);
    }

    #[tokio::test]
    async fn test_customers() {
        let db = database().await;
        let csv = "name,email,customerType\nJane,jane@example.com,individual\nAcme,,company\n";
        let rows = parse_customers(csv.as_bytes()).unwrap();
        assert_eq!(db.imports().customers(rows).await.unwrap(), 2);
        assert_eq!(db.customers().list().await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_purchases_group_and_receive() {
        let db = database().await;
        let bolt = db
            .products()
            .create(&ProductInput {
                name: "Bolt".to_string(),
                quantity: Some(1),
                ..Default::default()
            })
            .await
            .unwrap();

        let csv = format!(
            "invoiceNumber,supplierName,productId,productName,quantity,unitCost\n\
             P-1,Acme,{id},,10,0.25\n\
             P-2,,,Washer,5,0.05\n\
             P-1,Acme,{id},,2,0.30\n",
            id = bolt.id
        );
        let drafts = parse_purchases(csv.as_bytes(), Utc::now()).unwrap();
        assert_eq!(db.imports().purchases(drafts).await.unwrap(), 2);

        let purchases = db.purchases().list().await.unwrap();
        let p1 = purchases.iter().find(|p| p.invoice_number == "P-1").unwrap();
        assert_eq!(p1.items.len(), 2);
        assert_eq!(p1.total, Money::from_cents(310));
        assert_eq!(p1.items[0].product_name, "Bolt");

        let p2 = purchases.iter().find(|p| p.invoice_number == "P-2").unwrap();
        assert_eq!(p2.supplier.name, "Imported Supplier");
        assert_eq!(p2.notes.as_deref(), Some("Imported via CSV"));

        let bolt = db.products().get(&bolt.id).await.unwrap();
        assert_eq!(bolt.quantity, 13);
        assert_eq!(bolt.cost_price, Money::from_cents(30));
    }

    #[tokio::test]
    async fn test_purchase_failure_rolls_back_every_group() {
        let db = database().await;
        let csv = "invoiceNumber,productName,quantity,unitCost\n\
                   P-1,Bolt,1,1\n\
                   P-2,,1,1\n\
                   P-3,,1,1\n";
        let mut drafts = parse_purchases(csv.as_bytes(), Utc::now()).unwrap();
        drafts[2].lines[0].product_id = Some("ghost".to_string());

        assert!(db.imports().purchases(drafts).await.is_err());
        assert!(db.purchases().list().await.unwrap().is_empty());
    }
}
