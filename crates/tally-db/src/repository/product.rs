//! # Product Repository
//!
//! Catalogue CRUD and stock adjustments.
//!
//! ## Stock Writes
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Who Moves Stock, and How                             │
//! │                                                                         │
//! │  PATCH /products/:id/stock   quantity = ?              (absolute set)  │
//! │                                                                         │
//! │  purchase create / import    quantity = quantity + ?   (relative)      │
//! │                              cost_cents = ?            (latest cost)   │
//! │                                                                         │
//! │  invoice pay                 quantity = quantity - ?   (relative)      │
//! │                                                                         │
//! │  Relative updates never read-modify-write, so two concurrent           │
//! │  documents touching the same product both land.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::{DbError, DbResult};
use crate::repository::{clean, new_id};
use tally_core::document::{LineDraft, LiveProduct, PricedLine};
use tally_core::{Money, Product, ProductInput};

const PRODUCT_COLUMNS: &str = "id, name, sku, category, price_cents, cost_cents, quantity, \
                               image_url, description, created_at, updated_at";

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: String,
    name: String,
    sku: Option<String>,
    category: Option<String>,
    price_cents: i64,
    cost_cents: i64,
    quantity: i64,
    image_url: Option<String>,
    description: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ProductRow> for Product {
    fn from(row: ProductRow) -> Self {
        Product {
            id: row.id,
            name: row.name,
            sku: row.sku,
            category: row.category,
            price: Money::from_cents(row.price_cents),
            cost_price: Money::from_cents(row.cost_cents),
            quantity: row.quantity,
            image_url: row.image_url,
            description: row.description,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Lists every product, newest first.
    pub async fn list(&self) -> DbResult<Vec<Product>> {
        let rows: Vec<ProductRow> = sqlx::query_as(&format!(
            "SELECT {PRODUCT_COLUMNS} FROM products ORDER BY created_at DESC, rowid DESC"
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Product::from).collect())
    }

    /// Gets a product by its ID.
    ///
    /// ## Returns
    /// * `Ok(Product)` - Product found
    /// * `Err(DbError::NotFound)` - No such product
    pub async fn get(&self, id: &str) -> DbResult<Product> {
        let mut conn = self.pool.acquire().await?;
        fetch(&mut conn, id).await
    }

    /// Inserts a new product.
    pub async fn create(&self, input: &ProductInput) -> DbResult<Product> {
        let mut conn = self.pool.acquire().await?;
        let id = insert_with(&mut conn, input, Utc::now()).await?;
        fetch(&mut conn, &id).await
    }

    /// Replaces a product's fields.
    ///
    /// An absent `imageUrl` keeps the stored image.
    pub async fn update(&self, id: &str, input: &ProductInput) -> DbResult<Product> {
        input.validate()?;
        debug!(id = %id, "Updating product");

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?2,
                sku = ?3,
                category = ?4,
                price_cents = ?5,
                cost_cents = ?6,
                quantity = ?7,
                description = ?8,
                image_url = COALESCE(?9, image_url),
                updated_at = ?10
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(clean(input.sku.as_deref()))
        .bind(clean(input.category.as_deref()))
        .bind(input.price.unwrap_or_default().cents())
        .bind(input.cost_price.unwrap_or_default().cents())
        .bind(input.quantity.unwrap_or(0))
        .bind(input.description.as_deref())
        .bind(input.image_url.as_deref())
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.get(id).await
    }

    /// Sets the on-hand quantity to an absolute value.
    pub async fn set_stock(&self, id: &str, quantity: i64) -> DbResult<Product> {
        debug!(id = %id, quantity, "Setting stock");

        let result = sqlx::query("UPDATE products SET quantity = ?2, updated_at = ?3 WHERE id = ?1")
            .bind(id)
            .bind(quantity)
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        self.get(id).await
    }

    /// Deletes a product. Document lines keep their snapshot; their
    /// product reference is nulled by the schema.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        debug!(id = %id, "Deleting product");

        let result = sqlx::query("DELETE FROM products WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        Ok(())
    }

    /// Counts products (for diagnostics).
    pub async fn count(&self) -> DbResult<i64> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM products")
            .fetch_one(&self.pool)
            .await?;

        Ok(count)
    }
}

// =============================================================================
// Connection-level helpers (shared with transactional paths)
// =============================================================================

async fn fetch(conn: &mut SqliteConnection, id: &str) -> DbResult<Product> {
    let row: Option<ProductRow> =
        sqlx::query_as(&format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    row.map(Product::from)
        .ok_or_else(|| DbError::not_found("Product", id))
}

/// Validates and inserts one product on `conn`, returning its new id.
pub(crate) async fn insert_with(
    conn: &mut SqliteConnection,
    input: &ProductInput,
    now: DateTime<Utc>,
) -> DbResult<String> {
    input.validate()?;

    let id = new_id();
    debug!(id = %id, name = %input.name, "Inserting product");

    sqlx::query(
        r#"
        INSERT INTO products (
            id, name, sku, category, price_cents, cost_cents, quantity,
            image_url, description, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?10)
        "#,
    )
    .bind(&id)
    .bind(input.name.trim())
    .bind(clean(input.sku.as_deref()))
    .bind(clean(input.category.as_deref()))
    .bind(input.price.unwrap_or_default().cents())
    .bind(input.cost_price.unwrap_or_default().cents())
    .bind(input.quantity.unwrap_or(0))
    .bind(input.image_url.as_deref())
    .bind(input.description.as_deref())
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(id)
}

/// Live fields for snapshotting a document line. `None` when missing.
pub(crate) async fn live_product(
    conn: &mut SqliteConnection,
    id: &str,
) -> DbResult<Option<LiveProduct>> {
    let row: Option<(String, i64, i64)> =
        sqlx::query_as("SELECT name, price_cents, cost_cents FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    Ok(row.map(|(name, price, cost)| LiveProduct {
        name,
        price: Money::from_cents(price),
        cost_price: Money::from_cents(cost),
    }))
}

/// Completes every line's snapshot from the live catalogue.
///
/// A line naming a product that does not exist fails the whole unit with
/// `NotFound`.
pub(crate) async fn snapshot_lines(
    conn: &mut SqliteConnection,
    lines: Vec<LineDraft>,
    use_cost: bool,
) -> DbResult<Vec<PricedLine>> {
    let mut priced = Vec::with_capacity(lines.len());

    for line in lines {
        let live = match line.product_id.as_deref() {
            Some(id) => Some(
                live_product(conn, id)
                    .await?
                    .ok_or_else(|| DbError::not_found("Product", id))?,
            ),
            None => None,
        };
        priced.push(line.resolve(live.as_ref(), use_cost));
    }

    Ok(priced)
}

/// Adds received stock and records the latest unit cost.
pub(crate) async fn receive_stock(
    conn: &mut SqliteConnection,
    id: &str,
    quantity: i64,
    unit_cost: Money,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let result = sqlx::query(
        "UPDATE products SET quantity = quantity + ?2, cost_cents = ?3, updated_at = ?4 WHERE id = ?1",
    )
    .bind(id)
    .bind(quantity)
    .bind(unit_cost.cents())
    .bind(now)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(DbError::not_found("Product", id));
    }

    Ok(())
}

/// Removes sold stock.
///
/// With `allow_negative` false the update only applies while enough stock
/// is on hand; a shortfall surfaces as `InsufficientStock`.
pub(crate) async fn consume_stock(
    conn: &mut SqliteConnection,
    id: &str,
    quantity: i64,
    allow_negative: bool,
    now: DateTime<Utc>,
) -> DbResult<()> {
    let sql = if allow_negative {
        "UPDATE products SET quantity = quantity - ?2, updated_at = ?3 WHERE id = ?1"
    } else {
        "UPDATE products SET quantity = quantity - ?2, updated_at = ?3 WHERE id = ?1 AND quantity >= ?2"
    };

    let result = sqlx::query(sql)
        .bind(id)
        .bind(quantity)
        .bind(now)
        .execute(&mut *conn)
        .await?;

    if result.rows_affected() > 0 {
        return Ok(());
    }

    let on_hand: Option<(String, i64)> =
        sqlx::query_as("SELECT name, quantity FROM products WHERE id = ?1")
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;

    match on_hand {
        None => Err(DbError::not_found("Product", id)),
        Some((name, available)) => Err(tally_core::CoreError::InsufficientStock {
            product: name,
            available,
            requested: quantity,
        }
        .into()),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
