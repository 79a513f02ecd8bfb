//! # Customer Repository
//!
//! Customer CRUD plus the lifetime aggregates shown in the customer list.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::invoice;
use crate::repository::{clean, new_id};
use tally_core::{Customer, CustomerDetail, CustomerInput, CustomerSummary, CustomerType, Money};

const CUSTOMER_COLUMNS: &str = "c.id, c.name, c.email, c.phone, c.address, c.customer_type, \
                                c.company_name, c.tax_number, c.details, c.created_at";

#[derive(Debug, sqlx::FromRow)]
struct CustomerRow {
    id: String,
    name: String,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    customer_type: CustomerType,
    company_name: Option<String>,
    tax_number: Option<String>,
    details: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<CustomerRow> for Customer {
    fn from(row: CustomerRow) -> Self {
        Customer {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            address: row.address,
            customer_type: row.customer_type,
            company_name: row.company_name,
            tax_number: row.tax_number,
            details: row.details,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SummaryRow {
    #[sqlx(flatten)]
    customer: CustomerRow,
    invoice_count: i64,
    total_spent_cents: i64,
}

#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Lists customers with invoice count and total spent.
    ///
    /// Only documents of type invoice count; cancelled ones are excluded
    /// from the spend but still counted.
    pub async fn list(&self) -> DbResult<Vec<CustomerSummary>> {
        let rows: Vec<SummaryRow> = sqlx::query_as(&format!(
            r#"
            SELECT {CUSTOMER_COLUMNS},
                (SELECT COUNT(*) FROM invoices i
                  WHERE i.customer_id = c.id AND i.type = 'invoice') AS invoice_count,
                (SELECT COALESCE(SUM(i.total_cents), 0) FROM invoices i
                  WHERE i.customer_id = c.id AND i.type = 'invoice'
                    AND i.status <> 'cancelled') AS total_spent_cents
            FROM customers c
            ORDER BY c.name COLLATE NOCASE
            "#
        ))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| CustomerSummary {
                customer: row.customer.into(),
                invoice_count: row.invoice_count,
                total_spent: Money::from_cents(row.total_spent_cents),
            })
            .collect())
    }

    pub async fn get(&self, id: &str) -> DbResult<Customer> {
        let row: Option<CustomerRow> =
            sqlx::query_as(&format!("SELECT {CUSTOMER_COLUMNS} FROM customers c WHERE c.id = ?1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(Customer::from)
            .ok_or_else(|| DbError::not_found("Customer", id))
    }

    /// Customer with their invoices, newest first.
    pub async fn detail(&self, id: &str) -> DbResult<CustomerDetail> {
        let customer = self.get(id).await?;
        let mut conn = self.pool.acquire().await?;
        let purchase_history = invoice::list_for_customer(&mut conn, id).await?;

        Ok(CustomerDetail {
            customer,
            purchase_history,
        })
    }

    pub async fn create(&self, input: &CustomerInput) -> DbResult<Customer> {
        let mut conn = self.pool.acquire().await?;
        let id = insert_with(&mut conn, input, Utc::now()).await?;
        drop(conn);
        self.get(&id).await
    }

    pub async fn update(&self, id: &str, input: &CustomerInput) -> DbResult<Customer> {
        input.validate()?;
        debug!(id = %id, "Updating customer");

        let result = sqlx::query(
            r#"
            UPDATE customers SET
                name = ?2, email = ?3, phone = ?4, address = ?5, customer_type = ?6,
                company_name = ?7, tax_number = ?8, details = ?9
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(input.name.trim())
        .bind(clean(input.email.as_deref()))
        .bind(clean(input.phone.as_deref()))
        .bind(input.address.as_deref())
        .bind(input.customer_type)
        .bind(clean(input.company_name.as_deref()))
        .bind(clean(input.tax_number.as_deref()))
        .bind(input.details.as_deref())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        self.get(id).await
    }

    /// Deletes a customer. Refused with a foreign key violation while any
    /// invoice still references it.
    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM customers WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Customer", id));
        }

        info!(id = %id, "Customer deleted");
        Ok(())
    }
}

/// Validates and inserts one customer on `conn`, returning its new id.
pub(crate) async fn insert_with(
    conn: &mut sqlx::SqliteConnection,
    input: &CustomerInput,
    now: DateTime<Utc>,
) -> DbResult<String> {
    input.validate()?;

    let id = new_id();
    debug!(id = %id, name = %input.name, "Inserting customer");

    sqlx::query(
        r#"
        INSERT INTO customers (
            id, name, email, phone, address, customer_type,
            company_name, tax_number, details, created_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
    )
    .bind(&id)
    .bind(input.name.trim())
    .bind(clean(input.email.as_deref()))
    .bind(clean(input.phone.as_deref()))
    .bind(input.address.as_deref())
    .bind(input.customer_type)
    .bind(clean(input.company_name.as_deref()))
    .bind(clean(input.tax_number.as_deref()))
    .bind(input.details.as_deref())
    .bind(now)
    .execute(&mut *conn)
    .await?;

    Ok(id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::database;

    fn acme() -> CustomerInput {
        CustomerInput {
            name: "Acme".to_string(),
            email: Some("ops@acme.test".to_string()),
            customer_type: CustomerType::Company,
            company_name: Some("Acme Ltd".to_string()),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_crud() {
        let db = database().await;
        let repo = db.customers();

        let created = repo.create(&acme()).await.unwrap();
        assert_eq!(created.customer_type, CustomerType::Company);

        let updated = repo
            .update(
                &created.id,
                &CustomerInput {
                    phone: Some("555-0100".to_string()),
                    ..acme()
                },
            )
            .await
            .unwrap();
        assert_eq!(updated.phone.as_deref(), Some("555-0100"));

        repo.delete(&created.id).await.unwrap();
        assert!(matches!(repo.get(&created.id).await, Err(DbError::NotFound { .. })));
    }

    #[tokio::test]
    async fn test_list_without_invoices_has_zero_aggregates() {
        let db = database().await;
        db.customers().create(&acme()).await.unwrap();

        let list = db.customers().list().await.unwrap();
        assert_eq!(list.len(), 1);
        assert_eq!(list[0].invoice_count, 0);
        assert!(list[0].total_spent.is_zero());
    }
}
