//! # Expense Repository
//!
//! Expenses and their categories. An expense stores the category name as
//! it was when the expense was recorded; renaming a category later does
//! not rewrite history, and deleting one nulls the reference only.

use chrono::{DateTime, NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::repository::{clean, new_id};
use tally_core::types::ExpenseDraft;
use tally_core::{Expense, ExpenseCategory, ExpenseCategoryInput, Money};

#[derive(Debug, sqlx::FromRow)]
struct ExpenseRow {
    id: String,
    category_id: Option<String>,
    category_name: String,
    amount_cents: i64,
    description: Option<String>,
    date: NaiveDate,
    created_at: DateTime<Utc>,
}

impl From<ExpenseRow> for Expense {
    fn from(row: ExpenseRow) -> Self {
        Expense {
            id: row.id,
            category_id: row.category_id,
            category_name: row.category_name,
            amount: Money::from_cents(row.amount_cents),
            description: row.description,
            date: row.date,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct CategoryRow {
    id: String,
    name: String,
    color: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<CategoryRow> for ExpenseCategory {
    fn from(row: CategoryRow) -> Self {
        ExpenseCategory {
            id: row.id,
            name: row.name,
            color: row.color,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ExpenseRepository {
    pool: SqlitePool,
}

impl ExpenseRepository {
    pub fn new(pool: SqlitePool) -> Self {
        ExpenseRepository { pool }
    }

    // =========================================================================
    // Expenses
    // =========================================================================

    /// Lists expenses, most recent date first.
    pub async fn list(&self) -> DbResult<Vec<Expense>> {
        let rows: Vec<ExpenseRow> = sqlx::query_as(
            r#"
            SELECT id, category_id, category_name, amount_cents, description, date, created_at
            FROM expenses
            ORDER BY date DESC, created_at DESC
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(Expense::from).collect())
    }

    pub async fn get(&self, id: &str) -> DbResult<Expense> {
        let row: Option<ExpenseRow> = sqlx::query_as(
            r#"
            SELECT id, category_id, category_name, amount_cents, description, date, created_at
            FROM expenses WHERE id = ?1
            "#,
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Expense::from)
            .ok_or_else(|| DbError::not_found("Expense", id))
    }

    /// Records an expense, copying the category name from its category.
    pub async fn create(&self, draft: &ExpenseDraft) -> DbResult<Expense> {
        let mut conn = self.pool.acquire().await?;
        let category_name = category_name(&mut conn, &draft.category_id).await?;

        let id = new_id();
        debug!(id = %id, amount = %draft.amount, "Recording expense");

        sqlx::query(
            r#"
            INSERT INTO expenses (id, category_id, category_name, amount_cents, description, date, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
        )
        .bind(&id)
        .bind(&draft.category_id)
        .bind(&category_name)
        .bind(draft.amount.cents())
        .bind(draft.description.as_deref())
        .bind(draft.date)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?;
        drop(conn);

        self.get(&id).await
    }

    pub async fn update(&self, id: &str, draft: &ExpenseDraft) -> DbResult<Expense> {
        let mut conn = self.pool.acquire().await?;
        let category_name = category_name(&mut conn, &draft.category_id).await?;

        let result = sqlx::query(
            r#"
            UPDATE expenses SET
                category_id = ?2, category_name = ?3, amount_cents = ?4, description = ?5, date = ?6
            WHERE id = ?1
            "#,
        )
        .bind(id)
        .bind(&draft.category_id)
        .bind(&category_name)
        .bind(draft.amount.cents())
        .bind(draft.description.as_deref())
        .bind(draft.date)
        .execute(&mut *conn)
        .await?;
        drop(conn);

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Expense", id));
        }

        self.get(id).await
    }

    pub async fn delete(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM expenses WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Expense", id));
        }

        Ok(())
    }

    // =========================================================================
    // Categories
    // =========================================================================

    pub async fn list_categories(&self) -> DbResult<Vec<ExpenseCategory>> {
        let rows: Vec<CategoryRow> = sqlx::query_as(
            "SELECT id, name, color, created_at FROM expense_categories ORDER BY name COLLATE NOCASE",
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(ExpenseCategory::from).collect())
    }

    pub async fn get_category(&self, id: &str) -> DbResult<ExpenseCategory> {
        let row: Option<CategoryRow> =
            sqlx::query_as("SELECT id, name, color, created_at FROM expense_categories WHERE id = ?1")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;

        row.map(ExpenseCategory::from)
            .ok_or_else(|| DbError::not_found("ExpenseCategory", id))
    }

    pub async fn create_category(&self, input: &ExpenseCategoryInput) -> DbResult<ExpenseCategory> {
        input.validate()?;

        let id = new_id();
        sqlx::query("INSERT INTO expense_categories (id, name, color, created_at) VALUES (?1, ?2, ?3, ?4)")
            .bind(&id)
            .bind(input.name.trim())
            .bind(clean(input.color.as_deref()))
            .bind(Utc::now())
            .execute(&self.pool)
            .await?;

        info!(id = %id, name = %input.name, "Expense category created");
        self.get_category(&id).await
    }

    pub async fn update_category(
        &self,
        id: &str,
        input: &ExpenseCategoryInput,
    ) -> DbResult<ExpenseCategory> {
        input.validate()?;

        let result = sqlx::query("UPDATE expense_categories SET name = ?2, color = ?3 WHERE id = ?1")
            .bind(id)
            .bind(input.name.trim())
            .bind(clean(input.color.as_deref()))
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ExpenseCategory", id));
        }

        self.get_category(id).await
    }

    /// Deletes a category; its expenses keep their name snapshot.
    pub async fn delete_category(&self, id: &str) -> DbResult<()> {
        let result = sqlx::query("DELETE FROM expense_categories WHERE id = ?1")
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("ExpenseCategory", id));
        }

        Ok(())
    }
}

async fn category_name(conn: &mut SqliteConnection, id: &str) -> DbResult<String> {
    sqlx::query_scalar::<_, String>("SELECT name FROM expense_categories WHERE id = ?1")
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
        .ok_or_else(|| DbError::not_found("ExpenseCategory", id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::test_support::database;

    fn draft(category_id: &str) -> ExpenseDraft {
        ExpenseDraft {
            category_id: category_id.to_string(),
            amount: Money::from_cents(12_000),
            description: Some("March rent".to_string()),
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
        }
    }

    #[tokio::test]
    async fn test_seeded_categories() {
        let db = database().await;
        let names: Vec<String> = db
            .expenses()
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.name)
            .collect();
        assert!(names.contains(&"Rent".to_string()));
        assert!(names.contains(&"Other".to_string()));
    }

    #[tokio::test]
    async fn test_expense_snapshots_category_name() {
        let db = database().await;
        let repo = db.expenses();

        let category = repo
            .create_category(&ExpenseCategoryInput {
                name: "Travel".to_string(),
                color: None,
            })
            .await
            .unwrap();
        let expense = repo.create(&draft(&category.id)).await.unwrap();
        assert_eq!(expense.category_name, "Travel");

        repo.update_category(
            &category.id,
            &ExpenseCategoryInput {
                name: "Trips".to_string(),
                color: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(repo.get(&expense.id).await.unwrap().category_name, "Travel");

        repo.delete_category(&category.id).await.unwrap();
        let orphan = repo.get(&expense.id).await.unwrap();
        assert_eq!(orphan.category_id, None);
        assert_eq!(orphan.category_name, "Travel");
    }

    #[tokio::test]
    async fn test_unknown_category_is_not_found() {
        let db = database().await;
        assert!(matches!(
            db.expenses().create(&draft("nope")).await,
            Err(DbError::NotFound { .. })
        ));
    }
}
