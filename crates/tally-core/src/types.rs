//! # Catalog Types
//!
//! Master records of the back office: products, customers, suppliers and
//! expenses. These are the live, mutable entities that transaction
//! documents copy snapshots from.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Catalog Types                                   │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │    Customer     │   │    Supplier     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  price          │   │  customer_type  │   │  contact fields │       │
//! │  │  cost_price     │   │  company fields │   │                 │       │
//! │  │  quantity       │   │                 │   │                 │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐                             │
//! │  │ ExpenseCategory │◄──│    Expense      │  category name is a         │
//! │  │  name, color    │   │  amount, date   │  snapshot, not a join       │
//! │  └─────────────────┘   └─────────────────┘                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each entity has a read model (what the store returns) and an `*Input`
//! type (what the API accepts). Inputs carry a `validate()` that runs before
//! any statement reaches the store.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::document::Invoice;
use crate::money::Money;
use crate::validation::{
    require_text, validate_non_negative, validate_optional_text, ValidationResult,
    MAX_NAME_LEN, MAX_TEXT_LEN,
};

// =============================================================================
// Product
// =============================================================================

/// A product in the catalogue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub sku: Option<String>,
    pub category: Option<String>,

    /// Sell price.
    pub price: Money,

    /// Latest purchase unit cost. Overwritten by every purchase that
    /// references this product.
    pub cost_price: Money,

    /// On-hand quantity. No floor is enforced; sales may drive it negative.
    pub quantity: i64,

    /// Public URL of the uploaded image, e.g. `/uploads/products/<file>`.
    pub image_url: Option<String>,
    pub description: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Create/replace payload for a product.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductInput {
    #[serde(default)]
    pub name: String,
    pub sku: Option<String>,
    pub category: Option<String>,
    pub price: Option<Money>,
    pub cost_price: Option<Money>,
    pub quantity: Option<i64>,
    pub description: Option<String>,
    pub image_url: Option<String>,
}

impl ProductInput {
    pub fn validate(&self) -> ValidationResult<()> {
        require_text("name", &self.name, MAX_NAME_LEN)?;
        validate_optional_text("sku", self.sku.as_deref(), MAX_NAME_LEN)?;
        validate_optional_text("category", self.category.as_deref(), MAX_NAME_LEN)?;
        validate_optional_text("description", self.description.as_deref(), MAX_TEXT_LEN)?;
        validate_non_negative("price", self.price.unwrap_or_default())?;
        validate_non_negative("costPrice", self.cost_price.unwrap_or_default())?;
        Ok(())
    }
}

// =============================================================================
// Customer
// =============================================================================

/// Whether a customer is a person or a company.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum CustomerType {
    #[default]
    Individual,
    Company,
}

impl CustomerType {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "individual" => Some(CustomerType::Individual),
            "company" => Some(CustomerType::Company),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub customer_type: CustomerType,
    pub company_name: Option<String>,
    pub tax_number: Option<String>,
    pub details: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerInput {
    #[serde(default)]
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[serde(default)]
    pub customer_type: CustomerType,
    pub company_name: Option<String>,
    pub tax_number: Option<String>,
    pub details: Option<String>,
}

impl CustomerInput {
    pub fn validate(&self) -> ValidationResult<()> {
        require_text("name", &self.name, MAX_NAME_LEN)?;
        validate_optional_text("email", self.email.as_deref(), MAX_NAME_LEN)?;
        validate_optional_text("phone", self.phone.as_deref(), MAX_NAME_LEN)?;
        validate_optional_text("address", self.address.as_deref(), MAX_TEXT_LEN)?;
        validate_optional_text("details", self.details.as_deref(), MAX_TEXT_LEN)?;
        Ok(())
    }
}

/// Customer list row with lifetime aggregates.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerSummary {
    #[serde(flatten)]
    #[ts(flatten)]
    pub customer: Customer,

    /// Number of documents of type invoice referencing this customer.
    pub invoice_count: i64,

    /// Sum of totals of non-cancelled invoices.
    pub total_spent: Money,
}

/// Single customer with their invoices, newest first.
#[derive(Debug, Clone, Serialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerDetail {
    #[serde(flatten)]
    #[ts(flatten)]
    pub customer: Customer,
    pub purchase_history: Vec<Invoice>,
}

// =============================================================================
// Supplier
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Supplier {
    pub id: String,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierInput {
    #[serde(default)]
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
}

impl SupplierInput {
    pub fn validate(&self) -> ValidationResult<()> {
        require_text("name", &self.name, MAX_NAME_LEN)?;
        validate_optional_text("email", self.email.as_deref(), MAX_NAME_LEN)?;
        validate_optional_text("phone", self.phone.as_deref(), MAX_NAME_LEN)?;
        validate_optional_text("address", self.address.as_deref(), MAX_TEXT_LEN)
    }
}

// =============================================================================
// Expenses
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ExpenseCategory {
    pub id: String,
    pub name: String,
    /// Display colour, e.g. `#22c55e`.
    pub color: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExpenseCategoryInput {
    #[serde(default)]
    pub name: String,
    pub color: Option<String>,
}

impl ExpenseCategoryInput {
    pub fn validate(&self) -> ValidationResult<()> {
        require_text("name", &self.name, MAX_NAME_LEN)?;
        validate_optional_text("color", self.color.as_deref(), 32)
    }
}

/// A recorded expense.
///
/// `category_id` + `category_name` are a snapshot of the category at the
/// time of recording; the id is nulled if the category is later deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Expense {
    pub id: String,
    pub category_id: Option<String>,
    pub category_name: String,
    pub amount: Money,
    pub description: Option<String>,
    /// Calendar date, not a timestamp.
    #[ts(as = "String")]
    pub date: NaiveDate,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// The one accepted expense payload. Unknown field spellings are rejected.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ExpenseInput {
    pub category_id: Option<String>,
    pub amount: Option<Money>,
    pub description: Option<String>,
    pub date: Option<NaiveDate>,
}

/// An expense input that passed validation.
#[derive(Debug, Clone, PartialEq)]
pub struct ExpenseDraft {
    pub category_id: String,
    pub amount: Money,
    pub description: Option<String>,
    pub date: NaiveDate,
}

impl ExpenseInput {
    /// Validates the payload; a missing `date` becomes `today`.
    pub fn into_draft(self, today: NaiveDate) -> ValidationResult<ExpenseDraft> {
        let category_id = self
            .category_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| crate::ValidationError::required("categoryId"))?;
        let amount = self
            .amount
            .ok_or_else(|| crate::ValidationError::required("amount"))?;
        validate_non_negative("amount", amount)?;
        validate_optional_text("description", self.description.as_deref(), MAX_TEXT_LEN)?;

        Ok(ExpenseDraft {
            category_id,
            amount,
            description: self.description,
            date: self.date.unwrap_or(today),
        })
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
