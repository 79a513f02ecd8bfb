//! # Transaction Documents
//!
//! Sales invoices, quotations and purchase invoices, plus the pure half of
//! the transaction engine: turning a loose API payload into a validated
//! draft and pricing its lines.
//!
//! ## Lifecycle of a Document
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  InvoiceInput (JSON)                                                    │
//! │       │  into_draft()          ← validation, defaults (THIS MODULE)     │
//! │       ▼                                                                 │
//! │  InvoiceDraft { lines: Vec<LineDraft> }                                 │
//! │       │  resolve snapshots     ← tally-db, inside the atomic unit       │
//! │       ▼                                                                 │
//! │  Vec<PricedLine> ──► DocumentTotals::compute()  (THIS MODULE)           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  parent row + item rows committed together                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Totals
//! Totals are always derived from the lines. Caller-supplied `subtotal`,
//! `discount` or `total` fields are not part of the input schema and are
//! dropped during deserialization.
//! ```text
//! line.total  = max(0, quantity × unit_price − line.discount)
//! subtotal    = Σ line.total
//! discount    = clamp(fixed value | subtotal × pct / 100, 0, subtotal)
//! total       = subtotal − discount + tax
//! ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;
use crate::validation::{
    require_text, validate_non_negative, validate_optional_text, validate_percentage,
    validate_quantity, ValidationResult, MAX_NAME_LEN, MAX_TEXT_LEN,
};

/// Product name recorded when a line has neither a product nor a name.
pub const UNKNOWN_PRODUCT: &str = "Unknown Product";

// =============================================================================
// Enums
// =============================================================================

/// Quotations and invoices share one table, discriminated by this type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum InvoiceType {
    Quotation,
    #[default]
    Invoice,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Pending,
    Paid,
    Cancelled,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum DiscountType {
    Percentage,
    #[default]
    Fixed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum PurchaseStatus {
    Pending,
    #[default]
    Received,
    Cancelled,
}

impl PurchaseStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(PurchaseStatus::Pending),
            "received" => Some(PurchaseStatus::Received),
            "cancelled" => Some(PurchaseStatus::Cancelled),
            _ => None,
        }
    }
}

// =============================================================================
// Discount and Totals
// =============================================================================

/// Document-level discount as entered: a kind plus the raw value.
///
/// The raw value is kept verbatim (a percentage like `10` or a fixed amount
/// like `12.5`); the computed amount is derived per subtotal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Discount {
    pub kind: DiscountType,
    pub value: f64,
}

impl Discount {
    /// Amount this discount takes off `subtotal`, clamped to `[0, subtotal]`.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::document::{Discount, DiscountType};
    /// use tally_core::Money;
    ///
    /// let pct = Discount { kind: DiscountType::Percentage, value: 10.0 };
    /// assert_eq!(pct.amount(Money::from_major(200)), Money::from_major(20));
    ///
    /// let fixed = Discount { kind: DiscountType::Fixed, value: 500.0 };
    /// assert_eq!(fixed.amount(Money::from_major(200)), Money::from_major(200));
    /// ```
    pub fn amount(&self, subtotal: Money) -> Money {
        let raw = match self.kind {
            DiscountType::Percentage => {
                let bps = (self.value * 100.0).round() as i64;
                subtotal.percentage(bps)
            }
            DiscountType::Fixed => Money::from_cents((self.value * 100.0).round() as i64),
        };
        raw.clamp_between(Money::zero(), subtotal.non_negative())
    }

    fn validate(&self) -> ValidationResult<()> {
        match self.kind {
            DiscountType::Percentage => validate_percentage("discountValue", self.value),
            DiscountType::Fixed if !self.value.is_finite() || self.value < 0.0 => {
                Err(ValidationError::MustNotBeNegative {
                    field: "discountValue".to_string(),
                })
            }
            DiscountType::Fixed => Ok(()),
        }
    }
}

/// Server-derived money fields of a document.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DocumentTotals {
    pub subtotal: Money,
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
}

impl DocumentTotals {
    /// Derives totals from priced lines.
    ///
    /// ## Example
    /// ```rust
    /// use tally_core::document::{Discount, DiscountType, DocumentTotals, PricedLine};
    /// use tally_core::Money;
    ///
    /// let lines = vec![PricedLine {
    ///     product_id: None,
    ///     product_name: "Consulting".into(),
    ///     quantity: 2,
    ///     unit_price: Money::from_major(100),
    ///     discount: Money::zero(),
    /// }];
    /// let discount = Discount { kind: DiscountType::Percentage, value: 10.0 };
    /// let totals = DocumentTotals::compute(&lines, Some(discount), Money::zero()).unwrap();
    /// assert_eq!(totals.subtotal, Money::from_major(200));
    /// assert_eq!(totals.discount, Money::from_major(20));
    /// assert_eq!(totals.total, Money::from_major(180));
    /// ```
    ///
    /// Fails with [`ValidationError::OutOfRange`] when any sum leaves the
    /// representable range.
    pub fn compute(
        lines: &[PricedLine],
        discount: Option<Discount>,
        tax: Money,
    ) -> ValidationResult<Self> {
        let mut subtotal = Money::zero();
        for line in lines {
            subtotal = subtotal.checked_add(line.total()?).ok_or_else(|| amount_overflow("subtotal"))?;
        }
        let discount = discount.map(|d| d.amount(subtotal)).unwrap_or_default();
        let total = subtotal
            .checked_sub(discount)
            .and_then(|net| net.checked_add(tax))
            .ok_or_else(|| amount_overflow("total"))?;

        Ok(DocumentTotals {
            subtotal,
            discount,
            tax,
            total,
        })
    }

    /// Purchases carry no discount or tax: total equals subtotal.
    pub fn for_purchase(lines: &[PricedLine]) -> ValidationResult<Self> {
        DocumentTotals::compute(lines, None, Money::zero())
    }
}

fn amount_overflow(field: &str) -> ValidationError {
    ValidationError::OutOfRange {
        field: field.to_string(),
        min: 0,
        max: i64::MAX / 100,
    }
}

// =============================================================================
// Lines
// =============================================================================

/// Live product fields a line may copy into its snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct LiveProduct {
    pub name: String,
    pub price: Money,
    pub cost_price: Money,
}

/// A validated line whose snapshot may still need live product data.
#[derive(Debug, Clone, PartialEq)]
pub struct LineDraft {
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub quantity: i64,
    /// Unit price for sales, unit cost for purchases.
    pub unit_amount: Option<Money>,
    pub discount: Money,
}

impl LineDraft {
    /// Completes the snapshot. Explicit values win over live product values.
    ///
    /// `use_cost` selects the product's cost price (purchases) instead of
    /// its sell price (sales) when the line omits its unit amount.
    pub fn resolve(self, live: Option<&LiveProduct>, use_cost: bool) -> PricedLine {
        let product_name = self
            .product_name
            .or_else(|| live.map(|p| p.name.clone()))
            .unwrap_or_else(|| UNKNOWN_PRODUCT.to_string());

        let live_amount = live.map(|p| if use_cost { p.cost_price } else { p.price });
        let unit_price = self.unit_amount.or(live_amount).unwrap_or_default();

        PricedLine {
            product_id: self.product_id,
            product_name,
            quantity: self.quantity,
            unit_price,
            discount: self.discount,
        }
    }
}

/// A fully snapshotted line, ready to insert.
#[derive(Debug, Clone, PartialEq)]
pub struct PricedLine {
    pub product_id: Option<String>,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub discount: Money,
}

impl PricedLine {
    /// `max(0, quantity × unit_price − discount)`.
    pub fn total(&self) -> ValidationResult<Money> {
        self.unit_price
            .checked_multiply_quantity(self.quantity)
            .and_then(|gross| gross.checked_sub(self.discount))
            .map(Money::non_negative)
            .ok_or_else(|| amount_overflow("total"))
    }
}

// =============================================================================
// Invoice (read model)
// =============================================================================

/// Customer fields captured on the document at creation time.
///
/// Independent of the live [`crate::Customer`]: later edits to the customer
/// never reach existing documents.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct CustomerSnapshot {
    /// Reference to the live customer, if the document was made for one.
    pub id: Option<String>,
    pub name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct InvoiceItem {
    pub id: String,
    pub product_id: Option<String>,
    pub product_name: String,
    pub quantity: i64,
    pub unit_price: Money,
    pub discount: Money,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct Invoice {
    pub id: String,
    pub invoice_number: String,
    #[serde(rename = "type")]
    pub kind: InvoiceType,
    pub status: InvoiceStatus,
    pub customer: CustomerSnapshot,
    pub subtotal: Money,
    pub discount_type: DiscountType,
    /// Raw discount as entered (percent or major units).
    pub discount_value: f64,
    /// Computed discount amount.
    pub discount: Money,
    pub tax: Money,
    pub total: Money,
    pub notes: Option<String>,
    pub items: Vec<InvoiceItem>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Invoice {
    /// Checks the pay transition: only unpaid, uncancelled invoices.
    pub fn ensure_payable(&self) -> CoreResult<()> {
        let reason = match (self.kind, self.status) {
            (InvoiceType::Quotation, _) => "quotations cannot be paid",
            (_, InvoiceStatus::Paid) => "invoice is already paid",
            (_, InvoiceStatus::Cancelled) => "invoice is cancelled",
            _ => return Ok(()),
        };
        Err(CoreError::InvalidDocumentState {
            id: self.id.clone(),
            reason: reason.to_string(),
        })
    }

    /// Checks the quotation → invoice conversion.
    pub fn ensure_convertible(&self) -> CoreResult<()> {
        if self.kind != InvoiceType::Quotation {
            return Err(CoreError::InvalidDocumentState {
                id: self.id.clone(),
                reason: "only quotations can be converted".to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Invoice (input)
// =============================================================================

/// Customer part of an invoice payload: a reference, an inline snapshot,
/// or both (the reference wins).
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomerRefInput {
    pub id: Option<String>,
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceItemInput {
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub quantity: Option<i64>,
    pub unit_price: Option<Money>,
    pub discount: Option<Money>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InvoiceInput {
    pub invoice_number: Option<String>,
    #[serde(rename = "type")]
    pub kind: Option<InvoiceType>,
    pub status: Option<InvoiceStatus>,
    pub customer: Option<CustomerRefInput>,
    pub discount_type: Option<DiscountType>,
    pub discount_value: Option<f64>,
    pub tax: Option<Money>,
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<InvoiceItemInput>,
}

/// Where a document's customer snapshot comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum CustomerSelection {
    /// Copy name/email/phone from the live customer with this id.
    Live(String),
    /// Store these fields as given, with no reference.
    Inline(CustomerSnapshot),
}

/// A validated invoice payload.
#[derive(Debug, Clone, PartialEq)]
pub struct InvoiceDraft {
    pub invoice_number: Option<String>,
    /// `None` means "invoice" on create and "unchanged" on update.
    pub kind: Option<InvoiceType>,
    /// `None` means "draft" on create and "unchanged" on update.
    pub status: Option<InvoiceStatus>,
    pub customer: CustomerSelection,
    pub discount: Option<Discount>,
    pub tax: Money,
    pub notes: Option<String>,
    pub lines: Vec<LineDraft>,
}

impl InvoiceDraft {
    /// Discount kind + raw value as persisted.
    pub fn discount_parts(&self) -> (DiscountType, f64) {
        self.discount
            .map(|d| (d.kind, d.value))
            .unwrap_or((DiscountType::Fixed, 0.0))
    }
}

impl InvoiceInput {
    /// Validates the payload and applies line defaults (quantity 1).
    pub fn into_draft(self) -> ValidationResult<InvoiceDraft> {
        if let Some(number) = self.invoice_number.as_deref() {
            validate_optional_text("invoiceNumber", Some(number), MAX_NAME_LEN)?;
        }
        validate_optional_text("notes", self.notes.as_deref(), MAX_TEXT_LEN)?;

        let customer = customer_selection(self.customer)?;

        let discount = match (self.discount_type, self.discount_value) {
            (_, None) => None,
            (kind, Some(value)) => Some(Discount {
                kind: kind.unwrap_or_default(),
                value,
            }),
        };
        if let Some(d) = &discount {
            d.validate()?;
        }

        let tax = self.tax.unwrap_or_default();
        validate_non_negative("tax", tax)?;

        let lines = self
            .items
            .into_iter()
            .map(|item| {
                line_draft(
                    item.product_id,
                    item.product_name,
                    item.quantity,
                    item.unit_price,
                    item.discount,
                )
            })
            .collect::<ValidationResult<Vec<_>>>()?;

        Ok(InvoiceDraft {
            invoice_number: self.invoice_number.filter(|n| !n.trim().is_empty()),
            kind: self.kind,
            status: self.status,
            customer,
            discount,
            tax,
            notes: self.notes,
            lines,
        })
    }
}

fn customer_selection(input: Option<CustomerRefInput>) -> ValidationResult<CustomerSelection> {
    let input = input.unwrap_or_default();

    if let Some(id) = input.id.filter(|id| !id.trim().is_empty()) {
        return Ok(CustomerSelection::Live(id));
    }

    let name = input.name.unwrap_or_default();
    validate_optional_text("customer.name", Some(&name), MAX_NAME_LEN)?;

    Ok(CustomerSelection::Inline(CustomerSnapshot {
        id: None,
        name,
        email: input.email,
        phone: input.phone,
    }))
}

fn line_draft(
    product_id: Option<String>,
    product_name: Option<String>,
    quantity: Option<i64>,
    unit_amount: Option<Money>,
    discount: Option<Money>,
) -> ValidationResult<LineDraft> {
    let quantity = quantity.unwrap_or(1);
    validate_quantity(quantity)?;

    if let Some(amount) = unit_amount {
        validate_non_negative("unitPrice", amount)?;
    }
    let discount = discount.unwrap_or_default();
    validate_non_negative("discount", discount)?;

    let product_name = product_name.filter(|n| !n.trim().is_empty());
    if let Some(name) = product_name.as_deref() {
        require_text("productName", name, MAX_NAME_LEN)?;
    }

    Ok(LineDraft {
        product_id: product_id.filter(|id| !id.trim().is_empty()),
        product_name,
        quantity,
        unit_amount,
        discount,
    })
}

// =============================================================================
// Purchase Invoice
// =============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct SupplierSnapshot {
    pub id: Option<String>,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PurchaseItem {
    pub id: String,
    pub product_id: Option<String>,
    pub product_name: String,
    pub quantity: i64,
    pub unit_cost: Money,
    pub total: Money,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct PurchaseInvoice {
    pub id: String,
    pub invoice_number: String,
    pub supplier: SupplierSnapshot,
    pub status: PurchaseStatus,
    pub subtotal: Money,
    pub total: Money,
    pub notes: Option<String>,
    pub items: Vec<PurchaseItem>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplierRefInput {
    pub id: Option<String>,
    pub name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseItemInput {
    pub product_id: Option<String>,
    pub product_name: Option<String>,
    pub quantity: Option<i64>,
    pub unit_cost: Option<Money>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseInput {
    pub invoice_number: Option<String>,
    pub supplier: Option<SupplierRefInput>,
    pub status: Option<PurchaseStatus>,
    pub notes: Option<String>,
    #[serde(default)]
    pub items: Vec<PurchaseItemInput>,
}

/// Header-only purchase update. Items are fixed once stock has moved.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PurchaseHeaderInput {
    pub supplier: Option<SupplierRefInput>,
    pub status: Option<PurchaseStatus>,
    pub notes: Option<String>,
}

/// Where a purchase's supplier snapshot comes from.
#[derive(Debug, Clone, PartialEq)]
pub enum SupplierSelection {
    Live(String),
    Inline(SupplierSnapshot),
}

/// A validated purchase payload (manual or one grouped CSV document).
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseDraft {
    pub invoice_number: Option<String>,
    pub supplier: SupplierSelection,
    pub status: PurchaseStatus,
    pub notes: Option<String>,
    pub lines: Vec<LineDraft>,
}

impl PurchaseInput {
    pub fn into_draft(self) -> ValidationResult<PurchaseDraft> {
        validate_optional_text("invoiceNumber", self.invoice_number.as_deref(), MAX_NAME_LEN)?;
        validate_optional_text("notes", self.notes.as_deref(), MAX_TEXT_LEN)?;

        let supplier = supplier_selection(self.supplier)?;

        let lines = self
            .items
            .into_iter()
            .map(|item| {
                line_draft(
                    item.product_id,
                    item.product_name,
                    item.quantity,
                    item.unit_cost,
                    None,
                )
            })
            .collect::<ValidationResult<Vec<_>>>()?;

        Ok(PurchaseDraft {
            invoice_number: self.invoice_number.filter(|n| !n.trim().is_empty()),
            supplier,
            status: self.status.unwrap_or(PurchaseStatus::Pending),
            notes: self.notes,
            lines,
        })
    }
}

/// Validated header update for a purchase.
#[derive(Debug, Clone, PartialEq)]
pub struct PurchaseHeaderDraft {
    pub supplier: Option<SupplierSelection>,
    pub status: Option<PurchaseStatus>,
    pub notes: Option<String>,
}

impl PurchaseHeaderInput {
    pub fn into_draft(self) -> ValidationResult<PurchaseHeaderDraft> {
        validate_optional_text("notes", self.notes.as_deref(), MAX_TEXT_LEN)?;
        let supplier = match self.supplier {
            Some(s) => Some(supplier_selection(Some(s))?),
            None => None,
        };
        Ok(PurchaseHeaderDraft {
            supplier,
            status: self.status,
            notes: self.notes,
        })
    }
}

fn supplier_selection(input: Option<SupplierRefInput>) -> ValidationResult<SupplierSelection> {
    let input = input.unwrap_or_default();

    if let Some(id) = input.id.filter(|id| !id.trim().is_empty()) {
        return Ok(SupplierSelection::Live(id));
    }

    let name = input.name.unwrap_or_default();
    require_text("supplier.name", &name, MAX_NAME_LEN)?;
    Ok(SupplierSelection::Inline(SupplierSnapshot { id: None, name }))
}

// =============================================================================
// Document Numbers
// =============================================================================

/// Timestamp-based document number, e.g. `INV-1718000000000`.
pub fn document_number(prefix: &str, at: DateTime<Utc>) -> String {
    format!("{}-{}", prefix, at.timestamp_millis())
}

/// Number prefix for a newly issued sales document.
pub fn invoice_prefix(kind: InvoiceType) -> &'static str {
    match kind {
        InvoiceType::Invoice => "INV",
        InvoiceType::Quotation => "QUO",
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn line(qty: i64, price: i64, discount: i64) -> PricedLine {
        PricedLine {
            product_id: None,
            product_name: "Item".to_string(),
            quantity: qty,
            unit_price: Money::from_cents(price),
            discount: Money::from_cents(discount),
        }
    }

    #[test]
    fn test_percentage_discount_scenario() {
        let lines = vec![line(1, 15000, 0), line(1, 5000, 0)];
        let discount = Discount {
            kind: DiscountType::Percentage,
            value: 10.0,
        };
        let totals = DocumentTotals::compute(&lines, Some(discount), Money::zero()).unwrap();

        assert_eq!(totals.subtotal.cents(), 20000);
        assert_eq!(totals.discount.cents(), 2000);
        assert_eq!(totals.total.cents(), 18000);
    }

    #[test]
    fn test_total_identity_with_tax() {
        let lines = vec![line(3, 999, 100)];
        let discount = Discount {
            kind: DiscountType::Fixed,
            value: 2.5,
        };
        let totals = DocumentTotals::compute(&lines, Some(discount), Money::from_cents(150)).unwrap();

        assert_eq!(totals.subtotal.cents(), 2897);
        assert_eq!(totals.discount.cents(), 250);
        assert_eq!(totals.total, totals.subtotal - totals.discount + totals.tax);
    }

    #[test]
    fn test_line_total_never_negative() {
        assert_eq!(line(1, 100, 500).total().unwrap(), Money::zero());
    }

    #[test]
    fn test_oversized_amounts_rejected() {
        let input: InvoiceInput = serde_json::from_str(
            r#"{"items": [{"productName": "X", "unitPrice": "90000000000000000", "quantity": 2}]}"#,
        )
        .unwrap();
        let lines: Vec<PricedLine> = input
            .into_draft()
            .unwrap()
            .lines
            .into_iter()
            .map(|l| l.resolve(None, false))
            .collect();
        assert!(matches!(
            DocumentTotals::compute(&lines, None, Money::zero()),
            Err(ValidationError::OutOfRange { .. })
        ));

        let max = i64::MAX / 2 + 1;
        let lines = vec![line(1, max, 0), line(1, max, 0)];
        assert!(DocumentTotals::for_purchase(&lines).is_err());

        let lines = vec![line(1, i64::MAX, 0)];
        assert!(DocumentTotals::compute(&lines, None, Money::from_cents(1)).is_err());
    }

    #[test]
    fn test_fixed_discount_clamped_to_subtotal() {
        let lines = vec![line(1, 1000, 0)];
        let discount = Discount {
            kind: DiscountType::Fixed,
            value: 50.0,
        };
        let totals = DocumentTotals::compute(&lines, Some(discount), Money::from_cents(80)).unwrap();
        assert_eq!(totals.discount.cents(), 1000);
        assert_eq!(totals.total.cents(), 80);
    }

    #[test]
    fn test_input_ignores_caller_totals() {
        let input: InvoiceInput = serde_json::from_str(
            r#"{
                "customer": {"name": "Walk-in"},
                "subtotal": 1, "total": 1, "discount": 99,
                "items": [{"productName": "Desk", "unitPrice": 100}]
            }"#,
        )
        .unwrap();
        let draft = input.into_draft().unwrap();

        assert_eq!(draft.kind.unwrap_or_default(), InvoiceType::Invoice);
        assert_eq!(draft.status.unwrap_or_default(), InvoiceStatus::Draft);
        assert_eq!(draft.lines[0].quantity, 1);
        assert!(draft.discount.is_none());
    }

    #[test]
    fn test_input_rejects_bad_lines() {
        let input: InvoiceInput =
            serde_json::from_str(r#"{"items": [{"productName": "Desk", "quantity": 0}]}"#).unwrap();
        assert!(input.into_draft().is_err());

        let input: InvoiceInput = serde_json::from_str(
            r#"{"discountType": "percentage", "discountValue": 120, "items": []}"#,
        )
        .unwrap();
        assert!(input.into_draft().is_err());
    }

    #[test]
    fn test_customer_reference_wins() {
        let input: InvoiceInput =
            serde_json::from_str(r#"{"customer": {"id": "c1", "name": "Stale"}}"#).unwrap();
        let draft = input.into_draft().unwrap();
        assert_eq!(draft.customer, CustomerSelection::Live("c1".to_string()));
    }

    #[test]
    fn test_line_resolution_prefers_explicit_values() {
        let live = LiveProduct {
            name: "Widget".to_string(),
            price: Money::from_cents(10000),
            cost_price: Money::from_cents(6000),
        };

        let draft = LineDraft {
            product_id: Some("p1".to_string()),
            product_name: None,
            quantity: 2,
            unit_amount: None,
            discount: Money::zero(),
        };
        let sale = draft.clone().resolve(Some(&live), false);
        assert_eq!(sale.product_name, "Widget");
        assert_eq!(sale.unit_price.cents(), 10000);

        let purchase = draft.resolve(Some(&live), true);
        assert_eq!(purchase.unit_price.cents(), 6000);

        let explicit = LineDraft {
            product_id: None,
            product_name: None,
            quantity: 1,
            unit_amount: Some(Money::from_cents(5)),
            discount: Money::zero(),
        }
        .resolve(None, false);
        assert_eq!(explicit.product_name, UNKNOWN_PRODUCT);
        assert_eq!(explicit.unit_price.cents(), 5);
    }

    #[test]
    fn test_purchase_requires_supplier() {
        let input: PurchaseInput = serde_json::from_str(r#"{"items": []}"#).unwrap();
        assert!(input.into_draft().is_err());

        let input: PurchaseInput =
            serde_json::from_str(r#"{"supplier": {"name": "Acme"}, "items": []}"#).unwrap();
        let draft = input.into_draft().unwrap();
        assert_eq!(draft.status, PurchaseStatus::Pending);
    }

    #[test]
    fn test_document_states() {
        let mut invoice = Invoice {
            id: "i1".to_string(),
            invoice_number: "QUO-1".to_string(),
            kind: InvoiceType::Quotation,
            status: InvoiceStatus::Draft,
            customer: CustomerSnapshot::default(),
            subtotal: Money::zero(),
            discount_type: DiscountType::Fixed,
            discount_value: 0.0,
            discount: Money::zero(),
            tax: Money::zero(),
            total: Money::zero(),
            notes: None,
            items: Vec::new(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        assert!(invoice.ensure_convertible().is_ok());
        assert!(invoice.ensure_payable().is_err());

        invoice.kind = InvoiceType::Invoice;
        assert!(invoice.ensure_convertible().is_err());
        assert!(invoice.ensure_payable().is_ok());

        invoice.status = InvoiceStatus::Paid;
        assert!(invoice.ensure_payable().is_err());
    }

    #[test]
    fn test_invoice_wire_shape() {
        let json = serde_json::to_value(InvoiceType::Quotation).unwrap();
        assert_eq!(json, "quotation");
        assert_eq!(document_number("INV", DateTime::from_timestamp_millis(42).unwrap()), "INV-42");
    }
}
