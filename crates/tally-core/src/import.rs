//! # Tabular Import
//!
//! Parses uploaded CSV files into validated inputs before anything touches
//! the store. The whole file is read first; the first bad row aborts the
//! import with its 1-based line number.
//!
//! ## Pipeline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  CSV bytes ──► csv::Reader (headers, trimmed fields)                    │
//! │                    │                                                    │
//! │        ┌───────────┼────────────────────┐                               │
//! │        ▼           ▼                    ▼                               │
//! │   ProductInput  CustomerInput     PurchaseRow ──► group by number       │
//! │        │           │                    │        (first-seen order)     │
//! │        ▼           ▼                    ▼                               │
//! │   one atomic unit per file in tally-db (all rows or nothing)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::collections::HashMap;
use std::fmt;
use std::io::Read;

use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::document::{
    document_number, LineDraft, PurchaseDraft, PurchaseStatus, SupplierSelection,
    SupplierSnapshot,
};
use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::{CustomerInput, CustomerType, ProductInput};
use crate::validation::{validate_non_negative, validate_quantity};

/// Supplier recorded for imported purchases without a supplier name.
pub const IMPORTED_SUPPLIER: &str = "Imported Supplier";

/// Notes recorded for imported purchases without notes.
pub const IMPORTED_NOTES: &str = "Imported via CSV";

/// Number prefix shared by imported purchase rows lacking a number.
pub const IMPORTED_PURCHASE_PREFIX: &str = "PUR-IMP";

/// Which entity an uploaded file feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportKind {
    Products,
    Customers,
    Purchases,
}

impl fmt::Display for ImportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ImportKind::Products => "products",
            ImportKind::Customers => "customers",
            ImportKind::Purchases => "purchases",
        };
        f.write_str(name)
    }
}

// =============================================================================
// Row Shapes
// =============================================================================

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProductRow {
    name: Option<String>,
    sku: Option<String>,
    category: Option<String>,
    price: Option<String>,
    cost_price: Option<String>,
    quantity: Option<String>,
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomerRow {
    name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    address: Option<String>,
    customer_type: Option<String>,
    company_name: Option<String>,
    tax_number: Option<String>,
    details: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PurchaseRow {
    invoice_number: Option<String>,
    supplier_name: Option<String>,
    status: Option<String>,
    notes: Option<String>,
    product_id: Option<String>,
    product_name: Option<String>,
    quantity: Option<String>,
    unit_cost: Option<String>,
}

// =============================================================================
// Parsers
// =============================================================================

/// Parses a products file into validated inputs.
///
/// Columns: `name` (required), `sku`, `category`, `price`, `costPrice`,
/// `quantity`, `description`.
pub fn parse_products<R: Read>(source: R) -> CoreResult<Vec<ProductInput>> {
    read_rows(source, |line, row: ProductRow| {
        let input = ProductInput {
            name: row.name.unwrap_or_default(),
            sku: non_blank(row.sku),
            category: non_blank(row.category),
            price: parse_money(line, "price", row.price)?,
            cost_price: parse_money(line, "costPrice", row.cost_price)?,
            quantity: parse_integer(line, "quantity", row.quantity)?,
            description: non_blank(row.description),
            image_url: None,
        };
        input.validate().map_err(|e| import_error(line, e))?;
        Ok(input)
    })
}

/// Parses a customers file into validated inputs.
pub fn parse_customers<R: Read>(source: R) -> CoreResult<Vec<CustomerInput>> {
    read_rows(source, |line, row: CustomerRow| {
        let customer_type = match non_blank(row.customer_type) {
            None => CustomerType::default(),
            Some(raw) => CustomerType::parse(&raw).ok_or_else(|| CoreError::Import {
                line,
                reason: format!("customerType must be individual or company, got {raw:?}"),
            })?,
        };

        let input = CustomerInput {
            name: row.name.unwrap_or_default(),
            email: non_blank(row.email),
            phone: non_blank(row.phone),
            address: non_blank(row.address),
            customer_type,
            company_name: non_blank(row.company_name),
            tax_number: non_blank(row.tax_number),
            details: non_blank(row.details),
        };
        input.validate().map_err(|e| import_error(line, e))?;
        Ok(input)
    })
}

/// Parses a purchases file and groups its rows into documents.
///
/// Rows sharing an `invoiceNumber` become one document; groups keep the
/// order in which their number first appears. Rows with no number all
/// share one generated `PUR-IMP-{millis}` number taken from `now`.
/// Header fields (supplier, status, notes) come from a group's first row.
///
/// ## Example
/// ```rust
/// use chrono::Utc;
/// use tally_core::import::parse_purchases;
///
/// let csv = "invoiceNumber,supplierName,productName,quantity,unitCost\n\
///            P-1,Acme,Bolt,10,0.25\n\
///            P-1,Acme,Nut,20,0.10\n\
///            P-2,Globex,Washer,5,0.05\n";
/// let drafts = parse_purchases(csv.as_bytes(), Utc::now()).unwrap();
/// assert_eq!(drafts.len(), 2);
/// assert_eq!(drafts[0].lines.len(), 2);
/// ```
pub fn parse_purchases<R: Read>(source: R, now: DateTime<Utc>) -> CoreResult<Vec<PurchaseDraft>> {
    let generated = document_number(IMPORTED_PURCHASE_PREFIX, now);

    let rows = read_rows(source, |line, row: PurchaseRow| {
        let status = match non_blank(row.status) {
            None => PurchaseStatus::Received,
            Some(raw) => PurchaseStatus::parse(&raw).ok_or_else(|| CoreError::Import {
                line,
                reason: format!("status must be pending, received or cancelled, got {raw:?}"),
            })?,
        };

        let quantity = parse_integer(line, "quantity", row.quantity)?.ok_or_else(|| {
            CoreError::Import {
                line,
                reason: "quantity is required".to_string(),
            }
        })?;
        validate_quantity(quantity).map_err(|e| import_error(line, e))?;

        let unit_cost = parse_money(line, "unitCost", row.unit_cost)?;
        if let Some(cost) = unit_cost {
            validate_non_negative("unitCost", cost).map_err(|e| import_error(line, e))?;
        }

        let line_draft = LineDraft {
            product_id: non_blank(row.product_id),
            product_name: non_blank(row.product_name),
            quantity,
            unit_amount: unit_cost,
            discount: Money::zero(),
        };

        Ok((
            non_blank(row.invoice_number).unwrap_or_else(|| generated.clone()),
            non_blank(row.supplier_name),
            status,
            non_blank(row.notes),
            line_draft,
        ))
    })?;

    let mut order: HashMap<String, usize> = HashMap::new();
    let mut drafts: Vec<PurchaseDraft> = Vec::new();

    for (number, supplier, status, notes, line) in rows {
        if let Some(&idx) = order.get(&number) {
            drafts[idx].lines.push(line);
            continue;
        }
        order.insert(number.clone(), drafts.len());
        drafts.push(PurchaseDraft {
            invoice_number: Some(number),
            supplier: SupplierSelection::Inline(SupplierSnapshot {
                id: None,
                name: supplier.unwrap_or_else(|| IMPORTED_SUPPLIER.to_string()),
            }),
            status,
            notes: Some(notes.unwrap_or_else(|| IMPORTED_NOTES.to_string())),
            lines: vec![line],
        });
    }

    Ok(drafts)
}

// =============================================================================
// Helpers
// =============================================================================

/// Reads every record, handing each to `convert` with its 1-based line.
fn read_rows<R, T, U, F>(source: R, mut convert: F) -> CoreResult<Vec<U>>
where
    R: Read,
    T: for<'de> Deserialize<'de>,
    F: FnMut(usize, T) -> CoreResult<U>,
{
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(source);

    let headers = reader
        .headers()
        .map_err(|e| csv_error(1, e))?
        .clone();

    let mut out = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        // Header is line 1; fall back to the record index if csv has no position.
        let fallback = idx + 2;
        let record = record.map_err(|e| csv_error(fallback, e))?;
        let line = record
            .position()
            .map(|p| p.line() as usize)
            .unwrap_or(fallback);

        if record.iter().all(str::is_empty) {
            continue;
        }

        let row: T = record
            .deserialize(Some(&headers))
            .map_err(|e| csv_error(line, e))?;
        out.push(convert(line, row)?);
    }

    Ok(out)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn parse_money(line: usize, field: &str, raw: Option<String>) -> CoreResult<Option<Money>> {
    match non_blank(raw) {
        None => Ok(None),
        Some(raw) => Money::parse_decimal(&raw)
            .map(Some)
            .map_err(|_| CoreError::Import {
                line,
                reason: format!("{field} is not a valid amount: {raw:?}"),
            }),
    }
}

fn parse_integer(line: usize, field: &str, raw: Option<String>) -> CoreResult<Option<i64>> {
    match non_blank(raw) {
        None => Ok(None),
        Some(raw) => raw.parse::<i64>().map(Some).map_err(|_| CoreError::Import {
            line,
            reason: format!("{field} must be a whole number, got {raw:?}"),
        }),
    }
}

fn import_error(line: usize, err: impl fmt::Display) -> CoreError {
    CoreError::Import {
        line,
        reason: err.to_string(),
    }
}

fn csv_error(line: usize, err: csv::Error) -> CoreError {
    let line = err
        .position()
        .map(|p| p.line() as usize)
        .unwrap_or(line);
    import_error(line, err)
}

// =============================================================================
// Unit Tests
// =============================================================================
