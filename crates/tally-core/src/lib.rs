//! # tally-core: Pure Business Logic for Tally
//!
//! Domain types and rules of the Tally back office, free of I/O. The
//! database and HTTP layers call into this crate; it never calls out.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Architecture                               │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                  tally-server (axum REST API)                   │   │
//! │  │    auth gate ──► handlers ──► multipart uploads ──► ApiError    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ tally-core (THIS CRATE) ★                       │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌──────────┐ ┌──────────┐          │   │
//! │  │   │  money   │ │ document │ │  access  │ │  import  │          │   │
//! │  │   │  Money   │ │ drafts   │ │ roles    │ │ csv rows │          │   │
//! │  │   │ discount │ │ totals   │ │ authorize│ │ grouping │          │   │
//! │  │   └──────────┘ └──────────┘ └──────────┘ └──────────┘          │   │
//! │  │                                                                 │   │
//! │  │   NO DATABASE • NO NETWORK • NO FILESYSTEM                      │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                  tally-db (SQLite via sqlx)                     │   │
//! │  │       repositories, atomic engine paths, backup/restore         │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Integer-cent `Money` with a decimal wire format
//! - [`types`] - Catalog records (products, customers, suppliers, expenses)
//! - [`document`] - Invoices, quotations, purchases and their totals
//! - [`access`] - Roles, permission resolution, `authorize`
//! - [`import`] - CSV parsing and purchase grouping
//! - [`validation`] - Shared input checks
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use tally_core::Money;
//!
//! let price = Money::parse_decimal("150.00").unwrap();
//! let discount = price.percentage(1000); // 10%
//! assert_eq!((price - discount).to_string(), "135.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod access;
pub mod document;
pub mod error;
pub mod import;
pub mod money;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use access::{authorize, PermissionSet, ADMIN_ROLE_NAME, ALL_PERMISSIONS};
pub use document::{
    DiscountType, DocumentTotals, Invoice, InvoiceItem, InvoiceStatus, InvoiceType,
    PurchaseInvoice, PurchaseItem, PurchaseStatus,
};
pub use error::{CoreError, CoreResult, ValidationError};
pub use money::Money;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Lifetime of an issued session token.
pub const SESSION_LIFETIME_HOURS: i64 = 24;

/// Largest accepted product image upload.
pub const MAX_IMAGE_BYTES: usize = 5 * 1024 * 1024;
