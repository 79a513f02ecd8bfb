//! # tally-db: Database Layer for Tally
//!
//! SQLite persistence for the Tally back office, built on sqlx.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Tally Data Flow                                  │
//! │                                                                         │
//! │  axum handler (POST /purchases)                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     tally-db (THIS CRATE)                       │    │
//! │  │                                                                 │    │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐   │    │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │   │    │
//! │  │   │   (pool.rs)   │    │                │    │  (embedded)  │   │    │
//! │  │   │               │    │ InvoiceRepo    │    │ 001_schema   │   │    │
//! │  │   │ SqlitePool    │◄───│ PurchaseRepo   │    │ 002_seed     │   │    │
//! │  │   │ Connection    │    │ ImportRepo     │    │              │   │    │
//! │  │   │ Management    │    │ BackupRepo ... │    │              │   │    │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘   │    │
//! │  │                                                                 │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐    │
//! │  │                     SQLite Database (data/tally.db)             │    │
//! │  └─────────────────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - One repository per aggregate
//!
//! ## Usage
//!
//! ```rust,ignore
//! use tally_db::{Database, DbConfig};
//!
//! let db = Database::new(DbConfig::new("data/tally.db")).await?;
//!
//! let invoice = db.invoices().create(draft).await?;
//! let paid = db.invoices().pay(&invoice.id, true).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod error;
pub mod migrations;
pub mod pool;
pub mod repository;

// =============================================================================
// Re-exports
// =============================================================================

pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};

// Repository re-exports for convenience
pub use repository::backup::{BackupRepository, RestoreSummary, Snapshot, BACKUP_TABLES};
pub use repository::customer::CustomerRepository;
pub use repository::expense::ExpenseRepository;
pub use repository::import::ImportRepository;
pub use repository::invoice::InvoiceRepository;
pub use repository::product::ProductRepository;
pub use repository::purchase::PurchaseRepository;
pub use repository::role::RoleRepository;
pub use repository::supplier::SupplierRepository;
pub use repository::user::{StoredCredentials, UserRepository};
