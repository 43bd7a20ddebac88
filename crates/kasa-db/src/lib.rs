//! # kasa-db: Database Layer for Kasa POS
//!
//! This crate provides database access for the Kasa POS system.
//! It uses SQLite for local storage with sqlx for async operations.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Kasa POS Data Flow                               │
//! │                                                                         │
//! │  HTTP handler (create_transaction, webhook, ...)                       │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                      kasa-db (THIS CRATE)                       │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌───────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ (product.rs,  │    │  (embedded)  │  │   │
//! │  │   │               │    │  transaction, │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│  inventory,   │    │ 001_init.sql │  │   │
//! │  │   │ Management    │    │  ...)         │    │              │  │   │
//! │  │   └───────────────┘    └───────────────┘    └──────────────┘  │   │
//! │  │                                                                 │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite database file (WAL mode, foreign keys on)                      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool creation and configuration
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`repository`] - Repository implementations (product, transaction, etc.)
//!
//! ## The Two Shared Counters
//!
//! Product stock and transaction payment status are the only mutable shared
//! state in the system. Both are guarded here by conditional UPDATEs:
//!
//! - stock: `UPDATE products SET stock = stock - N WHERE id = ? AND stock >= N`
//!   (decrement-with-floor-check, paired with the inventory-log append in
//!   the same database transaction)
//! - status: `UPDATE transactions SET payment_status = 'paid'
//!   WHERE id = ? AND payment_status <> 'paid'`
//!   (compare-and-set; the caller runs PAID side effects only when exactly
//!   one row was affected)

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
pub use repository::category::CategoryRepository;
pub use repository::inventory::InventoryLogRepository;
pub use repository::notification::NotificationRepository;
pub use repository::product::{ProductRepository, StockChange};
pub use repository::report::ReportRepository;
pub use repository::transaction::TransactionRepository;
pub use repository::user::UserRepository;
