//! # Repository Module
//!
//! Database repository implementations for Kasa POS.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern Explained                         │
//! │                                                                         │
//! │  The Repository pattern abstracts database access behind a clean API.  │
//! │                                                                         │
//! │  Service / HTTP handler                                                │
//! │       │                                                                 │
//! │       │  db.products().get_by_id(&id)                                  │
//! │       │  ↓                                                              │
//! │       ▼                                                                 │
//! │  ProductRepository                                                     │
//! │  ├── get_by_id(&self, id)                                              │
//! │  ├── insert(&self, product)                                            │
//! │  └── decrement_for_sale(conn, ...)  ← atomic stock + log append        │
//! │       │                                                                 │
//! │       │  SQL Query                                                      │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! │                                                                         │
//! │  Benefits:                                                              │
//! │  • Clean separation of concerns                                        │
//! │  • SQL is isolated in one place                                        │
//! │  • The stock/status conditional updates live next to their tables      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Methods that must compose into a larger database transaction (stock
//! decrement + log append, status compare-and-set) take an explicit
//! `&mut SqliteConnection` instead of using the pool, so the caller
//! controls the commit/rollback boundary.
//!
//! ## Available Repositories
//!
//! - [`product::ProductRepository`] - Product CRUD and atomic stock updates
//! - [`category::CategoryRepository`] - Category CRUD
//! - [`transaction::TransactionRepository`] - Transactions, items, status CAS
//! - [`inventory::InventoryLogRepository`] - Stock audit trail reads
//! - [`notification::NotificationRepository`] - Alert storage
//! - [`user::UserRepository`] - Cashier/admin records
//! - [`report::ReportRepository`] - Read-only aggregation

pub mod category;
pub mod inventory;
pub mod notification;
pub mod product;
pub mod report;
pub mod transaction;
pub mod user;
