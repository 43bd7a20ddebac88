//! # Domain Types
//!
//! Core domain types used throughout Kasa POS.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Product      │   │  Transaction    │   │  InventoryLog   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id (UUID)      │   │  id (UUID)      │   │  product_id     │       │
//! │  │  sku (business) │   │  number         │   │  quantity_delta │       │
//! │  │  stock          │   │  payment_status │   │  prev/new stock │       │
//! │  │  min_stock      │   │  total_cents    │   │  log_type       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │  PaymentMethod  │   │  PaymentStatus  │   │  Notification   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Cash           │   │  Pending        │   │  user_id        │       │
//! │  │  Qris           │   │  Paid           │   │  kind           │       │
//! │  │  Ewallet        │   │  Failed         │   │  is_read        │       │
//! │  │  VirtualAccount │   │  Expired        │   │  metadata       │       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Dual-Key Identity Pattern
//! Every entity has:
//! - `id`: UUID v4 - immutable, used for database relations
//! - Business ID: (sku, transaction number, etc.) - human-readable

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::money::Money;

// =============================================================================
// Users
// =============================================================================

/// User role. Authentication is external; roles only scope notifications
/// and identify cashiers on transactions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Cashier,
}

/// A user of the system (cashier or admin).
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct User {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub is_active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Catalog
// =============================================================================

/// A product category. Products reference exactly one category.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Category {
    pub id: String,
    /// Unique display name.
    pub name: String,
    pub description: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// A product available for sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Product {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Stock Keeping Unit - business identifier, unique.
    pub sku: String,

    /// Display name shown to cashier and on the dashboard.
    pub name: String,

    /// Optional description for product details.
    pub description: Option<String>,

    /// Category this product belongs to.
    pub category_id: String,

    /// Selling price in cents (smallest currency unit).
    pub price_cents: i64,

    /// Cost in cents (for profit margin reporting).
    pub cost_cents: i64,

    /// Current stock level. Mutable counter; every change is paired with
    /// an InventoryLog row in the same database transaction.
    pub stock: i64,

    /// Low-stock threshold. Stock at or below this value raises an alert.
    pub min_stock: i64,

    /// Whether product is active (soft delete).
    pub is_active: bool,

    /// When the product was created.
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,

    /// When the product was last updated.
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the selling price as a Money type.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Checks whether the current stock is at or below the threshold.
    #[inline]
    pub fn is_low_stock(&self) -> bool {
        self.stock <= self.min_stock
    }
}

// =============================================================================
// Payment Method
// =============================================================================

/// How a transaction is paid.
///
/// Cash settles immediately at the till. The digital methods all go
/// through the payment gateway and start life as PENDING.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash payment, settled at the counter.
    Cash,
    /// QR-code payment via the gateway.
    Qris,
    /// E-wallet payment via the gateway.
    Ewallet,
    /// Bank virtual-account transfer via the gateway.
    VirtualAccount,
}

impl PaymentMethod {
    /// Cash settles at the till; everything else needs the gateway.
    #[inline]
    pub const fn is_cash(&self) -> bool {
        matches!(self, PaymentMethod::Cash)
    }

    /// Returns the snake_case database/API representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Qris => "qris",
            PaymentMethod::Ewallet => "ewallet",
            PaymentMethod::VirtualAccount => "virtual_account",
        }
    }
}

// =============================================================================
// Payment Status
// =============================================================================

/// The payment status of a transaction.
///
/// Lifecycle: `Pending → Paid | Failed | Expired`. Cash transactions are
/// created Paid and never transition. See [`crate::payment::transition`]
/// for the only sanctioned way to move between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Awaiting gateway confirmation (digital methods only).
    Pending,
    /// Payment confirmed. Terminal.
    Paid,
    /// Payment failed at the gateway. Terminal.
    Failed,
    /// Invoice expired unpaid. Terminal.
    Expired,
}

impl PaymentStatus {
    /// Returns the lowercase database/API representation.
    pub const fn as_str(&self) -> &'static str {
        match self {
            PaymentStatus::Pending => "pending",
            PaymentStatus::Paid => "paid",
            PaymentStatus::Failed => "failed",
            PaymentStatus::Expired => "expired",
        }
    }

    /// Paid, Failed and Expired are terminal; only Pending can move.
    #[inline]
    pub const fn is_terminal(&self) -> bool {
        !matches!(self, PaymentStatus::Pending)
    }
}

// =============================================================================
// Transaction
// =============================================================================

/// A sale transaction.
///
/// Created once at checkout; only payment-related fields
/// (`payment_status`, `gateway_invoice_id`, `gateway_invoice_url`,
/// `paid_at`) are ever updated afterward. Items and totals are frozen.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Transaction {
    pub id: String,
    /// Human-readable unique number (time part + random suffix).
    pub number: String,
    pub subtotal_cents: i64,
    pub tax_cents: i64,
    pub discount_cents: i64,
    /// Final amount: subtotal + tax - discount.
    pub total_cents: i64,
    pub payment_method: PaymentMethod,
    pub payment_status: PaymentStatus,
    /// Invoice id assigned by the payment gateway, if initiated.
    pub gateway_invoice_id: Option<String>,
    /// Hosted checkout URL returned by the gateway, if initiated.
    pub gateway_invoice_url: Option<String>,
    pub cashier_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "Option<String>")]
    pub paid_at: Option<DateTime<Utc>>,
}

impl Transaction {
    /// Returns the final amount as Money.
    #[inline]
    pub fn total(&self) -> Money {
        Money::from_cents(self.total_cents)
    }
}

// =============================================================================
// Transaction Item
// =============================================================================

/// A line item in a transaction.
/// Uses snapshot pattern to freeze product data at time of sale.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct TransactionItem {
    pub id: String,
    pub transaction_id: String,
    pub product_id: String,
    /// SKU at time of sale (frozen).
    pub sku_snapshot: String,
    /// Product name at time of sale (frozen).
    pub name_snapshot: String,
    /// Unit price in cents at time of sale (frozen).
    pub unit_price_cents: i64,
    /// Quantity sold.
    pub quantity: i64,
    /// Line total (unit_price × quantity).
    pub line_total_cents: i64,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Inventory Log
// =============================================================================

/// Why a stock level changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "lowercase")]
pub enum InventoryLogType {
    /// Stock left the store through a sale.
    Sale,
    /// Stock was replenished (adjustment with positive delta).
    Restock,
    /// Manual correction (zero or negative delta).
    Adjustment,
    /// Stock came back through a customer return.
    Return,
}

/// One entry in the append-only stock audit trail.
///
/// Never updated or deleted. `previous_stock` and `new_stock` snapshot the
/// counter around the change so the trail is readable without replaying.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct InventoryLog {
    pub id: String,
    pub product_id: String,
    pub log_type: InventoryLogType,
    /// Signed change applied to stock (negative for sales).
    pub quantity_delta: i64,
    pub previous_stock: i64,
    pub new_stock: i64,
    pub reason: Option<String>,
    /// User who caused the change (cashier for sales, admin for adjustments).
    pub actor_id: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Notification
// =============================================================================

/// Category of a user-facing alert.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewOrder,
    PaymentReceived,
    PaymentFailed,
    LowStock,
    InventoryUpdate,
}

/// A user-facing alert created as a side effect of other operations.
///
/// Write-once; the owner may mark it read or delete it.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct Notification {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub kind: NotificationKind,
    pub is_read: bool,
    /// Optional structured payload, JSON-encoded
    /// (e.g. `{"transactionId": "..."}`).
    pub metadata: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn product(stock: i64, min_stock: i64) -> Product {
        Product {
            id: "p1".to_string(),
            sku: "SKU-1".to_string(),
            name: "Test".to_string(),
            description: None,
            category_id: "c1".to_string(),
            price_cents: 10000,
            cost_cents: 7000,
            stock,
            min_stock,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_low_stock_boundary() {
        // At the threshold: low
        assert!(product(5, 5).is_low_stock());
        // One above: not low
        assert!(!product(6, 5).is_low_stock());
        // Below: low
        assert!(product(0, 5).is_low_stock());
    }

    #[test]
    fn test_payment_method_is_cash() {
        assert!(PaymentMethod::Cash.is_cash());
        assert!(!PaymentMethod::Qris.is_cash());
        assert!(!PaymentMethod::Ewallet.is_cash());
        assert!(!PaymentMethod::VirtualAccount.is_cash());
    }

    #[test]
    fn test_payment_status_terminal() {
        assert!(!PaymentStatus::Pending.is_terminal());
        assert!(PaymentStatus::Paid.is_terminal());
        assert!(PaymentStatus::Failed.is_terminal());
        assert!(PaymentStatus::Expired.is_terminal());
    }
}
