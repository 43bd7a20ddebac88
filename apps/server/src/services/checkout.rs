//! # Checkout Service
//!
//! Transaction creation.
//!
//! ## Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Checkout Flow                                    │
//! │                                                                         │
//! │  validate input (non-empty items, positive quantities, known cashier)  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  snapshot products → line items + totals (integer cents)               │
//! │       │                                                                 │
//! │       ├── CASH ──────────────────────────────┐                         │
//! │       │                                      ▼                         │
//! │       │                        ONE database transaction:               │
//! │       │                        insert header + items                   │
//! │       │                        + floor-checked stock decrement         │
//! │       │                        + SALE inventory log per item           │
//! │       │                        status = PAID from the start            │
//! │       │                                      │                         │
//! │       └── DIGITAL ───► insert header + items, status = PENDING        │
//! │                        (stock moves later, on the PAID transition)     │
//! │                                      │                                 │
//! │                                      ▼                                 │
//! │            after commit: new-order broadcast (always, best-effort)    │
//! │                          low-stock alerts for crossed thresholds      │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Insufficient stock on the cash path rolls the whole checkout back:
//! no transaction row, no partial decrements, no logs.

use chrono::Utc;
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ApiError;
use crate::services::notify;
use crate::state::AppState;
use kasa_core::money::{final_amount, Money};
use kasa_core::validation::{validate_item_count, validate_quantity};
use kasa_core::{
    CoreError, NotificationKind, PaymentMethod, PaymentStatus, Role, Transaction, TransactionItem,
};
use kasa_db::{ProductRepository, StockChange, TransactionRepository};

/// One requested line item.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutItemInput {
    pub product_id: String,
    pub quantity: i64,
}

/// Checkout request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutInput {
    pub items: Vec<CheckoutItemInput>,
    pub payment_method: PaymentMethod,
    pub cashier_id: String,
    #[serde(default)]
    pub tax_cents: i64,
    #[serde(default)]
    pub discount_cents: i64,
}

/// A created transaction with its line items.
#[derive(Debug, Clone)]
pub struct CheckoutOutcome {
    pub transaction: Transaction,
    pub items: Vec<TransactionItem>,
}

/// Creates a transaction from a list of line items.
///
/// Cash settles immediately: the status is PAID from the start and the
/// stock decrements commit atomically with the transaction insert. Digital
/// methods start PENDING and touch no stock until the PAID transition.
pub async fn create_transaction(
    state: &AppState,
    input: CheckoutInput,
) -> Result<CheckoutOutcome, ApiError> {
    validate_item_count(input.items.len()).map_err(CoreError::Validation)?;

    if input.tax_cents < 0 {
        return Err(ApiError::validation("tax must not be negative"));
    }
    if input.discount_cents < 0 {
        return Err(ApiError::validation("discount must not be negative"));
    }

    let cashier = state
        .db
        .users()
        .get_by_id(&input.cashier_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| CoreError::CashierNotFound(input.cashier_id.clone()))?;

    // Snapshot products and compute totals before touching anything.
    let now = Utc::now();
    let transaction_id = Uuid::new_v4().to_string();
    let number = generate_transaction_number();

    let mut items = Vec::with_capacity(input.items.len());
    let mut subtotal = Money::zero();

    for requested in &input.items {
        validate_quantity(requested.quantity).map_err(CoreError::Validation)?;

        let product = state
            .db
            .products()
            .get_by_id(&requested.product_id)
            .await?
            .ok_or_else(|| CoreError::ProductNotFound(requested.product_id.clone()))?;

        if !product.is_active {
            return Err(CoreError::ProductInactive(product.id).into());
        }

        let line_total = product.price().multiply_quantity(requested.quantity);
        subtotal += line_total;

        items.push(TransactionItem {
            id: Uuid::new_v4().to_string(),
            transaction_id: transaction_id.clone(),
            product_id: product.id.clone(),
            sku_snapshot: product.sku.clone(),
            name_snapshot: product.name.clone(),
            unit_price_cents: product.price_cents,
            quantity: requested.quantity,
            line_total_cents: line_total.cents(),
            created_at: now,
        });
    }

    let total = final_amount(
        subtotal,
        Money::from_cents(input.tax_cents),
        Money::from_cents(input.discount_cents),
    );
    if total.is_negative() {
        return Err(ApiError::validation("discount exceeds transaction total"));
    }

    let is_cash = input.payment_method.is_cash();
    let transaction = Transaction {
        id: transaction_id.clone(),
        number: number.clone(),
        subtotal_cents: subtotal.cents(),
        tax_cents: input.tax_cents,
        discount_cents: input.discount_cents,
        total_cents: total.cents(),
        payment_method: input.payment_method,
        payment_status: if is_cash {
            PaymentStatus::Paid
        } else {
            PaymentStatus::Pending
        },
        gateway_invoice_id: None,
        gateway_invoice_url: None,
        cashier_id: cashier.id.clone(),
        created_at: now,
        paid_at: is_cash.then_some(now),
    };

    debug!(id = %transaction.id, number = %number, cash = is_cash, "Creating transaction");

    let stock_changes = if is_cash {
        // Header, items, decrements and logs commit as one unit.
        let mut tx = state.db.pool().begin().await?;
        TransactionRepository::create_with_items_in(&mut tx, &transaction, &items).await?;

        let mut changes = Vec::with_capacity(items.len());
        for item in &items {
            let change = ProductRepository::decrement_for_sale(
                &mut tx,
                &item.product_id,
                item.quantity,
                &cashier.id,
                Some(&number),
            )
            .await?;
            changes.push(change);
        }

        tx.commit().await?;
        changes
    } else {
        state
            .db
            .transactions()
            .create_with_items(&transaction, &items)
            .await?;
        Vec::new()
    };

    info!(
        id = %transaction.id,
        number = %number,
        total = %transaction.total_cents,
        items = items.len(),
        method = ?transaction.payment_method,
        "Transaction created"
    );

    emit_checkout_notifications(state, &transaction, &stock_changes).await;

    Ok(CheckoutOutcome { transaction, items })
}

/// Post-commit notifications: new-order always, low-stock when crossed.
async fn emit_checkout_notifications(
    state: &AppState,
    transaction: &Transaction,
    stock_changes: &[StockChange],
) {
    notify::best_effort(
        "new order notification",
        notify::broadcast_to_role(
            &state.db,
            Role::Admin,
            "New order",
            &format!(
                "Transaction {} created ({})",
                transaction.number, transaction.total_cents
            ),
            NotificationKind::NewOrder,
            Some(serde_json::json!({
                "transactionId": transaction.id,
                "number": transaction.number,
                "totalCents": transaction.total_cents,
            })),
        )
        .await,
    );

    emit_low_stock_notifications(state, stock_changes).await;
}

/// Low-stock broadcast for every change that landed at or below threshold.
///
/// Shared with the reconciliation and adjustment paths.
pub(crate) async fn emit_low_stock_notifications(state: &AppState, changes: &[StockChange]) {
    for change in changes.iter().filter(|c| c.is_low_stock()) {
        notify::best_effort(
            "low stock notification",
            notify::broadcast_to_role(
                &state.db,
                Role::Admin,
                "Low stock",
                &format!(
                    "{} ({}) is down to {} (threshold {})",
                    change.name, change.sku, change.new_stock, change.min_stock
                ),
                NotificationKind::LowStock,
                Some(serde_json::json!({
                    "productId": change.product_id,
                    "stock": change.new_stock,
                    "minStock": change.min_stock,
                })),
            )
            .await,
        );
    }
}

/// Generates a transaction number: time part + random 4-digit suffix.
///
/// ## Example
/// `260805-142233-0471`
fn generate_transaction_number() -> String {
    let now = Utc::now();
    let nanos = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .subsec_nanos();
    let random: u16 = (nanos % 10000) as u16;
    format!("{}-{:04}", now.format("%y%m%d-%H%M%S"), random)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{seeded_state, ADMIN_ID, CASHIER_ID, PRODUCT_A, PRODUCT_B};
    use crate::error::ErrorCode;
    use kasa_core::InventoryLogType;

    fn cart(items: Vec<(&str, i64)>, method: PaymentMethod) -> CheckoutInput {
        CheckoutInput {
            items: items
                .into_iter()
                .map(|(product_id, quantity)| CheckoutItemInput {
                    product_id: product_id.to_string(),
                    quantity,
                })
                .collect(),
            payment_method: method,
            cashier_id: CASHIER_ID.to_string(),
            tax_cents: 0,
            discount_cents: 0,
        }
    }

    #[tokio::test]
    async fn test_cash_checkout_decrements_stock_and_logs() {
        // Spec scenario: qty 3 @ 10000 + qty 1 @ 5000, cash
        let state = seeded_state().await;

        let outcome = create_transaction(
            &state,
            cart(vec![(PRODUCT_A, 3), (PRODUCT_B, 1)], PaymentMethod::Cash),
        )
        .await
        .unwrap();

        assert_eq!(outcome.transaction.payment_status, PaymentStatus::Paid);
        assert_eq!(outcome.transaction.total_cents, 35000);
        assert!(outcome.transaction.paid_at.is_some());
        assert_eq!(outcome.items.len(), 2);

        // Stock of each product reduced by its quantity (seeded at 10)
        let a = state.db.products().get_by_id(PRODUCT_A).await.unwrap().unwrap();
        let b = state.db.products().get_by_id(PRODUCT_B).await.unwrap().unwrap();
        assert_eq!(a.stock, 7);
        assert_eq!(b.stock, 9);

        // One SALE log per item
        for product_id in [PRODUCT_A, PRODUCT_B] {
            let logs = state
                .db
                .inventory_logs()
                .list_for_product(product_id, 10)
                .await
                .unwrap();
            assert_eq!(logs.len(), 1);
            assert_eq!(logs[0].log_type, InventoryLogType::Sale);
        }

        // New-order broadcast reached the admin
        let admin_alerts = state
            .db
            .notifications()
            .list_for_user(ADMIN_ID, false, 10)
            .await
            .unwrap();
        assert!(admin_alerts
            .iter()
            .any(|n| n.kind == NotificationKind::NewOrder));
    }

    #[tokio::test]
    async fn test_digital_checkout_starts_pending_without_stock_movement() {
        let state = seeded_state().await;

        let outcome = create_transaction(&state, cart(vec![(PRODUCT_A, 2)], PaymentMethod::Qris))
            .await
            .unwrap();

        assert_eq!(outcome.transaction.payment_status, PaymentStatus::Pending);
        assert!(outcome.transaction.paid_at.is_none());

        let a = state.db.products().get_by_id(PRODUCT_A).await.unwrap().unwrap();
        assert_eq!(a.stock, 10);
        assert_eq!(
            state
                .db
                .inventory_logs()
                .count_for_product(PRODUCT_A)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_empty_cart_rejected() {
        let state = seeded_state().await;

        let err = create_transaction(&state, cart(vec![], PaymentMethod::Cash))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_non_positive_quantity_rejected() {
        let state = seeded_state().await;

        let err = create_transaction(&state, cart(vec![(PRODUCT_A, 0)], PaymentMethod::Cash))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_unknown_cashier_rejected() {
        let state = seeded_state().await;

        let mut input = cart(vec![(PRODUCT_A, 1)], PaymentMethod::Cash);
        input.cashier_id = "nobody".to_string();

        let err = create_transaction(&state, input).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_insufficient_stock_rolls_back_whole_checkout() {
        let state = seeded_state().await;

        // First item fine, second over-sells: nothing must persist
        let err = create_transaction(
            &state,
            cart(vec![(PRODUCT_A, 3), (PRODUCT_B, 11)], PaymentMethod::Cash),
        )
        .await
        .unwrap_err();
        assert_eq!(err.code, ErrorCode::InsufficientStock);

        let a = state.db.products().get_by_id(PRODUCT_A).await.unwrap().unwrap();
        assert_eq!(a.stock, 10);
        assert_eq!(state.db.transactions().count().await.unwrap(), 0);
        assert_eq!(
            state
                .db
                .inventory_logs()
                .count_for_product(PRODUCT_A)
                .await
                .unwrap(),
            0
        );
    }

    #[tokio::test]
    async fn test_low_stock_boundary_notification() {
        let state = seeded_state().await;

        // PRODUCT_A: stock 10, min_stock 2. Selling 7 leaves 3: one above
        // the threshold, no alert.
        create_transaction(&state, cart(vec![(PRODUCT_A, 7)], PaymentMethod::Cash))
            .await
            .unwrap();

        let alerts = state
            .db
            .notifications()
            .list_for_user(ADMIN_ID, false, 20)
            .await
            .unwrap();
        assert!(!alerts.iter().any(|n| n.kind == NotificationKind::LowStock));

        // Selling one more leaves exactly min_stock: alert fires.
        create_transaction(&state, cart(vec![(PRODUCT_A, 1)], PaymentMethod::Cash))
            .await
            .unwrap();

        let alerts = state
            .db
            .notifications()
            .list_for_user(ADMIN_ID, false, 20)
            .await
            .unwrap();
        assert!(alerts.iter().any(|n| n.kind == NotificationKind::LowStock));
    }
}
