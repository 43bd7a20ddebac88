//! # Inventory Adjustment Service
//!
//! Batch stock adjustments with per-item results.
//!
//! The batch deliberately has no all-or-nothing guarantee: each item is
//! its own database transaction (stock write + log append together), and a
//! failure is reported in that item's result slot while the rest proceed.
//! The caller reads partial failure out of the returned list.

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::ApiError;
use crate::services::checkout::emit_low_stock_notifications;
use crate::services::notify;
use crate::state::AppState;
use kasa_core::validation::validate_stock_level;
use kasa_core::{NotificationKind, Role};
use kasa_db::{DbError, ProductRepository};

/// One requested adjustment: set this product's stock to `new_stock`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentInput {
    pub product_id: String,
    pub new_stock: i64,
    #[serde(default)]
    pub reason: Option<String>,
}

/// Per-item outcome of a batch adjustment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AdjustmentOutcome {
    pub product_id: String,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub previous_stock: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_stock: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Applies a batch of stock adjustments item by item.
///
/// ## Errors
/// * not-found when the acting user is unknown (rejects the whole batch);
///   everything item-level is reported in the result list instead
pub async fn adjust_batch(
    state: &AppState,
    actor_id: &str,
    batch: Vec<AdjustmentInput>,
) -> Result<Vec<AdjustmentOutcome>, ApiError> {
    if state.db.users().get_by_id(actor_id).await?.is_none() {
        return Err(ApiError::not_found("User", actor_id));
    }

    let mut outcomes = Vec::with_capacity(batch.len());

    for item in batch {
        let outcome = adjust_one(state, actor_id, &item).await;
        outcomes.push(outcome);
    }

    let applied = outcomes.iter().filter(|o| o.success).count();
    info!(
        applied = applied,
        failed = outcomes.len() - applied,
        "Inventory adjustment batch processed"
    );

    Ok(outcomes)
}

/// Applies one adjustment in its own database transaction.
async fn adjust_one(state: &AppState, actor_id: &str, item: &AdjustmentInput) -> AdjustmentOutcome {
    if let Err(e) = validate_stock_level(item.new_stock) {
        return failure(&item.product_id, e.to_string());
    }

    let result = async {
        let mut tx = state.db.pool().begin().await?;
        let change = ProductRepository::set_stock(
            &mut tx,
            &item.product_id,
            item.new_stock,
            actor_id,
            item.reason.as_deref(),
        )
        .await?;
        tx.commit().await?;
        Ok::<_, DbError>(change)
    }
    .await;

    match result {
        Ok(change) => {
            notify::best_effort(
                "inventory update notification",
                notify::broadcast_to_role(
                    &state.db,
                    Role::Admin,
                    "Inventory updated",
                    &format!(
                        "{} ({}) stock changed from {} to {}",
                        change.name, change.sku, change.previous_stock, change.new_stock
                    ),
                    NotificationKind::InventoryUpdate,
                    Some(serde_json::json!({
                        "productId": change.product_id,
                        "previousStock": change.previous_stock,
                        "newStock": change.new_stock,
                    })),
                )
                .await,
            );

            emit_low_stock_notifications(state, std::slice::from_ref(&change)).await;

            AdjustmentOutcome {
                product_id: item.product_id.clone(),
                success: true,
                previous_stock: Some(change.previous_stock),
                new_stock: Some(change.new_stock),
                error: None,
            }
        }
        Err(e) => failure(&item.product_id, e.to_string()),
    }
}

fn failure(product_id: &str, error: String) -> AdjustmentOutcome {
    AdjustmentOutcome {
        product_id: product_id.to_string(),
        success: false,
        previous_stock: None,
        new_stock: None,
        error: Some(error),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::testutil::{seeded_state, ADMIN_ID, PRODUCT_A, PRODUCT_B};
    use kasa_core::InventoryLogType;

    fn adjustment(product_id: &str, new_stock: i64) -> AdjustmentInput {
        AdjustmentInput {
            product_id: product_id.to_string(),
            new_stock,
            reason: Some("stock take".to_string()),
        }
    }

    #[tokio::test]
    async fn test_adjustment_round_trip() {
        let state = seeded_state().await;

        let outcomes = adjust_batch(&state, ADMIN_ID, vec![adjustment(PRODUCT_A, 42)])
            .await
            .unwrap();
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].success);
        assert_eq!(outcomes[0].previous_stock, Some(10));
        assert_eq!(outcomes[0].new_stock, Some(42));

        let product = state.db.products().get_by_id(PRODUCT_A).await.unwrap().unwrap();
        assert_eq!(product.stock, 42);

        let log = state
            .db
            .inventory_logs()
            .latest_for_product(PRODUCT_A)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(log.log_type, InventoryLogType::Restock);
        assert_eq!(log.previous_stock, 10);
        assert_eq!(log.new_stock, 42);
        assert_eq!(log.reason.as_deref(), Some("stock take"));
    }

    #[tokio::test]
    async fn test_downward_adjustment_logs_adjustment_type() {
        let state = seeded_state().await;

        adjust_batch(&state, ADMIN_ID, vec![adjustment(PRODUCT_A, 3)])
            .await
            .unwrap();

        let log = state
            .db
            .inventory_logs()
            .latest_for_product(PRODUCT_A)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(log.log_type, InventoryLogType::Adjustment);
        assert_eq!(log.quantity_delta, -7);
    }

    #[tokio::test]
    async fn test_partial_failure_applies_valid_items() {
        // One invalid product among three: the two valid adjustments apply,
        // the invalid one reports not-found in its result slot.
        let state = seeded_state().await;

        let outcomes = adjust_batch(
            &state,
            ADMIN_ID,
            vec![
                adjustment(PRODUCT_A, 20),
                adjustment("missing", 5),
                adjustment(PRODUCT_B, 30),
            ],
        )
        .await
        .unwrap();

        assert_eq!(outcomes.len(), 3);
        assert!(outcomes[0].success);
        assert!(!outcomes[1].success);
        assert!(outcomes[1].error.as_deref().unwrap().contains("not found"));
        assert!(outcomes[2].success);

        let a = state.db.products().get_by_id(PRODUCT_A).await.unwrap().unwrap();
        let b = state.db.products().get_by_id(PRODUCT_B).await.unwrap().unwrap();
        assert_eq!(a.stock, 20);
        assert_eq!(b.stock, 30);
    }

    #[tokio::test]
    async fn test_negative_stock_level_reported_per_item() {
        let state = seeded_state().await;

        let outcomes = adjust_batch(&state, ADMIN_ID, vec![adjustment(PRODUCT_A, -1)])
            .await
            .unwrap();
        assert!(!outcomes[0].success);

        let product = state.db.products().get_by_id(PRODUCT_A).await.unwrap().unwrap();
        assert_eq!(product.stock, 10);
    }

    #[tokio::test]
    async fn test_unknown_actor_rejects_batch() {
        let state = seeded_state().await;

        let err = adjust_batch(&state, "nobody", vec![adjustment(PRODUCT_A, 5)])
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_adjustment_to_threshold_emits_low_stock() {
        let state = seeded_state().await;

        // min_stock is 2; adjusting to exactly 2 crosses the threshold
        adjust_batch(&state, ADMIN_ID, vec![adjustment(PRODUCT_A, 2)])
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
