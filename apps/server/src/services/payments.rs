//! # Payment Service
//!
//! Digital payment initiation and status reconciliation.
//!
//! ## Reconciliation
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                  Reconciliation Triggers                                │
//! │                                                                         │
//! │  1. Webhook push      gateway ──► POST /api/payments/webhook           │
//! │  2. Status check      cashier ──► GET /api/transactions/{id}/status    │
//! │  3. Idempotent retry  either trigger firing again                      │
//! │                                                                         │
//! │  All three funnel into apply_gateway_status():                         │
//! │                                                                         │
//! │    map_gateway_status(raw)            (kasa-core, pure)                │
//! │         │                                                               │
//! │    transition(current, incoming)      (kasa-core, pure)                │
//! │         │ None → no-op                                                  │
//! │         ▼                                                               │
//! │    BEGIN                                                                │
//! │    try_transition()                   CAS: WHERE status = 'pending'    │
//! │         │ 0 rows → lost the race → COMMIT nothing, no side effects     │
//! │         ▼ 1 row                                                         │
//! │    decrement_for_sale() per item      (PAID only, floor-checked)       │
//! │    COMMIT                                                               │
//! │         │                                                               │
//! │         ▼                                                               │
//! │    post-commit notifications          (best-effort)                    │
//! │                                                                         │
//! │  Duplicate triggers, even concurrent ones, apply the stock             │
//! │  decrement exactly once: only the CAS winner runs side effects.        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ApiError;
use crate::gateway::CreateInvoice;
use crate::services::checkout::emit_low_stock_notifications;
use crate::services::notify;
use crate::state::AppState;
use kasa_core::{
    map_gateway_status, parse_external_ref, transition, CoreError, NotificationKind,
    PaymentStatus, SideEffect, Transaction, EXTERNAL_REF_PREFIX,
};
use kasa_db::{ProductRepository, TransactionRepository};

// =============================================================================
// Payment Initiation
// =============================================================================

/// Result of initiating a digital payment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitiatedPayment {
    pub transaction_id: String,
    pub invoice_id: String,
    pub invoice_url: String,
}

/// Creates a gateway invoice for a pending digital transaction.
///
/// Re-initiating a transaction that already has an invoice returns the
/// stored identifiers instead of creating a second invoice.
///
/// ## Errors
/// * not-found - unknown transaction
/// * business - cash transaction, or not PENDING anymore
/// * payment - gateway call failed (no retry)
pub async fn initiate(state: &AppState, transaction_id: &str) -> Result<InitiatedPayment, ApiError> {
    let transaction = state
        .db
        .transactions()
        .get_by_id(transaction_id)
        .await?
        .ok_or_else(|| CoreError::TransactionNotFound(transaction_id.to_string()))?;

    if transaction.payment_method.is_cash() {
        return Err(CoreError::InvalidPaymentState {
            transaction_id: transaction.id,
            current_status: "a cash transaction".to_string(),
        }
        .into());
    }

    if transaction.payment_status != PaymentStatus::Pending {
        return Err(CoreError::InvalidPaymentState {
            transaction_id: transaction.id,
            current_status: transaction.payment_status.as_str().to_string(),
        }
        .into());
    }

    if let (Some(invoice_id), Some(invoice_url)) = (
        transaction.gateway_invoice_id.clone(),
        transaction.gateway_invoice_url.clone(),
    ) {
        debug!(transaction_id = %transaction.id, "Invoice already exists, returning stored reference");
        return Ok(InitiatedPayment {
            transaction_id: transaction.id,
            invoice_id,
            invoice_url,
        });
    }

    let invoice = state
        .gateway
        .create_invoice(CreateInvoice {
            external_id: format!("{}{}", EXTERNAL_REF_PREFIX, transaction.id),
            amount_cents: transaction.total_cents,
            description: format!("POS transaction {}", transaction.number),
            payer_email: None,
            success_redirect_url: state.config.success_redirect_url.clone(),
            failure_redirect_url: state.config.failure_redirect_url.clone(),
            duration_secs: state.config.invoice_duration_secs,
        })
        .await?;

    state
        .db
        .transactions()
        .set_gateway_invoice(&transaction.id, &invoice.id, &invoice.url)
        .await?;

    info!(transaction_id = %transaction.id, invoice_id = %invoice.id, "Digital payment initiated");

    Ok(InitiatedPayment {
        transaction_id: transaction.id,
        invoice_id: invoice.id,
        invoice_url: invoice.url,
    })
}

// =============================================================================
// Webhook Handling
// =============================================================================

/// Inbound webhook body from the gateway.
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookPayload {
    /// Our external id (`pos-{transaction_id}`) or the gateway invoice id.
    pub external_id: String,
    /// Raw gateway status vocabulary.
    pub status: String,
    /// Optional payment-method descriptor; informational only.
    #[serde(default)]
    pub payment_method: Option<String>,
    /// Optional hosted invoice URL; informational only.
    #[serde(default)]
    pub invoice_url: Option<String>,
}

/// Webhook acknowledgment. Always returned with HTTP 200.
#[derive(Debug, Clone, Serialize)]
pub struct WebhookAck {
    pub received: bool,
}

/// Processes a gateway webhook.
///
/// Lookup order: parse a transaction id out of the `pos-` prefixed
/// external id, then fall back to matching the stored gateway invoice id
/// verbatim. An unresolved lookup is a soft no-op - gateways require
/// acknowledgment regardless, and erroring would only trigger redeliveries
/// of an unresolvable event.
pub async fn handle_webhook(
    state: &AppState,
    payload: WebhookPayload,
) -> Result<WebhookAck, ApiError> {
    debug!(external_id = %payload.external_id, status = %payload.status, "Webhook received");

    let transaction = locate_transaction(state, &payload.external_id).await?;

    let Some(transaction) = transaction else {
        warn!(external_id = %payload.external_id, "Webhook matched no transaction, acknowledging anyway");
        return Ok(WebhookAck { received: true });
    };

    apply_gateway_status(state, &transaction, &payload.status).await?;

    Ok(WebhookAck { received: true })
}

/// Resolves a webhook external id to a transaction.
async fn locate_transaction(
    state: &AppState,
    external_id: &str,
) -> Result<Option<Transaction>, ApiError> {
    if let Some(transaction_id) = parse_external_ref(external_id) {
        if let Some(transaction) = state.db.transactions().get_by_id(transaction_id).await? {
            return Ok(Some(transaction));
        }
    }

    Ok(state
        .db
        .transactions()
        .find_by_gateway_invoice_id(external_id)
        .await?)
}

// =============================================================================
// Synchronous Status Check
// =============================================================================

/// Result of a user-initiated status check.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusCheck {
    pub status: PaymentStatus,
    pub transaction: Transaction,
}

/// Checks (and reconciles) a transaction's payment status.
///
/// For a pending digital transaction with a stored invoice id, queries the
/// gateway and applies the mapped status through the same routine the
/// webhook uses. Everything else - cash, terminal states, not-yet-initiated
/// payments - just reports the stored state (idempotent re-entry).
pub async fn check_status(state: &AppState, transaction_id: &str) -> Result<StatusCheck, ApiError> {
    let transaction = state
        .db
        .transactions()
        .get_by_id(transaction_id)
        .await?
        .ok_or_else(|| CoreError::TransactionNotFound(transaction_id.to_string()))?;

    let invoice_id = match (&transaction.payment_status, &transaction.gateway_invoice_id) {
        (PaymentStatus::Pending, Some(invoice_id)) => invoice_id.clone(),
        _ => {
            return Ok(StatusCheck {
                status: transaction.payment_status,
                transaction,
            });
        }
    };

    let gateway_status = state.gateway.get_invoice(&invoice_id).await?;
    apply_gateway_status(state, &transaction, &gateway_status.status).await?;

    // Re-read: the transition (or a concurrent trigger) may have moved it.
    let transaction = state
        .db
        .transactions()
        .get_by_id(transaction_id)
        .await?
        .ok_or_else(|| CoreError::TransactionNotFound(transaction_id.to_string()))?;

    Ok(StatusCheck {
        status: transaction.payment_status,
        transaction,
    })
}

// =============================================================================
// Shared Transition Application
// =============================================================================

/// Applies a raw gateway status to a transaction. The single shared
/// routine behind every reconciliation trigger.
///
/// Returns `true` when this call performed a transition. `false` means
/// no-op: no news from the gateway, a terminal current state, or a
/// concurrent trigger won the compare-and-set first.
pub async fn apply_gateway_status(
    state: &AppState,
    transaction: &Transaction,
    raw_status: &str,
) -> Result<bool, ApiError> {
    let incoming = map_gateway_status(raw_status);

    let Some(step) = transition(transaction.payment_status, incoming) else {
        debug!(
            transaction_id = %transaction.id,
            current = %transaction.payment_status.as_str(),
            incoming = %incoming.as_str(),
            "No transition to apply"
        );
        return Ok(false);
    };

    let needs_stock = step.effects.contains(&SideEffect::DecrementStock);
    let items = if needs_stock {
        state.db.transactions().get_items(&transaction.id).await?
    } else {
        Vec::new()
    };

    let paid_at = (step.next == PaymentStatus::Paid).then(Utc::now);

    let mut tx = state.db.pool().begin().await?;

    let won =
        TransactionRepository::try_transition(&mut tx, &transaction.id, step.next, paid_at).await?;

    if !won {
        // A concurrent trigger already moved the status; side effects are
        // theirs to run.
        tx.rollback().await?;
        info!(
            transaction_id = %transaction.id,
            next = %step.next.as_str(),
            "Lost transition race, skipping side effects"
        );
        return Ok(false);
    }

    let mut stock_changes = Vec::with_capacity(items.len());
    if needs_stock {
        for item in &items {
            let change = ProductRepository::decrement_for_sale(
                &mut tx,
                &item.product_id,
                item.quantity,
                &transaction.cashier_id,
                Some(&transaction.number),
            )
            .await?;
            stock_changes.push(change);
        }
    }

    tx.commit().await?;

    info!(
        transaction_id = %transaction.id,
        from = %transaction.payment_status.as_str(),
        to = %step.next.as_str(),
        "Payment status transitioned"
    );

    for effect in &step.effects {
        match effect {
            SideEffect::NotifyPaid => {
                notify::best_effort(
                    "payment received notification",
                    notify::create(
                        &state.db,
                        &transaction.cashier_id,
                        "Payment received",
                        &format!("Transaction {} has been paid", transaction.number),
                        NotificationKind::PaymentReceived,
                        Some(serde_json::json!({
                            "transactionId": transaction.id,
                            "number": transaction.number,
                        })),
                    )
                    .await,
                );
            }
            SideEffect::NotifyFailed => {
                notify::best_effort(
                    "payment failed notification",
                    notify::create(
                        &state.db,
                        &transaction.cashier_id,
                        "Payment failed",
                        &format!("Payment for transaction {} failed", transaction.number),
                        NotificationKind::PaymentFailed,
                        Some(serde_json::json!({
                            "transactionId": transaction.id,
                            "number": transaction.number,
                        })),
                    )
                    .await,
                );
            }
            SideEffect::DecrementStock => {}
        }
    }

    emit_low_stock_notifications(state, &stock_changes).await;

    Ok(true)
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::services::checkout::{create_transaction, CheckoutInput, CheckoutItemInput};
    use crate::testutil::{seeded_state, seeded_state_with_gateway, CASHIER_ID, PRODUCT_A, PRODUCT_B};
    use kasa_core::PaymentMethod;

    async fn pending_qris_transaction(
        state: &AppState,
        items: Vec<(&str, i64)>,
    ) -> Transaction {
        let outcome = create_transaction(
            state,
            CheckoutInput {
                items: items
                    .into_iter()
                    .map(|(product_id, quantity)| CheckoutItemInput {
                        product_id: product_id.to_string(),
                        quantity,
                    })
                    .collect(),
                payment_method: PaymentMethod::Qris,
                cashier_id: CASHIER_ID.to_string(),
                tax_cents: 0,
                discount_cents: 0,
            },
        )
        .await
        .unwrap();
        outcome.transaction
    }

    #[tokio::test]
    async fn test_initiate_stores_gateway_reference() {
        let state = seeded_state().await;
        let transaction = pending_qris_transaction(&state, vec![(PRODUCT_A, 1)]).await;

        let initiated = initiate(&state, &transaction.id).await.unwrap();
        assert_eq!(
            initiated.invoice_id,
            format!("mock-pos-{}", transaction.id)
        );

        let stored = state
            .db
            .transactions()
            .get_by_id(&transaction.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.gateway_invoice_id.as_deref(), Some(initiated.invoice_id.as_str()));
        assert!(stored.gateway_invoice_url.is_some());

        // Re-initiation returns the stored invoice, not a new one
        let again = initiate(&state, &transaction.id).await.unwrap();
        assert_eq!(again.invoice_id, initiated.invoice_id);
    }

    #[tokio::test]
    async fn test_initiate_rejects_cash() {
        let state = seeded_state().await;

        let outcome = create_transaction(
            &state,
            CheckoutInput {
                items: vec![CheckoutItemInput {
                    product_id: PRODUCT_A.to_string(),
                    quantity: 1,
                }],
                payment_method: PaymentMethod::Cash,
                cashier_id: CASHIER_ID.to_string(),
                tax_cents: 0,
                discount_cents: 0,
            },
        )
        .await
        .unwrap();

        let err = initiate(&state, &outcome.transaction.id).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::BusinessLogic);
    }

    #[tokio::test]
    async fn test_webhook_paid_decrements_stock_once() {
        let state = seeded_state().await;
        let transaction = pending_qris_transaction(&state, vec![(PRODUCT_A, 3)]).await;
        initiate(&state, &transaction.id).await.unwrap();

        let payload = WebhookPayload {
            external_id: format!("pos-{}", transaction.id),
            status: "PAID".to_string(),
            payment_method: None,
            invoice_url: None,
        };

        let ack = handle_webhook(&state, payload.clone()).await.unwrap();
        assert!(ack.received);

        let stored = state
            .db
            .transactions()
            .get_by_id(&transaction.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
        assert!(stored.paid_at.is_some());

        let product = state.db.products().get_by_id(PRODUCT_A).await.unwrap().unwrap();
        assert_eq!(product.stock, 7);

        // Duplicate delivery: acknowledged, but nothing moves again
        let ack = handle_webhook(&state, payload).await.unwrap();
        assert!(ack.received);

        let product = state.db.products().get_by_id(PRODUCT_A).await.unwrap().unwrap();
        assert_eq!(product.stock, 7);
        assert_eq!(
            state
                .db
                .inventory_logs()
                .count_for_product(PRODUCT_A)
                .await
                .unwrap(),
            1
        );
    }

    #[tokio::test]
    async fn test_webhook_settled_vocabulary_maps_to_paid() {
        let state = seeded_state().await;
        let transaction = pending_qris_transaction(&state, vec![(PRODUCT_B, 2)]).await;

        handle_webhook(
            &state,
            WebhookPayload {
                external_id: format!("pos-{}", transaction.id),
                status: "SETTLED".to_string(),
                payment_method: Some("QRIS".to_string()),
                invoice_url: None,
            },
        )
        .await
        .unwrap();

        let stored = state
            .db
            .transactions()
            .get_by_id(&transaction.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_webhook_expired_no_stock_no_paid_notification() {
        let state = seeded_state().await;
        let transaction = pending_qris_transaction(&state, vec![(PRODUCT_A, 2)]).await;

        handle_webhook(
            &state,
            WebhookPayload {
                external_id: format!("pos-{}", transaction.id),
                status: "EXPIRED".to_string(),
                payment_method: None,
                invoice_url: None,
            },
        )
        .await
        .unwrap();

        let stored = state
            .db
            .transactions()
            .get_by_id(&transaction.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Expired);

        // No stock mutation
        let product = state.db.products().get_by_id(PRODUCT_A).await.unwrap().unwrap();
        assert_eq!(product.stock, 10);

        // No "payment received" notification for the cashier
        let alerts = state
            .db
            .notifications()
            .list_for_user(CASHIER_ID, false, 10)
            .await
            .unwrap();
        assert!(!alerts
            .iter()
            .any(|n| n.kind == NotificationKind::PaymentReceived));
    }

    #[tokio::test]
    async fn test_webhook_failed_notifies_cashier() {
        let state = seeded_state().await;
        let transaction = pending_qris_transaction(&state, vec![(PRODUCT_A, 1)]).await;

        handle_webhook(
            &state,
            WebhookPayload {
                external_id: format!("pos-{}", transaction.id),
                status: "FAILED".to_string(),
                payment_method: None,
                invoice_url: None,
            },
        )
        .await
        .unwrap();

        let stored = state
            .db
            .transactions()
            .get_by_id(&transaction.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Failed);

        let alerts = state
            .db
            .notifications()
            .list_for_user(CASHIER_ID, false, 10)
            .await
            .unwrap();
        assert!(alerts
            .iter()
            .any(|n| n.kind == NotificationKind::PaymentFailed));
    }

    #[tokio::test]
    async fn test_webhook_unknown_external_id_is_soft_noop() {
        let state = seeded_state().await;

        let ack = handle_webhook(
            &state,
            WebhookPayload {
                external_id: "pos-does-not-exist".to_string(),
                status: "PAID".to_string(),
                payment_method: None,
                invoice_url: None,
            },
        )
        .await
        .unwrap();

        assert!(ack.received);
        assert_eq!(state.db.transactions().count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_webhook_falls_back_to_invoice_id_lookup() {
        let state = seeded_state().await;
        let transaction = pending_qris_transaction(&state, vec![(PRODUCT_A, 1)]).await;
        let initiated = initiate(&state, &transaction.id).await.unwrap();

        // External id without the pos- prefix: resolved via the stored
        // gateway invoice id.
        handle_webhook(
            &state,
            WebhookPayload {
                external_id: initiated.invoice_id,
                status: "PAID".to_string(),
                payment_method: None,
                invoice_url: None,
            },
        )
        .await
        .unwrap();

        let stored = state
            .db
            .transactions()
            .get_by_id(&transaction.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.payment_status, PaymentStatus::Paid);
    }

    #[tokio::test]
    async fn test_check_status_queries_gateway_and_applies() {
        let (state, gateway) = seeded_state_with_gateway().await;
        let transaction = pending_qris_transaction(&state, vec![(PRODUCT_A, 2)]).await;
        let initiated = initiate(&state, &transaction.id).await.unwrap();

        // Gateway still pending: no change
        let check = check_status(&state, &transaction.id).await.unwrap();
        assert_eq!(check.status, PaymentStatus::Pending);

        // Gateway settles the invoice; the next check applies PAID
        gateway.set_status(&initiated.invoice_id, "PAID");
        let check = check_status(&state, &transaction.id).await.unwrap();
        assert_eq!(check.status, PaymentStatus::Paid);

        let product = state.db.products().get_by_id(PRODUCT_A).await.unwrap().unwrap();
        assert_eq!(product.stock, 8);

        // Checking again is an idempotent re-entry: no second decrement
        let check = check_status(&state, &transaction.id).await.unwrap();
        assert_eq!(check.status, PaymentStatus::Paid);
        let product = state.db.products().get_by_id(PRODUCT_A).await.unwrap().unwrap();
        assert_eq!(product.stock, 8);
    }

    #[tokio::test]
    async fn test_check_status_without_invoice_reports_stored_state() {
        let state = seeded_state().await;
        let transaction = pending_qris_transaction(&state, vec![(PRODUCT_A, 1)]).await;

        // Payment never initiated: no gateway call, stored state reported
        let check = check_status(&state, &transaction.id).await.unwrap();
        assert_eq!(check.status, PaymentStatus::Pending);
    }

    #[tokio::test]
    async fn test_check_status_unknown_transaction_is_not_found() {
        let state = seeded_state().await;

        let err = check_status(&state, "missing").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);
    }

    #[tokio::test]
    async fn test_duplicate_trigger_via_both_paths_decrements_once() {
        // Webhook and synchronous check racing on the same PENDING→PAID
        // transition: the CAS lets exactly one of them run side effects.
        let (state, gateway) = seeded_state_with_gateway().await;
        let transaction = pending_qris_transaction(&state, vec![(PRODUCT_A, 4)]).await;
        let initiated = initiate(&state, &transaction.id).await.unwrap();
        gateway.set_status(&initiated.invoice_id, "PAID");

        // Trigger 1: webhook
        handle_webhook(
            &state,
            WebhookPayload {
                external_id: format!("pos-{}", transaction.id),
                status: "PAID".to_string(),
                payment_method: None,
                invoice_url: None,
            },
        )
        .await
        .unwrap();

        // Trigger 2: synchronous check straight after
        let check = check_status(&state, &transaction.id).await.unwrap();
        assert_eq!(check.status, PaymentStatus::Paid);

        let product = state.db.products().get_by_id(PRODUCT_A).await.unwrap().unwrap();
        assert_eq!(product.stock, 6);
        assert_eq!(
            state
                .db
                .inventory_logs()
                .count_for_product(PRODUCT_A)
                .await
                .unwrap(),
            1
        );
    }
}
