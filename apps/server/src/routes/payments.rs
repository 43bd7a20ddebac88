//! # Payment Webhook Handler
//!
//! Inbound push notifications from the payment gateway. The endpoint
//! acknowledges with 200 whether or not the external id resolves to a
//! transaction - gateways require acknowledgment, and redelivering an
//! unresolvable event would never succeed anyway. Duplicate deliveries
//! are harmless: the status compare-and-set makes reprocessing a no-op.

use axum::extract::State;
use axum::Json;

use crate::error::ApiError;
use crate::services::payments::{self, WebhookAck, WebhookPayload};
use crate::state::AppState;

/// POST /api/payments/webhook
pub async fn webhook(
    State(state): State<AppState>,
    Json(payload): Json<WebhookPayload>,
) -> Result<Json<WebhookAck>, ApiError> {
    let ack = payments::handle_webhook(&state, payload).await?;
    Ok(Json(ack))
}
